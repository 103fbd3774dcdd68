//! 学習済みモデルのモジュール。
//!
//! このモジュールは、学習の出力（パターン辞書と各種テーブル）を保持し、
//! 型付きテンソルブロブおよびパターンのテキストサイドカーとして
//! 永続化する機能を提供します。読み込み側は [`ModelData`] で全領域を
//! 検証付きで復元します。

use std::io::{BufWriter, Read, Write};

use crate::blob::{Blob, DType};
use crate::errors::{LegatoError, Result};
use crate::idmap::StrIdMap;
use crate::trainer::{CounterTable, Pattern};
use crate::utf8::MAX_CODEPOINT;
use crate::utils::FromU32;

/// `features`領域の1レコードのバイト数
const FEATURE_RECORD_SIZE: usize = 16;

/// 学習済みモデル。
///
/// パターン辞書、POS・素性テーブル、頻度カウンターを保持します。
/// 学習後は不変です。
pub struct Model {
    patterns: Vec<Pattern>,
    pos_table: StrIdMap,
    feature_table: StrIdMap,
    feature_to_pos: Vec<u32>,
    counters: CounterTable,
    num_pos_fields: usize,
}

impl Model {
    pub(crate) fn new(
        patterns: Vec<Pattern>,
        pos_table: StrIdMap,
        feature_table: StrIdMap,
        feature_to_pos: Vec<u32>,
        counters: CounterTable,
        num_pos_fields: usize,
    ) -> Self {
        Self {
            patterns,
            pos_table,
            feature_table,
            feature_to_pos,
            counters,
            num_pos_fields,
        }
    }

    /// 学習済みパターンをID順で返します。
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// POS IDからPOS文字列を引きます。
    pub fn pos_string(&self, pos_id: u32) -> Option<&str> {
        self.pos_table.get_by_id(pos_id).map(String::as_str)
    }

    /// 素性IDから素性文字列を引きます。
    pub fn feature_string(&self, feature_id: u32) -> Option<&str> {
        self.feature_table.get_by_id(feature_id).map(String::as_str)
    }

    /// POSタプルの列数を返します。
    pub fn num_pos_fields(&self) -> usize {
        self.num_pos_fields
    }

    /// モデルをブロブとして書き出します。
    ///
    /// 領域は以下の通りです。
    ///
    /// - `char_to_id`: 密なカウンターIDから元のキー（コードポイント
    ///   またはPOS領域の値）への`i32`テーブル。未使用の添字は`-1`。
    /// - `feature_strings`: 全POS文字列と全素性文字列の連結。
    /// - `features`: 素性IDで添字付けされた固定長レコード。
    ///
    /// メタデータには`creator`と`num_pos_fields`が入ります。
    pub fn write_model<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let num_pos = self.pos_table.len();
        let table_len = MAX_CODEPOINT as usize + 1 + num_pos;
        let mut char_to_id = vec![-1i32; table_len];
        for (key, _, dense_id) in self.counters.iter() {
            let slot = usize::from_u32(dense_id);
            if slot >= table_len {
                return Err(LegatoError::invalid_argument(
                    "counters",
                    format!("dense id {dense_id} exceeds the key space"),
                ));
            }
            char_to_id[slot] = key as i32;
        }

        let mut strings: Vec<u8> = vec![];
        let mut pos_spans = Vec::with_capacity(num_pos);
        for pos in self.pos_table.iter() {
            pos_spans.push(span_of(&mut strings, pos)?);
        }
        let mut feature_spans = Vec::with_capacity(self.feature_table.len());
        for feature in self.feature_table.iter() {
            feature_spans.push(span_of(&mut strings, feature)?);
        }

        let mut records: Vec<u8> =
            Vec::with_capacity(self.feature_table.len() * FEATURE_RECORD_SIZE);
        for (feature_id, &(feature_offset, feature_len)) in feature_spans.iter().enumerate() {
            let pos_id = self.feature_to_pos[feature_id];
            let (pos_offset, pos_len) = pos_spans[usize::from_u32(pos_id)];
            records.extend((feature_id as i32).to_le_bytes());
            records.extend(pos_offset.to_le_bytes());
            records.extend(pos_len.to_le_bytes());
            records.extend(feature_offset.to_le_bytes());
            records.extend(feature_len.to_le_bytes());
        }

        let mut blob = Blob::new();
        blob.add_region(
            "char_to_id",
            DType::I32,
            &[table_len as u64],
            char_to_id.iter().flat_map(|v| v.to_le_bytes()).collect(),
        )?;
        blob.add_region("feature_strings", DType::U8, &[strings.len() as u64], strings)?;
        blob.add_region(
            "features",
            DType::U8,
            &[feature_spans.len() as u64, FEATURE_RECORD_SIZE as u64],
            records,
        )?;
        blob.add_metadata("creator", concat!("legato ", env!("CARGO_PKG_VERSION")));
        blob.add_metadata("num_pos_fields", &self.num_pos_fields.to_string());
        blob.write_to(wtr)
    }

    /// パターンのテキストサイドカーを書き出します。
    ///
    /// 各行は `頻度\t表層\t直前POS\tシフト\t文字クラス\t素性` のタブ区切りで、
    /// 頻度の降順、同率なら表層の辞書順です。素性の後の改行は
    /// ちょうど1個に正規化されます。
    pub fn write_patterns<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let mut wtr = BufWriter::new(wtr);
        let mut order: Vec<usize> = (0..self.patterns.len()).collect();
        order.sort_by(|&a, &b| {
            let pa = &self.patterns[a];
            let pb = &self.patterns[b];
            pb.count.cmp(&pa.count).then(pa.surface.cmp(&pb.surface))
        });

        for i in order {
            let p = &self.patterns[i];
            let surface = std::str::from_utf8(&p.surface).map_err(|e| {
                LegatoError::InvalidUtf8 {
                    offset: e.valid_up_to(),
                }
            })?;
            let prev_pos = if p.prev_pos_id < 0 {
                ""
            } else {
                self.pos_string(p.prev_pos_id as u32)
                    .map(|s| s.trim_start_matches('\t'))
                    .unwrap_or("")
            };
            let feature = self
                .feature_string(p.feature_id)
                .ok_or(LegatoError::UnknownId { id: p.feature_id })?
                .trim_end_matches('\n');
            writeln!(
                &mut wtr,
                "{}\t{}\t{}\t{}\t{}\t{}",
                p.count,
                surface,
                prev_pos,
                p.shift,
                p.char_kind.bits(),
                feature,
            )?;
        }
        Ok(())
    }
}

fn span_of(strings: &mut Vec<u8>, s: &str) -> Result<(u32, u16)> {
    let offset = strings.len() as u32;
    let len = u16::try_from(s.len()).map_err(|_| {
        LegatoError::invalid_argument("strings", format!("string of {} bytes is too long", s.len()))
    })?;
    strings.extend(s.as_bytes());
    Ok((offset, len))
}

/// `features`領域の1レコード。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureRecord {
    /// 素性ID
    pub feature_id: i32,
    /// POS文字列のオフセット
    pub pos_str_offset: u32,
    /// POS文字列のバイト長
    pub pos_str_len: u16,
    /// 素性文字列のオフセット
    pub feature_str_offset: u32,
    /// 素性文字列のバイト長
    pub feature_str_len: u16,
}

/// ブロブから復元したモデルデータ。
///
/// 推論側が必要とする読み取り専用のテーブル群です。
pub struct ModelData {
    char_to_id: Vec<i32>,
    feature_strings: Vec<u8>,
    records: Vec<FeatureRecord>,
    creator: String,
    num_pos_fields: usize,
}

impl ModelData {
    /// ブロブを読み込み、全領域を検証します。
    ///
    /// # エラー
    ///
    /// 領域の欠落、レコードの形状不一致、文字列参照の範囲外は
    /// [`LegatoError::CorruptBlob`] になります。
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let blob = Blob::read_from(rdr)?;

        let char_to_id = blob
            .region("char_to_id")
            .ok_or_else(|| LegatoError::corrupt_blob("missing region char_to_id"))?
            .as_i32();
        if char_to_id.len() < MAX_CODEPOINT as usize + 1 {
            return Err(LegatoError::corrupt_blob(
                "char_to_id is shorter than the codepoint space",
            ));
        }

        let feature_strings = blob
            .region("feature_strings")
            .ok_or_else(|| LegatoError::corrupt_blob("missing region feature_strings"))?
            .data()
            .to_vec();

        let features = blob
            .region("features")
            .ok_or_else(|| LegatoError::corrupt_blob("missing region features"))?;
        if features.shape().len() != 2 || features.shape()[1] != FEATURE_RECORD_SIZE as u64 {
            return Err(LegatoError::corrupt_blob("features region has a bad shape"));
        }
        let mut records = vec![];
        for chunk in features.data().chunks_exact(FEATURE_RECORD_SIZE) {
            let record = FeatureRecord {
                feature_id: i32::from_le_bytes(chunk[0..4].try_into().unwrap()),
                pos_str_offset: u32::from_le_bytes(chunk[4..8].try_into().unwrap()),
                pos_str_len: u16::from_le_bytes(chunk[8..10].try_into().unwrap()),
                feature_str_offset: u32::from_le_bytes(chunk[10..14].try_into().unwrap()),
                feature_str_len: u16::from_le_bytes(chunk[14..16].try_into().unwrap()),
            };
            for (offset, len) in [
                (record.pos_str_offset, record.pos_str_len),
                (record.feature_str_offset, record.feature_str_len),
            ] {
                let end = offset as usize + len as usize;
                if end > feature_strings.len() {
                    return Err(LegatoError::corrupt_blob(format!(
                        "feature record {} references bytes out of range",
                        record.feature_id
                    )));
                }
            }
            records.push(record);
        }

        let creator = blob.metadata("creator").unwrap_or_default().to_string();
        let num_pos_fields = blob
            .metadata("num_pos_fields")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| LegatoError::corrupt_blob("missing or invalid num_pos_fields"))?;

        Ok(Self {
            char_to_id,
            feature_strings,
            records,
            creator,
            num_pos_fields,
        })
    }

    /// `char_to_id`テーブルを返します。
    pub fn char_to_id(&self) -> &[i32] {
        &self.char_to_id
    }

    /// 素性レコードを返します。
    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    /// 素性IDのPOS文字列を返します。
    pub fn pos_str(&self, feature_id: usize) -> Option<&str> {
        let r = self.records.get(feature_id)?;
        let start = r.pos_str_offset as usize;
        std::str::from_utf8(&self.feature_strings[start..start + r.pos_str_len as usize]).ok()
    }

    /// 素性IDの素性文字列を返します。
    pub fn feature_str(&self, feature_id: usize) -> Option<&str> {
        let r = self.records.get(feature_id)?;
        let start = r.feature_str_offset as usize;
        std::str::from_utf8(&self.feature_strings[start..start + r.feature_str_len as usize]).ok()
    }

    /// 作成者メタデータを返します。
    pub fn creator(&self) -> &str {
        &self.creator
    }

    /// POSタプルの列数を返します。
    pub fn num_pos_fields(&self) -> usize {
        self.num_pos_fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::{Corpus, Trainer, TrainerConfig};

    fn tiny_model() -> Model {
        let seed = "\
吾輩,代名詞,*,*,*,ワガハイ
は,助詞,係助詞,*,*,ハ
猫,名詞,普通名詞,*,*,ネコ
";
        let corpus_data = "\
吾輩\t代名詞,*,*,*
は\t助詞,係助詞,*,*
猫\t名詞,普通名詞,*,*
EOS
";
        let mut trainer = Trainer::new(TrainerConfig::new()).unwrap();
        trainer.read_seed_lexicon(seed.as_bytes()).unwrap();
        let corpus = Corpus::from_reader(corpus_data.as_bytes()).unwrap();
        trainer.train(&corpus).unwrap()
    }

    #[test]
    fn test_write_and_read_model() {
        let model = tiny_model();
        let mut bytes = vec![];
        model.write_model(&mut bytes).unwrap();

        let data = ModelData::read(bytes.as_slice()).unwrap();
        assert_eq!(data.num_pos_fields(), 4);
        assert!(data.creator().starts_with("legato "));
        assert!(data.char_to_id().len() > MAX_CODEPOINT as usize);

        // 素性文字列が往復すること。
        for feature_id in 0..data.records().len() {
            let feature = data.feature_str(feature_id).unwrap();
            assert_eq!(model.feature_string(feature_id as u32), Some(feature));
            let pos = data.pos_str(feature_id).unwrap();
            assert!(feature.starts_with(pos), "{feature:?} vs {pos:?}");
        }
    }

    #[test]
    fn test_char_to_id_holds_original_keys() {
        let model = tiny_model();
        let mut bytes = vec![];
        model.write_model(&mut bytes).unwrap();
        let data = ModelData::read(bytes.as_slice()).unwrap();

        // 「猫」はいずれかの密なIDの位置に元のコードポイントで現れる。
        let cp = u32::from('猫') as i32;
        assert!(data.char_to_id().contains(&cp));
    }

    #[test]
    fn test_patterns_sidecar_format() {
        let model = tiny_model();
        let mut bytes = vec![];
        model.write_patterns(&mut bytes).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut prev_count = u32::MAX;
        for line in text.lines() {
            let cols: Vec<&str> = line.split('\t').collect();
            assert_eq!(cols.len(), 6, "bad line: {line:?}");
            let count: u32 = cols[0].parse().unwrap();
            assert!(count <= prev_count, "counts are not descending");
            prev_count = count;
        }
        // 素性の改行はちょうど1個（lines()で消えるため全体を確認）。
        assert!(!text.contains("\n\n"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_read_rejects_missing_region() {
        let mut blob = Blob::new();
        blob.add_region("feature_strings", DType::U8, &[0], vec![]).unwrap();
        let mut bytes = vec![];
        blob.write_to(&mut bytes).unwrap();
        assert!(ModelData::read(bytes.as_slice()).is_err());
    }
}
