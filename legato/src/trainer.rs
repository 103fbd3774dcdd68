//! パターンマイニングによる学習のためのモジュール。
//!
//! このモジュールは、シード語彙とPOSタグ付きコーパスから、推論時の
//! 曖昧性解消に使う `(断片, 直前POS) → (シフト, 素性)` パターン辞書を
//! 学習する機能を提供します。
//!
//! # 概要
//!
//! - シード語彙の読み込みと予約POSの登録
//! - 文ごとの接頭辞断片の列挙と `(シフト, 素性)` の頻度集計
//! - 未観測パターンへの文字クラスヒューリスティクスによる素性付与
//! - 二次トライによる冗長パターンの削除
//!
//! # 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use legato::trainer::{Corpus, Trainer, TrainerConfig};
//!
//! let lexicon_csv = "吾輩,代名詞,*,*,*,ワガハイ
//! は,助詞,係助詞,*,*,ハ
//! 猫,名詞,普通名詞,*,*,ネコ
//! である,助動詞,*,*,*,デアル";
//! let corpus_data = "吾輩\t代名詞,*,*,*
//! は\t助詞,係助詞,*,*
//! 猫\t名詞,普通名詞,*,*
//! である\t助動詞,*,*,*
//! EOS
//! ";
//!
//! let mut trainer = Trainer::new(TrainerConfig::new())?;
//! trainer.read_seed_lexicon(lexicon_csv.as_bytes())?;
//!
//! let corpus = Corpus::from_reader(corpus_data.as_bytes())?;
//! let model = trainer.train(&corpus)?;
//! assert!(!model.patterns().is_empty());
//!
//! let mut blob = vec![];
//! model.write_model(&mut blob)?;
//! let mut sidecar = vec![];
//! model.write_patterns(&mut sidecar)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod corpus;
mod counter;
mod model;

use hashbrown::HashMap;

use crate::charclass::CharKind;
use crate::errors::{LegatoError, Result};
use crate::idmap::{StrIdMap, StrIntIdMap};
use crate::trie::Trie;
use crate::utf8::len_utf8;
use crate::utils::{join_csv, parse_csv_row, trim_line_ending};

pub use crate::trainer::config::TrainerConfig;
pub use crate::trainer::corpus::{Corpus, Example, Word};
pub use crate::trainer::counter::CounterTable;
pub(crate) use crate::trainer::counter::pos_counter_key;
pub use crate::trainer::model::{FeatureRecord, Model, ModelData};

/// 文頭の予約POS ID
pub const POS_ID_BOS: u32 = 0;

/// 未知語の予約POS ID
pub const POS_ID_UNKNOWN: u32 = 1;

/// 数字列の予約POS ID
pub const POS_ID_DIGIT: u32 = 2;

/// 記号の予約POS ID
pub const POS_ID_SYMBOL: u32 = 3;

/// 学習済みパターンのレコード。
///
/// `shift`はマッチ時にカーソルを進めるバイト数で、`-1`は語彙のみの
/// シードエントリを表します。`prev_pos_id`の`-1`は「直前POSなし」です。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// パターンの表層バイト列
    pub surface: Vec<u8>,
    /// 直前POSのID（`-1`はなし）
    pub prev_pos_id: i32,
    /// コーパスでの観測回数
    pub count: u32,
    /// カーソルを進めるバイト数（`-1`は語彙のみのシード）
    pub shift: i32,
    /// 表層の文字クラス
    pub char_kind: CharKind,
    /// 素性ID
    pub feature_id: u32,
}

/// パターンごとの `(シフト, 素性)` 頻度。
///
/// 挿入順を保持し、引き分けの解決を反復順序に依存させません。
#[derive(Clone, Default)]
struct ShiftFeatureCounts {
    entries: Vec<(i32, u32, u32)>,
    index: HashMap<(i32, u32), usize>,
}

impl ShiftFeatureCounts {
    fn add(&mut self, shift: i32, feature_id: u32) {
        if let Some(&i) = self.index.get(&(shift, feature_id)) {
            self.entries[i].2 += 1;
        } else {
            self.index.insert((shift, feature_id), self.entries.len());
            self.entries.push((shift, feature_id, 1));
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn total(&self) -> u32 {
        self.entries.iter().map(|e| e.2).sum()
    }

    /// 最頻の `(シフト, 素性)` を選びます。
    ///
    /// シフトは頻度の降順、同率ならシフトの大きい方、さらに同率なら
    /// 挿入の早い方を採ります。素性は選ばれたシフトの中で頻度の降順、
    /// 同率なら挿入の早い方です。
    fn resolve(&self) -> (i32, u32) {
        let mut shift_totals: Vec<(i32, u32, usize)> = vec![];
        for (i, &(shift, _, count)) in self.entries.iter().enumerate() {
            match shift_totals.iter_mut().find(|(s, _, _)| *s == shift) {
                Some(t) => t.1 += count,
                None => shift_totals.push((shift, count, i)),
            }
        }
        let &(best_shift, _, _) = shift_totals
            .iter()
            .max_by(|a, b| {
                a.1.cmp(&b.1)
                    .then(a.0.cmp(&b.0))
                    .then(b.2.cmp(&a.2))
            })
            .unwrap();

        let mut best: Option<(u32, u32)> = None;
        for &(shift, feature_id, count) in &self.entries {
            if shift != best_shift {
                continue;
            }
            match best {
                Some((_, c)) if c >= count => {}
                _ => best = Some((feature_id, count)),
            }
        }
        (best_shift, best.unwrap().0)
    }
}

/// パターンマイニング学習器。
///
/// シード語彙とタグ付きコーパスからパターン辞書を構築します。
/// 学習の出力は、同じ入力順に対して決定的です。
pub struct Trainer {
    config: TrainerConfig,
    pos_table: StrIdMap,
    feature_table: StrIdMap,
    feature_to_pos: Vec<u32>,
    pattern_table: StrIntIdMap,
    seed_pos_features: HashMap<u32, Vec<(u32, u32)>>,
    counts: HashMap<u32, ShiftFeatureCounts>,
    counters: CounterTable,
    seed_boundary: usize,
    max_word_length: usize,
}

impl Trainer {
    /// 指定された設定を使用して新しい [`Trainer`] を作成します。
    ///
    /// 予約POS（文頭・未知語・数字・記号）をIDの`0..=3`に登録します。
    pub fn new(config: TrainerConfig) -> Result<Self> {
        let mut pos_table = StrIdMap::new();
        pos_table.put(config::BOS_POS.to_string())?;
        pos_table.put(config.unknown_feature.clone())?;
        pos_table.put(config.digit_feature.clone())?;
        pos_table.put(config.symbol_feature.clone())?;

        Ok(Self {
            config,
            pos_table,
            feature_table: StrIdMap::new(),
            feature_to_pos: vec![],
            pattern_table: StrIntIdMap::new(),
            seed_pos_features: HashMap::new(),
            counts: HashMap::new(),
            counters: CounterTable::new(),
            seed_boundary: 0,
            max_word_length: 0,
        })
    }

    /// 素性文字列を登録し、`(素性ID, POS ID)` を返します。
    ///
    /// 素性の先頭`num_pos_fields`列をPOSタプルとしてPOSテーブルにも
    /// 登録します。
    fn register_feature(&mut self, feature: &str) -> Result<(u32, u32)> {
        if let Some(feature_id) = self.feature_table.get_by_key(&feature.to_string()) {
            return Ok((feature_id, self.feature_to_pos[feature_id as usize]));
        }
        let fields = parse_csv_row(feature);
        let pos = join_csv(&fields[..self.config.num_pos_fields.min(fields.len())]);
        let (pos_id, _) = self.pos_table.put(pos)?;
        let (feature_id, _) = self.feature_table.put(feature.to_string())?;
        self.feature_to_pos.push(pos_id);
        Ok((feature_id, pos_id))
    }

    /// シード語彙のCSVを読み込みます。
    ///
    /// 各行は `表層形,POS列×num_pos_fields,追加素性列…` の形式です。
    /// 行末は LF へ正規化されます。
    ///
    /// # エラー
    ///
    /// 列数が`num_pos_fields + 1`未満の行は
    /// [`LegatoError::SchemaMismatch`] になります。
    pub fn read_seed_lexicon<R>(&mut self, mut rdr: R) -> Result<()>
    where
        R: std::io::Read,
    {
        let mut buf = String::new();
        rdr.read_to_string(&mut buf)?;
        let buf = buf.replace("\r\n", "\n").replace('\r', "\n");

        for (index, line) in buf.split('\n').enumerate() {
            let line = trim_line_ending(line);
            if line.is_empty() {
                continue;
            }
            let fields = parse_csv_row(line);
            if fields.len() < self.config.num_pos_fields + 1 {
                return Err(LegatoError::SchemaMismatch {
                    index,
                    expected: self.config.num_pos_fields + 1,
                    actual: fields.len(),
                    record: line.to_string(),
                });
            }
            self.add_seed_entry(&fields)?;
        }
        Ok(())
    }

    /// 1件のシードレコードを登録します。
    ///
    /// `fields[0]`が表層形、残りが素性列です。空の表層形は無視します。
    pub fn add_seed_entry(&mut self, fields: &[String]) -> Result<()> {
        let surface = &fields[0];
        if surface.is_empty() {
            return Ok(());
        }
        let feature = join_csv(&fields[1..]);
        let (feature_id, pos_id) = self.register_feature(&feature)?;
        let (pattern_id, _) = self.pattern_table.put((surface.clone(), -1))?;

        let candidates = self.seed_pos_features.entry(pattern_id).or_default();
        if !candidates.iter().any(|&(p, _)| p == pos_id) {
            candidates.push((pos_id, feature_id));
        }
        self.max_word_length = self.max_word_length.max(surface.len());
        Ok(())
    }

    /// 文字クラスを構成する全文字をパターンとして登録します。
    ///
    /// 数字・英字・カタカナの順で、各集合の文字を `(文字, -1)` の
    /// パターンに加えます。
    fn register_alphabet_patterns(&mut self) -> Result<()> {
        let chars: String = format!(
            "{}{}{}",
            self.config.digit_chars, self.config.alphabet_chars, self.config.katakana_chars
        );
        for c in chars.chars() {
            self.pattern_table.put((c.to_string(), -1))?;
            self.max_word_length = self.max_word_length.max(c.len_utf8());
        }
        Ok(())
    }

    /// コーパスからパターンを学習し、モデルを返します。
    ///
    /// シード境界を確定し、全例文の断片を列挙して頻度を集計した後、
    /// 刈り込みを実行します。
    pub fn train(mut self, corpus: &Corpus) -> Result<Model> {
        self.register_alphabet_patterns()?;
        self.seed_boundary = self.pattern_table.len();

        for example in corpus.iter() {
            self.mine_sentence(example)?;
        }
        self.prune()
    }

    /// 1文の全トークンについて断片パターンを列挙します。
    fn mine_sentence(&mut self, example: &Example) -> Result<()> {
        let sentence = example.sentence();
        let bytes = sentence.as_bytes();
        let mut sent_loc = 0usize;
        let mut prev_pos_id = POS_ID_BOS as i32;

        for token in example.tokens() {
            let surface = token.surface();
            let shift = surface.len();
            let (feature_id, pos_id) = self.register_feature(token.feature())?;

            let limit = (bytes.len() - sent_loc).min(self.max_word_length);
            let mut sent_len = shift;
            while sent_len <= limit {
                let fragment = &sentence[sent_loc..sent_loc + sent_len];
                let (frag_id, frag_existed) =
                    self.pattern_table.put((fragment.to_string(), -1))?;
                let (pat_id, _) = self.pattern_table.put((fragment.to_string(), prev_pos_id))?;
                self.counts
                    .entry(frag_id)
                    .or_default()
                    .add(shift as i32, feature_id);
                self.counts
                    .entry(pat_id)
                    .or_default()
                    .add(shift as i32, feature_id);
                // 新出の断片はこれ以上延長しない。
                if !frag_existed {
                    break;
                }
                if sent_loc + sent_len >= bytes.len() {
                    break;
                }
                sent_len += len_utf8(bytes[sent_loc + sent_len]).max(1);
            }

            // シード外のトークンには「表層なし・直前POSのみ」の
            // フォールバックパターンを合成する（数字列を除く）。
            let token_pattern = self.pattern_table.get_by_key(&(surface.to_string(), -1));
            let is_seed =
                token_pattern.is_some_and(|id| (id as usize) < self.seed_boundary);
            if !is_seed && self.config.char_class.classify(surface) != CharKind::DIGIT {
                let pos = self
                    .pos_table
                    .get_by_id(pos_id)
                    .map(String::clone)
                    .unwrap_or_default();
                let fallback_feature = format!("{pos},*,*,*");
                let (fallback_id, _) = self.register_feature(&fallback_feature)?;
                let (empty_id, _) = self.pattern_table.put((String::new(), prev_pos_id))?;
                self.counts.entry(empty_id).or_default().add(0, fallback_id);
            }

            sent_loc += shift;
            prev_pos_id = pos_id as i32;
        }
        Ok(())
    }

    /// 最頻POSのPOS文字列を返します。
    ///
    /// 文頭POSは候補から除きます。同率の場合はIDの小さい方です。
    fn max_pos_string(&self) -> String {
        let mut best_id = POS_ID_UNKNOWN;
        let mut best_count = 0;
        for pos_id in POS_ID_UNKNOWN..self.pos_table.len() as u32 {
            let count = self.counters.count(pos_counter_key(pos_id));
            if count > best_count {
                best_count = count;
                best_id = pos_id;
            }
        }
        self.pos_table
            .get_by_id(best_id)
            .map(String::clone)
            .unwrap_or_default()
    }

    /// 未観測パターンの素性を確定し、冗長なパターンを捨てます。
    fn prune(mut self) -> Result<Model> {
        // 表層から代表パターンIDへの二次トライ。各表層の初出IDが
        // 代表になります（断片は常に `(表層, -1)` が先に作られる）。
        let mut surface_to_rep: HashMap<String, u32> = HashMap::new();
        for id in 0..self.pattern_table.len() as u32 {
            let (surface, _) = self.pattern_table.get_by_id(id).unwrap();
            if surface.is_empty() {
                continue;
            }
            surface_to_rep.entry(surface.clone()).or_insert(id);
        }
        let mut sorted: Vec<(&str, u32)> = surface_to_rep
            .iter()
            .map(|(s, &id)| (s.as_str(), id))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        let pattern_trie = if sorted.is_empty() {
            None
        } else {
            let keys: Vec<&[u8]> = sorted.iter().map(|(s, _)| s.as_bytes()).collect();
            let values: Vec<u32> = sorted.iter().map(|(_, id)| *id).collect();
            Some(Trie::build(&keys, &values)?)
        };

        let num_patterns = self.pattern_table.len();
        let mut resolved: Vec<Option<(i32, u32)>> = vec![None; num_patterns];
        let mut patterns = Vec::new();

        for id in 0..num_patterns as u32 {
            let (surface, prev_pos_id) = self.pattern_table.get_by_id(id).unwrap().clone();
            let char_kind = self.config.char_class.classify(&surface);

            let (shift, feature_id, count) = match self.counts.get(&id) {
                Some(c) if !c.is_empty() => {
                    let (shift, feature_id) = c.resolve();
                    (shift, feature_id, c.total())
                }
                _ => {
                    let (shift, feature_id) = if let Some(candidates) =
                        self.seed_pos_features.get(&id).cloned()
                    {
                        // シードのみのパターンには、大域頻度が最小のPOS候補の
                        // 素性を与える。
                        let mut best = candidates[0];
                        let mut best_count = self.counters.count(pos_counter_key(best.0));
                        for &(pos_id, feature_id) in &candidates[1..] {
                            let count = self.counters.count(pos_counter_key(pos_id));
                            if count < best_count {
                                best = (pos_id, feature_id);
                                best_count = count;
                            }
                        }
                        (-1, best.1)
                    } else if char_kind == CharKind::DIGIT {
                        let feature = self.config.digit_feature.clone();
                        (-1, self.register_feature(&feature)?.0)
                    } else if char_kind != CharKind::OTHER {
                        let feature = format!(
                            "{},{},*",
                            self.max_pos_string(),
                            join_csv([surface.as_str(), surface.as_str()]),
                        );
                        (-1, self.register_feature(&feature)?.0)
                    } else {
                        let feature = self.config.symbol_feature.clone();
                        (-1, self.register_feature(&feature)?.0)
                    };
                    (shift, feature_id, 0)
                }
            };
            resolved[id as usize] = Some((shift, feature_id));

            // 最長の真の接頭辞が同じ `(シフト, 素性)` に解決済みなら冗長。
            if let (Some(trie), Some(last)) = (&pattern_trie, surface.chars().last()) {
                let bytes = surface.as_bytes();
                let prefix_end = bytes.len() - last.len_utf8();
                if prefix_end > 0 {
                    if let Some((_, rep_id)) = trie.longest_prefix(&bytes[..prefix_end]) {
                        if resolved[rep_id as usize] == Some((shift, feature_id)) {
                            continue;
                        }
                    }
                }
            }

            // 希少だが実在するパターンも寄与するよう、頻度+1で加算する。
            let bump = count.saturating_add(1);
            for c in surface.chars() {
                self.counters.add(u32::from(c), bump)?;
            }
            if prev_pos_id >= 0 {
                self.counters.add(pos_counter_key(prev_pos_id as u32), bump)?;
            }

            patterns.push(Pattern {
                surface: surface.into_bytes(),
                prev_pos_id,
                count,
                shift,
                char_kind,
                feature_id,
            });
        }

        Ok(Model::new(
            patterns,
            self.pos_table,
            self.feature_table,
            self.feature_to_pos,
            self.counters,
            self.config.num_pos_fields,
        ))
    }
}
