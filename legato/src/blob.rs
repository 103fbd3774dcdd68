//! 型付きテンソルブロブのコンテナ
//!
//! このモジュールは、名前付き領域の集合を単一のバイト列として永続化する
//! コンテナを提供します。レイアウトは、ヘッダ（マジック・バージョン・
//! 領域数）、領域ディレクトリ（名前・データ型・オフセット・バイト長・
//! 形状）、連結されたペイロード、UTF-8のキー/値メタデータの順で、
//! すべてリトルエンディアン・パディングなしです。

use std::io::{Read, Write};

use crate::errors::{LegatoError, Result};
use crate::trie::hashmap::read_u32;

const MAGIC: &[u8; 4] = b"LGTB";
const FORMAT_VERSION: u32 = 1;

/// 名前の長さ・メタデータ長の上限（破損データの早期検出用）
const MAX_STRING_LEN: usize = 1 << 20;

/// 領域の要素データ型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    /// 生バイト列
    U8,
    /// 符号付き32ビット整数
    I32,
    /// 符号なし32ビット整数
    U32,
}

impl DType {
    /// 1要素のバイト数を返します
    #[inline(always)]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I32 | Self::U32 => 4,
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::U8 => 0,
            Self::I32 => 1,
            Self::U32 => 2,
        }
    }

    fn from_u8(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(Self::U8),
            1 => Ok(Self::I32),
            2 => Ok(Self::U32),
            _ => Err(LegatoError::corrupt_blob(format!("unknown dtype {raw}"))),
        }
    }
}

/// 1つの名前付き領域
#[derive(Clone, Debug)]
pub struct Region {
    name: String,
    dtype: DType,
    shape: Vec<u64>,
    data: Vec<u8>,
}

impl Region {
    /// 領域名を返します
    pub fn name(&self) -> &str {
        &self.name
    }

    /// データ型を返します
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// 形状を返します
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// ペイロードのバイト列を返します
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// ペイロードをi32列として解釈して返します
    pub fn as_i32(&self) -> Vec<i32> {
        self.data
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// ペイロードをu32列として解釈して返します
    pub fn as_u32(&self) -> Vec<u32> {
        self.data
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

/// 名前付き領域とメタデータの集合
///
/// 書き込み側は[`Blob::add_region`]と[`Blob::add_metadata`]で内容を
/// 組み立てて[`Blob::write_to`]で書き出します。読み込み側は
/// [`Blob::read_from`]で全体を検証付きで復元します。
#[derive(Default)]
pub struct Blob {
    regions: Vec<Region>,
    metadata: Vec<(String, String)>,
}

impl Blob {
    /// 新しい空のブロブを作成します
    pub fn new() -> Self {
        Self::default()
    }

    /// 領域を追加します
    ///
    /// # エラー
    ///
    /// 名前の重複、または形状とバイト長の不一致は
    /// [`LegatoError::InvalidArgument`] になります。
    pub fn add_region(
        &mut self,
        name: &str,
        dtype: DType,
        shape: &[u64],
        data: Vec<u8>,
    ) -> Result<()> {
        if self.regions.iter().any(|r| r.name == name) {
            return Err(LegatoError::invalid_argument(
                "name",
                format!("region {name:?} is already present"),
            ));
        }
        if shape_byte_len(shape, dtype) != Some(data.len() as u64) {
            return Err(LegatoError::invalid_argument(
                "shape",
                format!(
                    "shape {:?} with dtype {:?} does not match {} bytes",
                    shape,
                    dtype,
                    data.len()
                ),
            ));
        }
        self.regions.push(Region {
            name: name.to_string(),
            dtype,
            shape: shape.to_vec(),
            data,
        });
        Ok(())
    }

    /// メタデータのキー/値ペアを追加します
    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.push((key.to_string(), value.to_string()));
    }

    /// 名前で領域を引きます
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// キーでメタデータを引きます
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// ブロブ全体を書き出します
    pub fn write_to<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MAGIC)?;
        wtr.write_all(&FORMAT_VERSION.to_le_bytes())?;
        wtr.write_all(&(self.regions.len() as u32).to_le_bytes())?;

        let mut offset = 0u64;
        for r in &self.regions {
            wtr.write_all(&(r.name.len() as u32).to_le_bytes())?;
            wtr.write_all(r.name.as_bytes())?;
            wtr.write_all(&[r.dtype.to_u8()])?;
            wtr.write_all(&[r.shape.len() as u8])?;
            for &dim in &r.shape {
                wtr.write_all(&dim.to_le_bytes())?;
            }
            wtr.write_all(&offset.to_le_bytes())?;
            wtr.write_all(&(r.data.len() as u64).to_le_bytes())?;
            offset += r.data.len() as u64;
        }

        for r in &self.regions {
            wtr.write_all(&r.data)?;
        }

        wtr.write_all(&(self.metadata.len() as u32).to_le_bytes())?;
        for (k, v) in &self.metadata {
            wtr.write_all(&(k.len() as u32).to_le_bytes())?;
            wtr.write_all(k.as_bytes())?;
            wtr.write_all(&(v.len() as u32).to_le_bytes())?;
            wtr.write_all(v.as_bytes())?;
        }
        Ok(())
    }

    /// ブロブ全体を読み込み、検証します
    ///
    /// # エラー
    ///
    /// マジック・バージョン・ディレクトリの整合性（オフセットの連続性、
    /// 形状とバイト長の一致、名前の一意性）の違反は
    /// [`LegatoError::CorruptBlob`] になります。
    pub fn read_from<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0u8; 4];
        rdr.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(LegatoError::corrupt_blob("bad blob magic"));
        }
        let version = read_u32(&mut rdr)?;
        if version != FORMAT_VERSION {
            return Err(LegatoError::corrupt_blob(format!(
                "unsupported blob format version {version}"
            )));
        }
        let num_regions = read_u32(&mut rdr)? as usize;

        struct Entry {
            name: String,
            dtype: DType,
            shape: Vec<u64>,
            offset: u64,
            byte_len: u64,
        }

        let mut entries = Vec::new();
        for _ in 0..num_regions {
            let name = read_string(&mut rdr)?;
            let mut byte = [0u8; 1];
            rdr.read_exact(&mut byte)?;
            let dtype = DType::from_u8(byte[0])?;
            rdr.read_exact(&mut byte)?;
            let ndim = byte[0] as usize;
            let mut shape = Vec::with_capacity(ndim);
            for _ in 0..ndim {
                shape.push(read_u64(&mut rdr)?);
            }
            let offset = read_u64(&mut rdr)?;
            let byte_len = read_u64(&mut rdr)?;
            if shape_byte_len(&shape, dtype) != Some(byte_len) {
                return Err(LegatoError::corrupt_blob(format!(
                    "region {name:?}: shape does not match byte length"
                )));
            }
            if entries.iter().any(|e: &Entry| e.name == name) {
                return Err(LegatoError::corrupt_blob(format!(
                    "region {name:?} appears twice"
                )));
            }
            entries.push(Entry {
                name,
                dtype,
                shape,
                offset,
                byte_len,
            });
        }

        // ペイロードは隙間なく連結されていることを要求する。
        let mut expected_offset = 0u64;
        for e in &entries {
            if e.offset != expected_offset {
                return Err(LegatoError::corrupt_blob(format!(
                    "region {:?}: offset {} does not follow the previous region",
                    e.name, e.offset
                )));
            }
            expected_offset = expected_offset.checked_add(e.byte_len).ok_or_else(|| {
                LegatoError::corrupt_blob("region byte lengths overflow the data section")
            })?;
        }

        let mut regions = Vec::with_capacity(num_regions);
        for e in entries {
            let mut data = Vec::new();
            (&mut rdr).take(e.byte_len).read_to_end(&mut data)?;
            if data.len() as u64 != e.byte_len {
                return Err(LegatoError::corrupt_blob(format!(
                    "region {:?} is truncated",
                    e.name
                )));
            }
            regions.push(Region {
                name: e.name,
                dtype: e.dtype,
                shape: e.shape,
                data,
            });
        }

        let num_metadata = read_u32(&mut rdr)? as usize;
        let mut metadata = Vec::new();
        for _ in 0..num_metadata {
            let key = read_string(&mut rdr)?;
            let value = read_string(&mut rdr)?;
            metadata.push((key, value));
        }

        Ok(Self { regions, metadata })
    }
}

/// 形状とデータ型から総バイト数を計算します
///
/// 乗算が溢れる場合は`None`を返します。
fn shape_byte_len(shape: &[u64], dtype: DType) -> Option<u64> {
    shape
        .iter()
        .try_fold(1u64, |acc, &dim| acc.checked_mul(dim))?
        .checked_mul(dtype.size() as u64)
}

fn read_u64<R>(rdr: &mut R) -> Result<u64>
where
    R: Read,
{
    let mut buf = [0u8; 8];
    rdr.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_string<R>(rdr: &mut R) -> Result<String>
where
    R: Read,
{
    let len = read_u32(rdr)? as usize;
    if len > MAX_STRING_LEN {
        return Err(LegatoError::corrupt_blob(format!(
            "string length {len} is implausibly large"
        )));
    }
    let mut buf = vec![0u8; len];
    rdr.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| LegatoError::corrupt_blob("string is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut blob = Blob::new();
        let table: Vec<u8> = [-1i32, 5, 7]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        blob.add_region("char_to_id", DType::I32, &[3], table).unwrap();
        blob.add_region("feature_strings", DType::U8, &[5], b"hello".to_vec())
            .unwrap();
        blob.add_metadata("creator", "legato");
        blob.add_metadata("num_pos_fields", "4");

        let mut bytes = vec![];
        blob.write_to(&mut bytes).unwrap();
        let restored = Blob::read_from(bytes.as_slice()).unwrap();

        assert_eq!(
            restored.region("char_to_id").unwrap().as_i32(),
            vec![-1, 5, 7]
        );
        assert_eq!(restored.region("feature_strings").unwrap().data(), b"hello");
        assert_eq!(restored.metadata("creator"), Some("legato"));
        assert_eq!(restored.metadata("num_pos_fields"), Some("4"));
        assert!(restored.region("missing").is_none());
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let mut blob = Blob::new();
        blob.add_region("a", DType::U8, &[1], vec![0]).unwrap();
        assert!(blob.add_region("a", DType::U8, &[1], vec![0]).is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut blob = Blob::new();
        assert!(blob.add_region("a", DType::I32, &[2], vec![0; 4]).is_err());
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let mut blob = Blob::new();
        blob.add_region("a", DType::U8, &[1], vec![9]).unwrap();
        let mut bytes = vec![];
        blob.write_to(&mut bytes).unwrap();
        bytes[0] = b'X';
        assert!(Blob::read_from(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_read_rejects_truncated_payload() {
        let mut blob = Blob::new();
        blob.add_region("a", DType::U8, &[4], vec![1, 2, 3, 4]).unwrap();
        let mut bytes = vec![];
        blob.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 6);
        assert!(Blob::read_from(bytes.as_slice()).is_err());
    }
}
