//! トライノード用の固定バケット・ハッシュマップ
//!
//! このモジュールは、トライの子ノード集合を格納する単一トークンキーの
//! ハッシュマップを提供します。FNV-1aハッシュでバケットを選択し、
//! 全バケットのエントリを1本の共有バッファにソート済み区間として保持します。
//! 小さい区間（4件以下）は線形走査、それ以上は二分探索で検索します。

use std::io::{Read, Write};

use crate::errors::{LegatoError, Result};
use crate::idmap::MAX_ID;
use crate::trie::Token;

/// バケット数
///
/// ノードあたりのペイロードとしては64が妥当なデフォルトです。
pub(crate) const NUM_BUCKETS: usize = 64;

/// 線形走査で済ませる区間長の上限
const LINEAR_SCAN_MAX: u32 = 4;

/// FNV-1aハッシュ
#[inline(always)]
fn fnv1a(data: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let mut hash = OFFSET_BASIS;
    for &b in data {
        hash = (hash ^ u32::from(b)).wrapping_mul(PRIME);
    }
    hash
}

/// 共有バッファ内の1区間を表すバケットヘッダ
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
struct Bucket {
    /// 区間内のエンティティ数
    count: u32,
    /// 共有バッファへのオフセット
    offset: u32,
}

/// キーと値のペア
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entity<K> {
    key: K,
    value: u32,
}

/// 単一トークンキーの固定バケット・ハッシュマップ
///
/// # 不変条件
///
/// - エンティティ数は`i32::MAX`以下
/// - 各バケットの区間は互いに素で、共有バッファ全体を被覆する
/// - 各区間内のエンティティはキーの昇順
/// - シリアライズとデシリアライズはバイト単位で往復一致する
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenHashMap<K> {
    buckets: Vec<Bucket>,
    entities: Vec<Entity<K>>,
}

impl<K> Default for TokenHashMap<K>
where
    K: Token,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TokenHashMap<K>
where
    K: Token,
{
    /// 新しい空のマップを作成します
    pub fn new() -> Self {
        Self {
            buckets: vec![Bucket::default(); NUM_BUCKETS],
            entities: Vec::new(),
        }
    }

    #[inline(always)]
    fn bucket_index(key: K) -> usize {
        let raw = key.to_u32().to_le_bytes();
        (fnv1a(&raw[..usize::from(K::WIDTH)]) as usize) % NUM_BUCKETS
    }

    /// 区間内でキーを探し、区間先頭からの相対位置を返します
    fn search(&self, bucket: Bucket, key: K) -> Option<u32> {
        let offset = bucket.offset as usize;
        if bucket.count <= LINEAR_SCAN_MAX {
            for i in 0..bucket.count as usize {
                if self.entities[offset + i].key == key {
                    return Some(i as u32);
                }
            }
            None
        } else {
            let run = &self.entities[offset..offset + bucket.count as usize];
            run.binary_search_by(|e| e.key.cmp(&key)).ok().map(|i| i as u32)
        }
    }

    /// キーに値を対応付けます
    ///
    /// キーが既存の場合は値を上書きします。新規の場合は区間内の
    /// ソート位置に挿入し、後続バケットのオフセットを調整します。
    ///
    /// # エラー
    ///
    /// エンティティ数が`i32::MAX`を超える場合、[`LegatoError::TooMany`] が
    /// 返されます。
    pub fn update(&mut self, key: K, value: u32) -> Result<()> {
        let idx = Self::bucket_index(key);
        let bucket = self.buckets[idx];

        if bucket.count == 0 {
            if self.entities.len() >= MAX_ID as usize {
                return Err(LegatoError::TooMany {
                    what: "TokenHashMap",
                });
            }
            self.buckets[idx] = Bucket {
                count: 1,
                offset: self.entities.len() as u32,
            };
            self.entities.push(Entity { key, value });
            return Ok(());
        }

        if let Some(i) = self.search(bucket, key) {
            self.entities[(bucket.offset + i) as usize].value = value;
            return Ok(());
        }

        if self.entities.len() >= MAX_ID as usize {
            return Err(LegatoError::TooMany {
                what: "TokenHashMap",
            });
        }

        // 区間内のソート位置へ挿入する。
        let offset = bucket.offset as usize;
        let run = &self.entities[offset..offset + bucket.count as usize];
        let pos = run.partition_point(|e| e.key < key);
        self.entities.insert(offset + pos, Entity { key, value });
        self.buckets[idx].count += 1;

        // 挿入点より後ろの区間を持つバケットのオフセットを詰める。
        for (i, b) in self.buckets.iter_mut().enumerate() {
            if i != idx && b.offset > bucket.offset {
                b.offset += 1;
            }
        }
        Ok(())
    }

    /// キーに対応する値を返します
    pub fn find(&self, key: K) -> Option<u32> {
        let bucket = self.buckets[Self::bucket_index(key)];
        if bucket.count == 0 {
            return None;
        }
        self.search(bucket, key)
            .map(|i| self.entities[(bucket.offset + i) as usize].value)
    }

    /// キーが存在するかどうか
    pub fn contains(&self, key: K) -> bool {
        let bucket = self.buckets[Self::bucket_index(key)];
        bucket.count != 0 && self.search(bucket, key).is_some()
    }

    /// キーを削除します
    ///
    /// # 戻り値
    ///
    /// 削除した場合は`true`、キーが存在しない場合は`false`
    pub fn erase(&mut self, key: K) -> bool {
        let idx = Self::bucket_index(key);
        let bucket = self.buckets[idx];
        if bucket.count == 0 {
            return false;
        }
        let Some(i) = self.search(bucket, key) else {
            return false;
        };
        self.entities.remove((bucket.offset + i) as usize);
        self.buckets[idx].count -= 1;
        for (k, b) in self.buckets.iter_mut().enumerate() {
            if k != idx && b.offset > bucket.offset {
                b.offset -= 1;
            }
        }
        true
    }

    /// 格納されているエンティティ数を返します
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// マップが空かどうか
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// `(キー, 値)` の全ペアをバッファ順で返すイテレータ
    pub fn iter(&self) -> impl Iterator<Item = (K, u32)> + '_ {
        self.entities.iter().map(|e| (e.key, e.value))
    }

    /// バケットヘッダとエンティティ区間をシリアライズします
    ///
    /// レイアウトは、エンティティ総数(u32)、バケットヘッダ
    /// `(count, offset)`×64、エンティティ`(key, value)`の順で、
    /// すべてリトルエンディアンです。
    pub fn serialize<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(&(self.entities.len() as u32).to_le_bytes())?;
        for b in &self.buckets {
            wtr.write_all(&b.count.to_le_bytes())?;
            wtr.write_all(&b.offset.to_le_bytes())?;
        }
        for e in &self.entities {
            wtr.write_all(&e.key.to_u32().to_le_bytes())?;
            wtr.write_all(&e.value.to_le_bytes())?;
        }
        Ok(())
    }

    /// バイト列からマップを復元します
    ///
    /// 全区間が境界内に収まり、互いに素で、併せてバッファ全体を
    /// 被覆すること、および各区間がキー昇順であることを検証します。
    ///
    /// # エラー
    ///
    /// 不変条件違反を検出した場合、[`LegatoError::CorruptBlob`] が
    /// 返されます。
    pub fn deserialize<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let num_entities = read_u32(&mut rdr)? as usize;
        if num_entities > MAX_ID as usize {
            return Err(LegatoError::corrupt_blob("hashmap entity count too large"));
        }

        let mut buckets = Vec::with_capacity(NUM_BUCKETS);
        for _ in 0..NUM_BUCKETS {
            let count = read_u32(&mut rdr)?;
            let offset = read_u32(&mut rdr)?;
            buckets.push(Bucket { count, offset });
        }

        // エンティティ数は未検証の入力なので、読み進めながら確保する。
        let mut entities = Vec::new();
        for _ in 0..num_entities {
            let key_raw = read_u32(&mut rdr)?;
            let value = read_u32(&mut rdr)?;
            let key = K::from_u32(key_raw).ok_or_else(|| {
                LegatoError::corrupt_blob(format!("hashmap key {key_raw} out of token range"))
            })?;
            entities.push(Entity { key, value });
        }

        // 区間の境界・非重複・被覆を検証する。
        let mut total = 0u64;
        let mut spans: Vec<(u32, u32)> = Vec::new();
        for b in &buckets {
            if b.count == 0 {
                continue;
            }
            let end = u64::from(b.offset) + u64::from(b.count);
            if end > num_entities as u64 {
                return Err(LegatoError::corrupt_blob("hashmap bucket out of bounds"));
            }
            total += u64::from(b.count);
            spans.push((b.offset, b.count));
        }
        if total != num_entities as u64 {
            return Err(LegatoError::corrupt_blob(
                "hashmap buckets do not cover the entity buffer",
            ));
        }
        spans.sort_unstable();
        let mut prev_end = 0u32;
        for (offset, count) in spans {
            if offset < prev_end {
                return Err(LegatoError::corrupt_blob("hashmap buckets overlap"));
            }
            prev_end = offset + count;
        }

        // 各区間のキー順を検証する。
        for b in &buckets {
            if b.count == 0 {
                continue;
            }
            let run = &entities[b.offset as usize..(b.offset + b.count) as usize];
            if run.windows(2).any(|w| w[0].key >= w[1].key) {
                return Err(LegatoError::corrupt_blob("hashmap bucket run is not sorted"));
            }
        }

        Ok(Self { buckets, entities })
    }
}

pub(crate) fn read_u32<R>(rdr: &mut R) -> Result<u32>
where
    R: Read,
{
    let mut buf = [0u8; 4];
    rdr.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_find() {
        let mut map = TokenHashMap::<u32>::new();
        map.update(5, 50).unwrap();
        map.update(1000, 60).unwrap();
        map.update(5, 70).unwrap();
        assert_eq!(map.find(5), Some(70));
        assert_eq!(map.find(1000), Some(60));
        assert_eq!(map.find(6), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_many_keys() {
        let mut map = TokenHashMap::<u32>::new();
        // バケット数より多いキーで衝突・二分探索経路を通す。
        for i in 0..1000u32 {
            map.update(i * 7, i).unwrap();
        }
        for i in 0..1000u32 {
            assert_eq!(map.find(i * 7), Some(i));
            assert!(map.contains(i * 7));
        }
        assert_eq!(map.find(3), None);
    }

    #[test]
    fn test_erase() {
        let mut map = TokenHashMap::<u8>::new();
        for b in b"hello world" {
            map.update(*b, u32::from(*b)).unwrap();
        }
        assert!(map.erase(b'h'));
        assert!(!map.erase(b'h'));
        assert_eq!(map.find(b'h'), None);
        assert_eq!(map.find(b'w'), Some(u32::from(b'w')));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut map = TokenHashMap::<u32>::new();
        for i in 0..300u32 {
            map.update(i * 31 + 1, i).unwrap();
        }
        let mut bytes = vec![];
        map.serialize(&mut bytes).unwrap();
        let restored = TokenHashMap::<u32>::deserialize(bytes.as_slice()).unwrap();
        assert_eq!(map, restored);

        // バイト単位の往復一致。
        let mut bytes2 = vec![];
        restored.serialize(&mut bytes2).unwrap();
        assert_eq!(bytes, bytes2);
    }

    #[test]
    fn test_deserialize_rejects_overlap() {
        let mut map = TokenHashMap::<u32>::new();
        map.update(1, 10).unwrap();
        map.update(2, 20).unwrap();
        let mut bytes = vec![];
        map.serialize(&mut bytes).unwrap();

        // 2番目に現れるバケットのオフセットを強制的に重複させる。
        let mut seen = 0;
        for i in 0..NUM_BUCKETS {
            let base = 4 + i * 8;
            let count = u32::from_le_bytes(bytes[base..base + 4].try_into().unwrap());
            if count > 0 {
                seen += 1;
                if seen == 2 {
                    bytes[base + 4..base + 8].copy_from_slice(&0u32.to_le_bytes());
                }
            }
        }
        assert!(TokenHashMap::<u32>::deserialize(bytes.as_slice()).is_err());
    }
}
