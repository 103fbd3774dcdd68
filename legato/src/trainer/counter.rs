//! 頻度カウンターのモジュール。
//!
//! このモジュールは、コードポイントとPOS IDを単一のキー空間で数える
//! カウンターテーブルを提供します。キーは初出順に密なIDへ対応付けられ、
//! この密なIDがシリアライズ時の`char_to_id`テーブルの添字になります。

use hashbrown::HashMap;

use crate::errors::{LegatoError, Result};
use crate::idmap::has_capacity;
use crate::utf8::MAX_CODEPOINT;

/// POS IDをカウンターのキー空間へ写します
///
/// コードポイント領域（`0..=MAX_CODEPOINT`）の直後にPOS領域が続きます。
#[inline(always)]
pub(crate) const fn pos_counter_key(pos_id: u32) -> u32 {
    MAX_CODEPOINT + 1 + pos_id
}

/// 頻度と密なIDを保持するカウンターテーブル
#[derive(Clone, Default)]
pub struct CounterTable {
    map: HashMap<u32, Entry>,
    next_dense_id: u32,
}

#[derive(Clone, Copy)]
struct Entry {
    count: u32,
    dense_id: u32,
}

impl CounterTable {
    /// 新しい空のテーブルを作成します
    pub fn new() -> Self {
        Self::default()
    }

    /// キーの頻度を加算します
    ///
    /// 初出のキーには次の密なIDを割り当てます。
    ///
    /// # エラー
    ///
    /// 密なIDが`i32::MAX`を超える場合、[`LegatoError::TooMany`] が
    /// 返されます。
    pub fn add(&mut self, key: u32, amount: u32) -> Result<()> {
        if let Some(entry) = self.map.get_mut(&key) {
            entry.count = entry.count.saturating_add(amount);
            return Ok(());
        }
        if !has_capacity(self.next_dense_id as usize) {
            return Err(LegatoError::TooMany {
                what: "CounterTable",
            });
        }
        self.map.insert(
            key,
            Entry {
                count: amount,
                dense_id: self.next_dense_id,
            },
        );
        self.next_dense_id += 1;
        Ok(())
    }

    /// キーの頻度を返します
    ///
    /// 未登録のキーには0を返します。
    #[inline(always)]
    pub fn count(&self, key: u32) -> u32 {
        self.map.get(&key).map_or(0, |e| e.count)
    }

    /// キーの密なIDを返します
    #[inline(always)]
    pub fn dense_id(&self, key: u32) -> Option<u32> {
        self.map.get(&key).map(|e| e.dense_id)
    }

    /// 割り当て済みの密なIDの個数を返します
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// テーブルが空かどうか
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `(キー, 頻度, 密なID)` の全エントリを順不定で返すイテレータ
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.map.iter().map(|(&k, e)| (k, e.count, e.dense_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_count() {
        let mut table = CounterTable::new();
        table.add(u32::from('猫'), 1).unwrap();
        table.add(u32::from('猫'), 2).unwrap();
        table.add(pos_counter_key(0), 5).unwrap();
        assert_eq!(table.count(u32::from('猫')), 3);
        assert_eq!(table.count(pos_counter_key(0)), 5);
        assert_eq!(table.count(u32::from('犬')), 0);
    }

    #[test]
    fn test_dense_ids_in_first_touch_order() {
        let mut table = CounterTable::new();
        table.add(100, 1).unwrap();
        table.add(50, 1).unwrap();
        table.add(100, 1).unwrap();
        table.add(200, 1).unwrap();
        assert_eq!(table.dense_id(100), Some(0));
        assert_eq!(table.dense_id(50), Some(1));
        assert_eq!(table.dense_id(200), Some(2));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_pos_key_space_is_disjoint() {
        assert!(pos_counter_key(0) > MAX_CODEPOINT);
    }
}
