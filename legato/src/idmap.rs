//! 双方向IDテーブル
//!
//! このモジュールは、任意のキー型と密な整数IDの双方向対応を提供します。
//! IDは挿入順に0から単調に割り当てられ、削除はできません。
//! 容量は符号付き32ビット整数の最大値で制限されます。

use core::hash::Hash;

use hashbrown::HashMap;

use crate::errors::{LegatoError, Result};

/// 割り当て可能なIDの最大値
pub const MAX_ID: u32 = i32::MAX as u32;

/// 次のIDが割り当て可能かどうかを返します
///
/// 上限判定の向きに注意。`next_id`が`MAX_ID`を超える場合のみ拒否します。
#[inline(always)]
pub(crate) const fn has_capacity(next_id: usize) -> bool {
    next_id <= MAX_ID as usize
}

/// キーと密な整数IDの双方向テーブル
///
/// # 不変条件
///
/// - 両方向の対応は常に一致する
/// - IDは挿入順に0から割り当てられる
/// - エントリ数は`i32::MAX`以下
/// - 削除操作はない
#[derive(Clone, Default)]
pub struct IdMap<T> {
    key_to_id: HashMap<T, u32>,
    id_to_key: Vec<T>,
}

/// 文字列キーの特殊化
pub type StrIdMap = IdMap<String>;

/// (文字列, 整数)キーの特殊化
///
/// 学習ではパターンキー`(surface, prev_pos_id)`に使用します。
pub type StrIntIdMap = IdMap<(String, i32)>;

/// (整数, 整数)キーの特殊化
pub type IntPairIdMap = IdMap<(i32, i32)>;

impl<T> IdMap<T>
where
    T: Eq + Hash + Clone,
{
    /// 新しい空のテーブルを作成します
    pub fn new() -> Self {
        Self {
            key_to_id: HashMap::new(),
            id_to_key: Vec::new(),
        }
    }

    /// キーを登録し、IDと既存かどうかのフラグを返します
    ///
    /// 初出のキーには次のIDを割り当てます。既存のキーに対しては
    /// 割り当て済みのIDを返すだけで、テーブルは変化しません。
    ///
    /// # 戻り値
    ///
    /// `(id, existed)` のペア
    ///
    /// # エラー
    ///
    /// エントリ数が`i32::MAX`を超える場合、[`LegatoError::TooMany`] が
    /// 返されます。
    pub fn put(&mut self, key: T) -> Result<(u32, bool)> {
        if let Some(&id) = self.key_to_id.get(&key) {
            return Ok((id, true));
        }
        let next_id = self.id_to_key.len();
        if !has_capacity(next_id) {
            return Err(LegatoError::TooMany { what: "IdMap" });
        }
        let id = next_id as u32;
        self.key_to_id.insert(key.clone(), id);
        self.id_to_key.push(key);
        Ok((id, false))
    }

    /// キーからIDを引きます
    #[inline(always)]
    pub fn get_by_key(&self, key: &T) -> Option<u32> {
        self.key_to_id.get(key).copied()
    }

    /// IDからキーを引きます
    #[inline(always)]
    pub fn get_by_id(&self, id: u32) -> Option<&T> {
        self.id_to_key.get(id as usize)
    }

    /// 登録済みエントリ数を返します
    ///
    /// 次に割り当てられるIDと同じ値です。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.id_to_key.len()
    }

    /// テーブルが空かどうか
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.id_to_key.is_empty()
    }

    /// キーをID順で返すイテレータ
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.id_to_key.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let mut map = StrIdMap::new();
        assert_eq!(map.put("名詞".to_string()).unwrap(), (0, false));
        assert_eq!(map.put("動詞".to_string()).unwrap(), (1, false));
        assert_eq!(map.put("名詞".to_string()).unwrap(), (0, true));
        assert_eq!(map.get_by_key(&"動詞".to_string()), Some(1));
        assert_eq!(map.get_by_id(0).map(String::as_str), Some("名詞"));
        assert_eq!(map.get_by_id(2), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_bijection() {
        let mut map = IntPairIdMap::new();
        for i in 0..100i32 {
            let (id, existed) = map.put((i, -i)).unwrap();
            assert!(!existed);
            assert_eq!(id, i as u32);
        }
        for i in 0..100i32 {
            let id = map.get_by_key(&(i, -i)).unwrap();
            assert_eq!(map.get_by_id(id), Some(&(i, -i)));
        }
    }

    #[test]
    fn test_capacity_predicate() {
        // 上限判定は「超えたら拒否」であり「未満なら拒否」ではない。
        assert!(has_capacity(0));
        assert!(has_capacity(MAX_ID as usize));
        assert!(!has_capacity(MAX_ID as usize + 1));
    }

    #[test]
    fn test_pattern_key() {
        let mut map = StrIntIdMap::new();
        let (id_a, _) = map.put(("吾輩".to_string(), -1)).unwrap();
        let (id_b, _) = map.put(("吾輩".to_string(), 0)).unwrap();
        assert_ne!(id_a, id_b);
        assert_eq!(map.get_by_key(&("吾輩".to_string(), -1)), Some(id_a));
    }
}
