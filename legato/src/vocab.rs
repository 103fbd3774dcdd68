//! 語彙テーブル
//!
//! このモジュールは、表層形と語彙IDの双方向対応を提供します。
//! IDには予約範囲があります。`0`はテキスト終端、`1..=256`は
//! UTF-8バイトフォールバック（バイト値+1）、`257`以降が語彙本体です。

use hashbrown::HashMap;

use crate::errors::{LegatoError, Result};

/// テキスト終端の予約ID
pub const EOT_ID: u32 = 0;

/// バイトフォールバックIDのオフセット
///
/// バイト値`b`はID `b + FALLBACK_OFFSET` で表されます。
pub const FALLBACK_OFFSET: u32 = 1;

/// バイトフォールバック範囲の最大ID（両端含む）
pub const FALLBACK_MAX: u32 = 256;

/// 語彙本体のIDの下限
pub const VOCAB_ID_BASE: u32 = 257;

/// 表層形と語彙IDの双方向テーブル
///
/// IDは連続している必要はありません（疎な語彙を許容します）。
#[derive(Clone, Default)]
pub struct Vocabulary {
    surface_to_id: HashMap<String, u32>,
    id_to_surface: HashMap<u32, String>,
}

impl Vocabulary {
    /// `(表層形, ID)` のペア列から語彙を構築します
    ///
    /// # エラー
    ///
    /// 空の表層形、予約範囲（`0..=256`）のID、表層形またはIDの重複は
    /// [`LegatoError::InvalidArgument`] になります。
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let mut vocab = Self::default();
        for (surface, id) in entries {
            vocab.insert(surface, id)?;
        }
        Ok(vocab)
    }

    fn insert(&mut self, surface: String, id: u32) -> Result<()> {
        if surface.is_empty() {
            return Err(LegatoError::invalid_argument(
                "entries",
                "an empty surface is not allowed",
            ));
        }
        if id < VOCAB_ID_BASE {
            return Err(LegatoError::invalid_argument(
                "entries",
                format!("id {id} for {surface:?} is in the reserved range 0..{VOCAB_ID_BASE}"),
            ));
        }
        if id > i32::MAX as u32 {
            return Err(LegatoError::invalid_argument(
                "entries",
                format!("id {id} for {surface:?} does not fit in a non-negative 32-bit integer"),
            ));
        }
        if self.id_to_surface.contains_key(&id) {
            return Err(LegatoError::invalid_argument(
                "entries",
                format!("id {id} is assigned twice"),
            ));
        }
        if self.surface_to_id.contains_key(&surface) {
            return Err(LegatoError::invalid_argument(
                "entries",
                format!("surface {surface:?} is registered twice"),
            ));
        }
        self.surface_to_id.insert(surface.clone(), id);
        self.id_to_surface.insert(id, surface);
        Ok(())
    }

    /// IDから表層形を引きます
    #[inline(always)]
    pub fn surface(&self, id: u32) -> Option<&str> {
        self.id_to_surface.get(&id).map(String::as_str)
    }

    /// 表層形からIDを引きます
    #[inline(always)]
    pub fn id(&self, surface: &str) -> Option<u32> {
        self.surface_to_id.get(surface).copied()
    }

    /// エントリ数を返します
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.surface_to_id.len()
    }

    /// 語彙が空かどうか
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.surface_to_id.is_empty()
    }

    /// `(表層形, ID)` の全ペアを順不定で返すイテレータ
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.surface_to_id.iter().map(|(s, &id)| (s.as_str(), id))
    }
}
