//! 学習設定のモジュール。
//!
//! このモジュールは、学習器の設定値を保持します。文字クラスを構成する
//! 文字集合や予約素性はここで注入でき、日本語以外のコーパスにも
//! 対応できます。

use crate::charclass::{
    CharClassTable, DEFAULT_ALPHABET_CHARS, DEFAULT_DIGIT_CHARS, DEFAULT_KATAKANA_CHARS,
};

/// 文頭を表す予約POS文字列
///
/// 通常のPOSタプルと衝突しないよう、先頭にタブを含みます。
pub const BOS_POS: &str = "\tBOS";

/// 未知語の予約素性
pub const DEFAULT_UNKNOWN_FEATURE: &str = "未知語,*,*,*";

/// 数字列の予約素性
pub const DEFAULT_DIGIT_FEATURE: &str = "名詞,数,*,*";

/// 記号の予約素性
pub const DEFAULT_SYMBOL_FEATURE: &str = "記号,一般,*,*";

/// 学習設定。
///
/// デフォルト値は、MeCab形式の上位4列をPOSタプルとする日本語
/// コーパス向けです。
#[derive(Clone)]
pub struct TrainerConfig {
    pub(crate) num_pos_fields: usize,
    pub(crate) digit_chars: String,
    pub(crate) alphabet_chars: String,
    pub(crate) katakana_chars: String,
    pub(crate) char_class: CharClassTable,
    pub(crate) eos_requires_newline: bool,
    pub(crate) unknown_feature: String,
    pub(crate) digit_feature: String,
    pub(crate) symbol_feature: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerConfig {
    /// デフォルトの学習設定を作成します。
    pub fn new() -> Self {
        Self {
            num_pos_fields: 4,
            digit_chars: DEFAULT_DIGIT_CHARS.to_string(),
            alphabet_chars: DEFAULT_ALPHABET_CHARS.to_string(),
            katakana_chars: DEFAULT_KATAKANA_CHARS.to_string(),
            char_class: CharClassTable::default(),
            eos_requires_newline: false,
            unknown_feature: DEFAULT_UNKNOWN_FEATURE.to_string(),
            digit_feature: DEFAULT_DIGIT_FEATURE.to_string(),
            symbol_feature: DEFAULT_SYMBOL_FEATURE.to_string(),
        }
    }

    /// POSタプルを構成する素性列数を設定します。
    ///
    /// デフォルトは4（MeCabの上位4列）です。
    pub fn num_pos_fields(mut self, num: usize) -> Self {
        self.num_pos_fields = num.max(1);
        self
    }

    /// 文字クラスを構成する文字集合を設定します。
    ///
    /// 文字クラステーブルも同時に作り直されます。
    pub fn alphabets(mut self, digit: &str, alphabet: &str, katakana: &str) -> Self {
        self.digit_chars = digit.to_string();
        self.alphabet_chars = alphabet.to_string();
        self.katakana_chars = katakana.to_string();
        self.char_class = CharClassTable::new(digit, alphabet, katakana);
        self
    }

    /// `EOS`の終端規則を設定します。
    ///
    /// `true`の場合、改行で終わらない末尾の`EOS`を文の終端と
    /// 認めません。デフォルトは`false`です。
    pub fn eos_requires_newline(mut self, yes: bool) -> Self {
        self.eos_requires_newline = yes;
        self
    }

    /// 予約素性（未知語・数字・記号）を設定します。
    pub fn reserved_features(mut self, unknown: &str, digit: &str, symbol: &str) -> Self {
        self.unknown_feature = unknown.to_string();
        self.digit_feature = digit.to_string();
        self.symbol_feature = symbol.to_string();
        self
    }

    /// 文字クラステーブルへの参照を返します。
    pub fn char_class(&self) -> &CharClassTable {
        &self.char_class
    }

    /// `EOS`の終端規則を返します。
    pub fn strict_eos(&self) -> bool {
        self.eos_requires_newline
    }
}
