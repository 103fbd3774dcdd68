//! # legato
//!
//! legatoは、最長一致による部分語トークナイザーと、POSタガー用の
//! パターン辞書学習器の実装です。
//!
//! ## 概要
//!
//! このライブラリは、UTF-8テキスト（主対象は漢字・ひらがな・カタカナ・
//! 全角英数字が混在する日本語）を対象に、以下の2つのコアを提供します。
//!
//! - **語彙トライコア**: UTF-8バイト列またはコードポイント列をキーと
//!   するコンパクトなトライで、完全一致・最長接頭辞検索と、語彙に
//!   ない文字のUTF-8バイトフォールバックを備えた`encode`/`decode`を
//!   支えます。
//! - **パターンマイニング学習器コア**: シード語彙とPOSタグ付き
//!   コーパスから `(断片, 直前POS) → (シフト, 素性)` のパターン辞書を
//!   導出し、文字クラスヒューリスティクスで未知語に素性を与え、
//!   二次トライで冗長パターンを削除して永続化します。
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use legato::tokenizer::Tokenizer;
//! use legato::vocab::Vocabulary;
//!
//! let vocab = Vocabulary::from_entries([
//!     ("吾輩".to_string(), 300),
//!     ("は".to_string(), 301),
//!     ("猫".to_string(), 302),
//!     ("である".to_string(), 303),
//! ])?;
//! let tokenizer = Tokenizer::from_vocab(vocab)?;
//!
//! let ids = tokenizer.encode("吾輩は猫である")?;
//! assert_eq!(ids, vec![300, 301, 302, 303]);
//! assert_eq!(tokenizer.decode(&ids)?, "吾輩は猫である");
//!
//! // 語彙にない文字はバイトフォールバックで往復する。
//! let ids = tokenizer.encode("吾輩は🐈である")?;
//! assert_eq!(tokenizer.decode(&ids)?, "吾輩は🐈である");
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// 型付きテンソルブロブのコンテナ
pub mod blob;

/// 文字クラス定義
pub mod charclass;

/// エラー型の定義
pub mod errors;

/// 双方向IDテーブル
pub mod idmap;

/// 最長一致トークナイザー
pub mod tokenizer;

/// パターンマイニング学習器
pub mod trainer;

/// 配列ベースのトライ木
pub mod trie;

/// UTF-8スキャナー
pub mod utf8;

/// 内部ユーティリティ関数
pub mod utils;

/// 語彙テーブル
pub mod vocab;

// Re-exports
pub use errors::{LegatoError, Result};
pub use tokenizer::Tokenizer;
pub use trainer::{Trainer, TrainerConfig};
pub use vocab::Vocabulary;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
