//! エラー型の定義
//!
//! このモジュールは、legatoライブラリで使用されるすべてのエラー型を定義します。
//! 入力に起因する異常はすべて値として報告され、パニックは発生しません。

/// legato専用のResult型
///
/// エラー型としてデフォルトで[`LegatoError`]を使用します。
pub type Result<T, E = LegatoError> = std::result::Result<T, E>;

/// legatoのエラー型
///
/// このライブラリで発生する可能性のあるすべてのエラーを表現します。
/// 各バリアントは特定のエラー条件に対応しています。
#[derive(Debug, thiserror::Error)]
pub enum LegatoError {
    /// 無効な引数エラー
    #[error("InvalidArgumentError: {arg}: {msg}")]
    InvalidArgument {
        /// 引数の名前
        arg: &'static str,
        /// エラーメッセージ
        msg: String,
    },

    /// 無効なUTF-8シーケンス
    ///
    /// 切り詰められた、または冗長表現のUTF-8バイト列を検出した場合に発生します。
    #[error("InvalidUtf8Error: invalid UTF-8 sequence at byte offset {offset}")]
    InvalidUtf8 {
        /// 不正なシーケンスの先頭バイト位置
        offset: usize,
    },

    /// 空のキー
    ///
    /// トライ構築に長さゼロのキーが渡された場合に発生します。
    #[error("EmptyKeyError: key at index {index} is empty")]
    EmptyKey {
        /// 問題のキーの入力インデックス
        index: usize,
    },

    /// ソート順または重複違反
    ///
    /// トライ構築のキーが辞書順でないか、重複している場合に発生します。
    #[error("UnsortedOrDuplicateError: keys must be sorted and unique (violated at index {index})")]
    UnsortedOrDuplicate {
        /// 違反を検出した入力インデックス
        index: usize,
    },

    /// エントリ数の上限超過
    ///
    /// IdMapまたはハッシュマップのエントリ数が2^31-1を超える場合に発生します。
    #[error("TooManyError: {what} would exceed {} entries", i32::MAX)]
    TooMany {
        /// 上限に達したテーブルの名前
        what: &'static str,
    },

    /// 語彙レコードの列数不足
    #[error("SchemaMismatchError: record {index} has {actual} fields, needs at least {expected}: {record:?}")]
    SchemaMismatch {
        /// レコードのインデックス
        index: usize,
        /// 必要な最小列数
        expected: usize,
        /// 実際の列数
        actual: usize,
        /// 問題のレコード内容
        record: String,
    },

    /// 不正なPOSタグ付き行
    ///
    /// タグ付きコーパスの行がちょうど1個のタブ区切りを持たない場合に発生します。
    #[error("InvalidPosLineError: line {index} must be `SURFACE\\tFEATURES` or `EOS`: {line:?}")]
    InvalidPosLine {
        /// 行番号（0始まり）
        index: usize,
        /// 問題の行内容
        line: String,
    },

    /// 未知のID
    ///
    /// デコードが既知の範囲外のIDを受け取った場合に発生します。
    #[error("UnknownIdError: id {id} is not in the vocabulary")]
    UnknownId {
        /// 問題のID
        id: u32,
    },

    /// 不正なバイトフォールバック列
    ///
    /// バイトフォールバックIDの並びが有効なUTF-8文字を再構成しない場合に発生します。
    #[error("InvalidFallbackSequenceError: fallback ids at position {position} do not form a UTF-8 character")]
    InvalidFallbackSequence {
        /// ID列内の位置
        position: usize,
    },

    /// 破損したバイナリデータ
    ///
    /// デシリアライズ時の不変条件違反で発生します。
    #[error("CorruptBlobError: {msg}")]
    CorruptBlob {
        /// 検出した違反の説明
        msg: String,
    },

    /// 標準I/Oエラー
    #[error(transparent)]
    StdIo(#[from] std::io::Error),
}

impl LegatoError {
    /// 無効な引数エラーを生成します
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument {
            arg,
            msg: msg.into(),
        }
    }

    /// 破損データエラーを生成します
    pub(crate) fn corrupt_blob<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::CorruptBlob { msg: msg.into() }
    }
}
