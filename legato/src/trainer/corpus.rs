//! コーパスデータ構造のモジュール。
//!
//! このモジュールは、POSタグ付きコーパスの読み込みと管理に必要な
//! データ構造を提供します。

use std::io::{BufWriter, Read, Write};
use std::ops::{Deref, DerefMut};

use crate::errors::{LegatoError, Result};
use crate::utils::trim_line_ending;

/// 表層形と素性のペアの表現。
///
/// 学習データの単語を表します。
pub struct Word {
    surface: String,

    // 素性は列に分割せず、1本の文字列のまま保持する。
    feature: String,
}

impl Word {
    /// 新しい単語を作成します。
    pub(crate) fn new(surface: &str, feature: &str) -> Self {
        Self {
            surface: surface.to_string(),
            feature: feature.to_string(),
        }
    }

    /// 表層形の文字列を返します。
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// 連結された素性文字列を返します。
    pub fn feature(&self) -> &str {
        &self.feature
    }
}

/// 文の表現。
///
/// 学習データの1つの例文を表します。
pub struct Example {
    /// トークンの連結。
    pub(crate) sentence: String,

    /// トークンのリスト。
    pub(crate) tokens: Vec<Word>,
}

impl Example {
    /// 例文を指定されたシンクに書き込みます。
    ///
    /// # エラー
    ///
    /// 書き込みに失敗した場合、I/Oエラーが返されます。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let mut wtr = BufWriter::new(wtr);
        for word in &self.tokens {
            writeln!(&mut wtr, "{}\t{}", word.surface, word.feature)?;
        }
        writeln!(&mut wtr, "EOS")?;
        Ok(())
    }

    /// 文全体の文字列を返します。
    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    /// トークンのスライスを返します。
    pub fn tokens(&self) -> &[Word] {
        &self.tokens
    }
}

/// コーパスの表現。
///
/// 学習データの例文集合を表します。
pub struct Corpus {
    /// 例文のリスト。
    pub(crate) examples: Vec<Example>,
}

impl Corpus {
    /// 指定されたシンクからコーパスを読み込みます。
    ///
    /// コーパスファイルは、各行が「表層形\t素性」の形式で、
    /// 文の終わりに「EOS」が含まれる形式を想定しています。
    /// `\r\n`および単独の`\r`の行末はLFに正規化されます。
    /// 末尾に改行を持たない`EOS`も文の終端として扱います。
    ///
    /// # エラー
    ///
    /// 行がちょうど1個のタブ区切りを持たず`EOS`でもない場合、
    /// [`LegatoError::InvalidPosLine`] が返されます。
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        Self::from_reader_with(rdr, false)
    }

    /// 終端規則を指定してコーパスを読み込みます。
    ///
    /// `eos_requires_newline`が`true`の場合、改行で終わらない末尾の
    /// `EOS`は文の終端として認められず、エラーになります。
    pub fn from_reader_with<R>(mut rdr: R, eos_requires_newline: bool) -> Result<Self>
    where
        R: Read,
    {
        let mut buf = String::new();
        rdr.read_to_string(&mut buf)?;
        // 行末をLFへ正規化する。
        let buf = buf.replace("\r\n", "\n").replace('\r', "\n");

        let mut examples = vec![];
        let mut tokens: Vec<Word> = vec![];
        for (index, raw) in buf.split_inclusive('\n').enumerate() {
            let has_newline = raw.ends_with('\n');
            let line = trim_line_ending(raw);
            if line.is_empty() {
                continue;
            }
            let mut spl = line.split('\t');
            let surface = spl.next();
            let feature = spl.next();
            let rest = spl.next();
            match (surface, feature, rest) {
                (Some("EOS"), None, None) => {
                    if eos_requires_newline && !has_newline {
                        return Err(LegatoError::InvalidPosLine {
                            index,
                            line: line.to_string(),
                        });
                    }
                    let mut sentence = String::new();
                    for token in &tokens {
                        sentence.push_str(token.surface());
                    }
                    if !sentence.is_empty() {
                        examples.push(Example { sentence, tokens });
                    }
                    tokens = vec![];
                }
                (Some(surface), Some(feature), None) if !surface.is_empty() => {
                    tokens.push(Word::new(surface, feature));
                }
                _ => {
                    return Err(LegatoError::InvalidPosLine {
                        index,
                        line: line.to_string(),
                    });
                }
            }
        }

        Ok(Self { examples })
    }
}

impl Deref for Corpus {
    type Target = [Example];

    fn deref(&self) -> &Self::Target {
        &self.examples
    }
}

impl DerefMut for Corpus {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_corpus() {
        let corpus_data = "\
吾輩\t名詞,普通名詞,*,*
は\t助詞,係助詞,*,*
猫\t名詞,普通名詞,*,*
である\t助動詞,*,*,*
EOS
名前\t名詞,普通名詞,*,*
は\t助詞,係助詞,*,*
まだ\t副詞,*,*,*
ない\t形容詞,*,*,*
EOS
";

        let corpus = Corpus::from_reader(corpus_data.as_bytes()).unwrap();

        assert_eq!(2, corpus.examples.len());

        let sentence1 = &corpus.examples[0];

        assert_eq!("吾輩は猫である", sentence1.sentence());

        assert_eq!(4, sentence1.tokens.len());
        assert_eq!("吾輩", sentence1.tokens[0].surface());
        assert_eq!("名詞,普通名詞,*,*", sentence1.tokens[0].feature());
        assert_eq!("である", sentence1.tokens[3].surface());

        let sentence2 = &corpus.examples[1];

        assert_eq!("名前はまだない", sentence2.sentence());
        assert_eq!(4, sentence2.tokens.len());
        assert_eq!("まだ", sentence2.tokens[2].surface());
        assert_eq!("副詞,*,*,*", sentence2.tokens[2].feature());
    }

    #[test]
    fn test_bare_eos_at_eof() {
        let corpus_data = "猫\t名詞,普通名詞,*,*\nEOS";
        let corpus = Corpus::from_reader(corpus_data.as_bytes()).unwrap();
        assert_eq!(1, corpus.examples.len());

        // 厳密モードでは改行なしのEOSを拒否する。
        let result = Corpus::from_reader_with(corpus_data.as_bytes(), true);
        assert!(result.is_err());
    }

    #[test]
    fn test_crlf_normalized() {
        let corpus_data = "猫\t名詞,普通名詞,*,*\r\nEOS\r\n";
        let corpus = Corpus::from_reader(corpus_data.as_bytes()).unwrap();
        assert_eq!(1, corpus.examples.len());
        assert_eq!("名詞,普通名詞,*,*", corpus.examples[0].tokens[0].feature());
    }

    #[test]
    fn test_invalid_line() {
        let corpus_data = "猫 名詞\nEOS\n";
        let result = Corpus::from_reader(corpus_data.as_bytes());
        assert!(matches!(
            result,
            Err(LegatoError::InvalidPosLine { index: 0, .. })
        ));
    }

    #[test]
    fn test_two_tabs_rejected() {
        let corpus_data = "猫\t名詞\t余分\nEOS\n";
        assert!(Corpus::from_reader(corpus_data.as_bytes()).is_err());
    }

    #[test]
    fn test_roundtrip_write() {
        let corpus_data = "猫\t名詞,普通名詞,*,*\nEOS\n";
        let corpus = Corpus::from_reader(corpus_data.as_bytes()).unwrap();
        let mut out = vec![];
        corpus.examples[0].write(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), corpus_data);
    }
}
