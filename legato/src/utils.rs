//! CSV処理と型変換の補助モジュール
//!
//! シード語彙の行とパターンの素性文字列はどちらもCSVなので、
//! 解析・引用符処理・連結をここに集約します。区切りのカンマを含む
//! フィールドはダブルクォートで囲まれている前提です（引用符の中の
//! カンマはフィールドの一部）。

use std::io::Write;

use csv_core::{ReadFieldResult, WriteResult};

/// u32から他の型への変換を提供するトレイト
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // ポインタ幅は32または64に限定してあり、u32は常にusizeに収まる。
        src as usize
    }
}

/// CSV形式の1行をフィールド列に分割する
///
/// 引用符で囲まれたフィールド内のカンマは区切りとして扱いません。
/// フィールド長に上限はありません。
///
/// # 例
///
/// ```
/// # use legato::utils::parse_csv_row;
/// let fields = parse_csv_row("吾輩,代名詞,*,*,*,ワガハイ");
/// assert_eq!(fields[0], "吾輩");
/// assert_eq!(fields.len(), 6);
///
/// let quoted = parse_csv_row("数詞,\"1,000\"");
/// assert_eq!(quoted, vec!["数詞", "1,000"]);
/// ```
pub fn parse_csv_row(row: &str) -> Vec<String> {
    let mut rdr = csv_core::Reader::new();
    let mut input = row.as_bytes();
    let mut output = [0; 1024];
    let mut fields = vec![];
    let mut field: Vec<u8> = Vec::new();

    loop {
        let (result, nin, nout) = rdr.read_field(input, &mut output);
        field.extend_from_slice(&output[..nout]);
        input = &input[nin..];
        match result {
            // フィールドが出力バッファより長い。続きを読む。
            ReadFieldResult::OutputFull => {}
            ReadFieldResult::Field { .. } => {
                fields.push(String::from_utf8(std::mem::take(&mut field)).unwrap());
            }
            ReadFieldResult::InputEmpty | ReadFieldResult::End => {
                fields.push(String::from_utf8(field).unwrap());
                return fields;
            }
        }
    }
}

/// バイト列をCSVの1フィールドとして書き出す
///
/// カンマや引用符を含む場合はダブルクォートで囲み、引用符を
/// エスケープします。それ以外はそのまま書き出します。
pub fn quote_csv_cell<W>(mut wtr: W, data: &[u8]) -> std::io::Result<()>
where
    W: Write,
{
    let mut writer = csv_core::Writer::new();
    let mut output = [0; 1024];

    let mut rest = data;
    loop {
        let (result, nin, nout) = writer.field(rest, &mut output);
        wtr.write_all(&output[..nout])?;
        rest = &rest[nin..];
        if result == WriteResult::InputEmpty {
            break;
        }
    }
    loop {
        let (result, nout) = writer.finish(&mut output);
        wtr.write_all(&output[..nout])?;
        if result == WriteResult::InputEmpty {
            return Ok(());
        }
    }
}

/// フィールド列をCSV形式の1行に連結する
///
/// カンマや引用符を含むフィールドは[`quote_csv_cell`]で引用符処理されます。
pub fn join_csv<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = vec![];
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        // Vecへの書き込みは失敗しない。
        quote_csv_cell(&mut out, field.as_ref().as_bytes()).unwrap();
    }
    String::from_utf8(out).unwrap()
}

/// 入力行の改行を正規化する
///
/// `\r\n`および単独の`\r`を取り除きます。レコード読み込み側は
/// この関数を通した行だけを扱います。
#[inline]
pub(crate) fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_row_seed_record() {
        assert_eq!(
            &["猫", "名詞", "普通名詞", "*", "*", "ネコ"],
            parse_csv_row("猫,名詞,普通名詞,*,*,ネコ").as_slice()
        );
    }

    #[test]
    fn test_parse_csv_row_quoted_comma() {
        assert_eq!(
            &["1,000", "名詞", "数"],
            parse_csv_row("\"1,000\",名詞,数").as_slice()
        );
    }

    #[test]
    fn test_parse_csv_row_empty() {
        // 空行は空フィールド1個として読まれる。
        assert_eq!(&[""], parse_csv_row("").as_slice());
    }

    #[test]
    fn test_parse_csv_row_long_field() {
        let long = "ア".repeat(2000);
        let fields = parse_csv_row(&format!("{long},名詞"));
        assert_eq!(fields[0], long);
        assert_eq!(fields[1], "名詞");
    }

    #[test]
    fn test_quote_csv_cell() {
        let mut out = vec![];
        quote_csv_cell(&mut out, "名詞,数".as_bytes()).unwrap();
        assert_eq!(out, "\"名詞,数\"".as_bytes());

        let mut out = vec![];
        quote_csv_cell(&mut out, "カタカナ".as_bytes()).unwrap();
        assert_eq!(out, "カタカナ".as_bytes());
    }

    #[test]
    fn test_join_csv() {
        assert_eq!(join_csv(["記号", "一般", "*", "*"]), "記号,一般,*,*");
        assert_eq!(join_csv(["1,000", "名詞"]), "\"1,000\",名詞");
        // 引用符処理した行は解析で元に戻る。
        assert_eq!(parse_csv_row(&join_csv(["1,000", "名詞"])), vec!["1,000", "名詞"]);
    }

    #[test]
    fn test_from_u32() {
        assert_eq!(usize::from_u32(257), 257usize);
    }

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending("EOS\r\n"), "EOS");
        assert_eq!(trim_line_ending("EOS\r"), "EOS");
        assert_eq!(trim_line_ending("EOS"), "EOS");
    }
}
