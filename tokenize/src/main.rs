//! 符号化・復号を実行するユーティリティ
//!
//! このバイナリは、語彙を読み込んで標準入力の各行を最長一致で
//! ID列へ符号化します（`decode`モードではID列をテキストへ復号します）。
//! 語彙はCSV（`表層形,ID`）またはシリアライズ済みのブロブから
//! 読み込めます。

use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufWriter, Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use legato::utils::parse_csv_row;
use legato::{Tokenizer, Vocabulary};

/// 動作モード
#[derive(Clone, Debug)]
enum Mode {
    Encode,
    Decode,
}

impl FromStr for Mode {
    type Err = &'static str;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "encode" => Ok(Self::Encode),
            "decode" => Ok(Self::Decode),
            _ => Err("Could not parse a mode"),
        }
    }
}

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "tokenize", about = "Encodes and decodes text", version)]
struct Args {
    /// Vocabulary CSV (surface,id). Mutually exclusive with --blob-in.
    #[clap(short = 'v', long)]
    vocab_csv: Option<PathBuf>,

    /// Serialized tokenizer blob.
    #[clap(short = 'i', long)]
    blob_in: Option<PathBuf>,

    /// Writes the loaded vocabulary as a serialized tokenizer blob and exits.
    #[clap(short = 'o', long)]
    blob_out: Option<PathBuf>,

    /// Mode. Choices are encode and decode.
    #[clap(short = 'm', long, default_value = "encode")]
    mode: Mode,
}

/// 語彙CSVを読み込みます
///
/// 各行は `表層形,ID` です。空行は無視します。
fn read_vocab_csv<R>(mut rdr: R) -> Result<Vocabulary, Box<dyn Error>>
where
    R: Read,
{
    let mut buf = String::new();
    rdr.read_to_string(&mut buf)?;
    let mut entries = vec![];
    for line in buf.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let fields = parse_csv_row(line);
        if fields.len() != 2 {
            return Err(format!("a vocabulary row must have two fields: {line:?}").into());
        }
        let id: u32 = fields[1].parse()?;
        entries.push((fields[0].clone(), id));
    }
    Ok(Vocabulary::from_entries(entries)?)
}

/// メイン関数
///
/// 語彙をロードし、標準入力から読み込んだ各行を処理して
/// 結果を標準出力に出力します。
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    eprintln!("Loading the vocabulary...");
    let tokenizer = match (&args.vocab_csv, &args.blob_in) {
        (Some(path), None) => Tokenizer::from_vocab(read_vocab_csv(File::open(path)?)?)?,
        (None, Some(path)) => Tokenizer::read(File::open(path)?)?,
        _ => return Err("specify exactly one of --vocab-csv and --blob-in".into()),
    };

    if let Some(path) = &args.blob_out {
        eprintln!("Writing the tokenizer to {}...", path.display());
        let mut wtr = BufWriter::new(File::create(path)?);
        tokenizer.write(&mut wtr)?;
        return Ok(());
    }

    eprintln!("Ready to {:?}", args.mode);

    let out = std::io::stdout();
    let mut out = BufWriter::new(out.lock());
    let lines = std::io::stdin().lock().lines();
    for line in lines {
        let line = line?;
        match args.mode {
            Mode::Encode => {
                let ids = tokenizer.encode(&line)?;
                for (i, id) in ids.iter().enumerate() {
                    if i != 0 {
                        out.write_all(b" ")?;
                    }
                    write!(&mut out, "{id}")?;
                }
                out.write_all(b"\n")?;
            }
            Mode::Decode => {
                let ids = line
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<Result<Vec<u32>, _>>()?;
                let text = tokenizer.decode(&ids)?;
                out.write_all(text.as_bytes())?;
                out.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}
