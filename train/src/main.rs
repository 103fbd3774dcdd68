//! パターン辞書の学習ユーティリティ
//!
//! このバイナリは、シード語彙CSVとPOSタグ付きコーパスから
//! パターン辞書を学習し、モデルブロブとパターンのテキスト
//! サイドカーを出力します。

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use legato::errors::LegatoError;
use legato::trainer::{Corpus, Trainer, TrainerConfig};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "train", about = "Trains a pattern dictionary", version)]
struct Args {
    /// Seed lexicon file (CSV: surface,pos fields,extra features).
    #[clap(short = 'l', long)]
    seed_lexicon: PathBuf,

    /// POS-tagged corpus file (lines of `SURFACE\tFEATURES` with `EOS`).
    #[clap(short = 't', long)]
    corpus: PathBuf,

    /// A file to which the model blob is output.
    #[clap(short = 'o', long)]
    model_out: PathBuf,

    /// A file to which the mined patterns are output as text.
    #[clap(short = 'p', long)]
    patterns_out: PathBuf,

    /// Number of leading feature fields forming the POS tuple.
    #[clap(long, default_value = "4")]
    num_pos_fields: usize,

    /// Reject a trailing `EOS` that is not terminated by a newline.
    #[clap(long)]
    strict_eos: bool,
}

/// 訓練処理中に発生する可能性のあるエラー
#[derive(Debug, Error)]
enum TrainError {
    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 訓練処理エラー
    #[error("Training process failed: {0}")]
    Legato(#[from] LegatoError),
}

/// メイン関数
///
/// シード語彙とコーパスを読み込み、学習済みモデルとパターンを
/// ファイルへ書き出します。
fn main() -> Result<(), TrainError> {
    let args = Args::parse();

    let config = TrainerConfig::new()
        .num_pos_fields(args.num_pos_fields)
        .eos_requires_newline(args.strict_eos);

    eprintln!("Reading the corpus...");
    let corpus = Corpus::from_reader_with(File::open(&args.corpus)?, config.strict_eos())?;

    eprintln!("Reading the seed lexicon...");
    let mut trainer = Trainer::new(config)?;
    trainer.read_seed_lexicon(File::open(&args.seed_lexicon)?)?;

    eprintln!("Training...");
    let model = trainer.train(&corpus)?;
    eprintln!("Trained {} patterns", model.patterns().len());

    eprintln!("Writing the model to {}...", args.model_out.display());
    let mut wtr = BufWriter::new(File::create(&args.model_out)?);
    model.write_model(&mut wtr)?;

    eprintln!("Writing patterns to {}...", args.patterns_out.display());
    let mut wtr = BufWriter::new(File::create(&args.patterns_out)?);
    model.write_patterns(&mut wtr)?;

    Ok(())
}
