use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use pngstrip::{logging, BatchPipeline, Config, ExternalEncoder};
use tracing::error;

/// Verify PNG files and strip them down to their critical chunks.
#[derive(Debug, Parser)]
#[command(name = "pngstrip", version)]
struct Args {
  /// The path to the PNGs that need to be fixed
  #[arg(long, default_value = "images")]
  input: PathBuf,

  /// The path to the output directory
  #[arg(long, default_value = "processed")]
  output: PathBuf,

  /// Re-verify chunk checksums while stripping
  #[arg(long)]
  check: bool,

  /// Reject files whose signature was damaged or isn't PNG
  #[arg(long)]
  signature: bool,

  /// Compress the stripped image with an external lossless encoder
  #[arg(long)]
  compress: bool,

  /// The encoder program used with --compress
  #[arg(long, default_value = "cwebp")]
  encoder: String,

  /// The number of worker threads to spawn
  #[arg(long, default_value_t = Config::DEFAULT_WORKERS)]
  routines: usize,

  /// How many files may wait in the work queue
  #[arg(long, default_value_t = Config::DEFAULT_QUEUE_CAPACITY)]
  queue_capacity: usize,

  /// Log filter used when RUST_LOG isn't set
  #[arg(long, default_value = "info")]
  log_level: String,
}
impl Args {
  fn into_config(self) -> Config {
    let encoder = self.compress.then(|| ExternalEncoder::new(self.encoder));
    Config::new(self.input, self.output)
      .with_verify_checksums(self.check)
      .with_verify_signature(self.signature)
      .with_encoder(encoder)
      .with_workers(self.routines)
      .with_queue_capacity(self.queue_capacity)
  }
}

fn run(args: Args) -> anyhow::Result<()> {
  let config = args.into_config();
  BatchPipeline::new(config).run().context("batch run failed")?;
  Ok(())
}

fn main() -> ExitCode {
  let args = Args::parse();
  logging::init_tracing(&args.log_level);
  match run(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!("{e:#}");
      ExitCode::FAILURE
    }
  }
}
