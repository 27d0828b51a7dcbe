use std::{io, path::PathBuf};

use thiserror::Error;

use crate::png::{ChunkType, LineEndingConversion};

/// Shorthand for results that can fail with a [`PngError`].
pub type PngResult<T> = Result<T, PngError>;

/// An error from reading, stripping, or writing a single PNG file.
///
/// Every one of these is scoped to one file. The batch pipeline logs them and
/// moves on to the next file.
#[derive(Debug, Error)]
pub enum PngError {
  /// The first bytes of the stream aren't the PNG signature.
  #[error("not a png file")]
  NotAPng,

  /// The stream ended before a complete signature, chunk, or `IEND` was read.
  #[error("unexpected end of input")]
  Truncated,

  /// The signature shows the marks of a text-mode line ending conversion.
  #[error("signature damaged by {0} line ending conversion")]
  LineEndingCorrupted(LineEndingConversion),

  /// A chunk's declared length doesn't match the data it holds.
  #[error("chunk declares {declared} data bytes but holds {actual}")]
  MissingBytes { declared: u32, actual: usize },

  /// The declared CRC doesn't match the CRC of the chunk's type and data.
  #[error("crc mismatch in {chunk_type} chunk: declared {declared:#010x}, computed {computed:#010x}")]
  CrcMismatch { chunk_type: ChunkType, declared: u32, computed: u32 },

  /// Chunk lengths are limited to `2^31 - 1` bytes.
  #[error("chunk length {0} is over the 2^31-1 limit")]
  ChunkTooLong(u32),

  /// The document is missing a chunk that every PNG must have.
  #[error("document has no {0} chunk")]
  MalformedDocument(ChunkType),

  /// A retained chunk failed re-verification while stripping.
  #[error("{} failed checksum", .target.display())]
  ChecksumVerificationFailed {
    target: PathBuf,
    #[source]
    source: Box<PngError>,
  },

  /// The external encoder could not be started at all.
  #[error("could not launch encoder `{program}`")]
  EncoderLaunchFailed {
    program: String,
    #[source]
    source: io::Error,
  },

  /// The external encoder ran but didn't exit successfully.
  #[error("encoder `{program}` failed with exit code {}", exit_code_display(.exit_code))]
  EncoderExecutionFailed { program: String, exit_code: Option<i32> },

  #[error(transparent)]
  Io(#[from] io::Error),
}

fn exit_code_display(code: &Option<i32>) -> String {
  match code {
    Some(code) => code.to_string(),
    None => "<terminated by signal>".to_string(),
  }
}

/// An error that stops the whole batch run.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("input path {} is not a directory", .0.display())]
  InputNotADirectory(PathBuf),

  #[error("could not create output directory {}", .0.display())]
  OutputDir(PathBuf, #[source] io::Error),

  #[error("failed to spawn worker thread")]
  WorkerSpawn(#[source] io::Error),

  /// A worker thread died outside of the per-task isolation boundary.
  #[error("worker {0} panicked")]
  WorkerPanicked(usize),
}
