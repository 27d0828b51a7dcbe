use std::path::{Path, PathBuf};

use crate::{png::Stripper, sink::OutputSink, ExternalEncoder};

/// Everything a batch run needs to know, fixed before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub input_dir: PathBuf,
  pub output_dir: PathBuf,
  /// File extension (without the dot) that marks a file for processing.
  /// Matched case-insensitively.
  pub extension: String,
  /// Re-verify kept chunks while stripping.
  pub verify_checksums: bool,
  /// Reject files whose signature isn't a clean PNG signature.
  pub verify_signature: bool,
  /// Re-encode the stripped PNG with this program instead of writing it.
  pub encoder: Option<ExternalEncoder>,
  /// Number of worker threads.
  pub workers: usize,
  /// How many tasks may wait in the queue before enumeration blocks.
  pub queue_capacity: usize,
}
impl Config {
  pub const DEFAULT_WORKERS: usize = 16;
  pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

  #[must_use]
  pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      input_dir: input_dir.into(),
      output_dir: output_dir.into(),
      extension: "png".to_string(),
      verify_checksums: false,
      verify_signature: false,
      encoder: None,
      workers: Self::DEFAULT_WORKERS,
      queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
    }
  }

  #[must_use]
  pub fn with_verify_checksums(mut self, verify: bool) -> Self {
    self.verify_checksums = verify;
    self
  }
  #[must_use]
  pub fn with_verify_signature(mut self, verify: bool) -> Self {
    self.verify_signature = verify;
    self
  }
  #[must_use]
  pub fn with_encoder(mut self, encoder: Option<ExternalEncoder>) -> Self {
    self.encoder = encoder;
    self
  }
  /// Zero is bumped up to one.
  #[must_use]
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers.max(1);
    self
  }
  /// Zero is bumped up to one.
  #[must_use]
  pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
    self.queue_capacity = capacity.max(1);
    self
  }
  #[must_use]
  pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
    self.extension = extension.into();
    self
  }

  #[inline]
  #[must_use]
  pub fn stripper(&self) -> Stripper {
    Stripper::new(self.verify_checksums)
  }

  #[must_use]
  pub fn sink(&self) -> OutputSink {
    match &self.encoder {
      Some(encoder) => OutputSink::Encoder(encoder.clone()),
      None => OutputSink::Direct,
    }
  }

  /// If the path has the configured extension.
  #[must_use]
  pub fn matches_extension(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .map_or(false, |ext| ext.eq_ignore_ascii_case(&self.extension))
  }

  /// Where the output for `input` goes: the same path relative to the input
  /// dir, placed under the output dir.
  #[must_use]
  pub fn output_path_for(&self, input: &Path) -> PathBuf {
    match input.strip_prefix(&self.input_dir) {
      Ok(relative) => self.output_dir.join(relative),
      Err(_) => self.output_dir.join(input.file_name().unwrap_or(input.as_os_str())),
    }
  }
}
