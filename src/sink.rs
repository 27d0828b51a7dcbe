//! Where stripped bytes end up.

use std::{
  ffi::OsString,
  fs,
  io::Write,
  path::{Path, PathBuf},
  process::Command,
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{PngError, PngResult};

/// An external lossless encoder, run once per file.
///
/// The program is called as `program -lossless <input> -o <output>`, which is
/// the `cwebp` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEncoder {
  /// Program name or path.
  pub program: String,
  /// Extension given to the encoder's output file, without the dot.
  pub extension: String,
  /// Where the intermediate PNG goes. `None` uses the system temp dir.
  pub temp_dir: Option<PathBuf>,
}
impl Default for ExternalEncoder {
  fn default() -> Self {
    Self::new("cwebp")
  }
}
impl ExternalEncoder {
  #[must_use]
  pub fn new(program: impl Into<String>) -> Self {
    Self { program: program.into(), extension: "webp".to_string(), temp_dir: None }
  }

  /// The argument list for one run.
  #[must_use]
  pub fn args(input: &Path, output: &Path) -> [OsString; 4] {
    ["-lossless".into(), input.into(), "-o".into(), output.into()]
  }

  /// The destination with its extension swapped for the encoder's.
  #[must_use]
  pub fn output_path(&self, destination: &Path) -> PathBuf {
    destination.with_extension(&self.extension)
  }

  /// Writes `bytes` to a temporary PNG, runs the encoder on it, and waits for
  /// the encoder to finish.
  ///
  /// The temporary file is removed before this returns, whatever happened.
  ///
  /// ## Failure
  /// * [`PngError::EncoderLaunchFailed`] if the program couldn't be started.
  /// * [`PngError::EncoderExecutionFailed`] if it exited unsuccessfully.
  pub fn encode(&self, bytes: &[u8], destination: &Path) -> PngResult<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("strip-").suffix(".png");
    let mut temp = match &self.temp_dir {
      Some(dir) => builder.tempfile_in(dir)?,
      None => builder.tempfile()?,
    };
    temp.write_all(bytes)?;
    temp.flush()?;
    // Close our handle so the encoder can open the file on any platform. The
    // path guard still deletes it on drop.
    let temp_path = temp.into_temp_path();

    let output = self.output_path(destination);
    debug!(program = %self.program, input = %temp_path.display(), output = %output.display(), "running encoder");
    let status = Command::new(&self.program)
      .args(Self::args(&temp_path, &output))
      .status()
      .map_err(|source| PngError::EncoderLaunchFailed { program: self.program.clone(), source })?;
    if !status.success() {
      return Err(PngError::EncoderExecutionFailed {
        program: self.program.clone(),
        exit_code: status.code(),
      });
    }
    temp_path.close()?;
    Ok(output)
  }
}

/// How a stripped file gets written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputSink {
  /// Write the PNG bytes to the destination.
  #[default]
  Direct,
  /// Hand the PNG bytes to an external encoder.
  Encoder(ExternalEncoder),
}
impl OutputSink {
  /// Writes the bytes out and returns the path of the file that was made.
  ///
  /// Missing parent directories are created.
  pub fn write(&self, bytes: &[u8], destination: &Path) -> PngResult<PathBuf> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)?;
    }
    match self {
      Self::Direct => write_atomic(bytes, destination).map(|()| destination.to_path_buf()),
      Self::Encoder(encoder) => encoder.encode(bytes, destination),
    }
  }
}

/// Writes to a temp file next to `destination` then renames it into place, so
/// a failed write never leaves a partial file behind.
fn write_atomic(bytes: &[u8], destination: &Path) -> PngResult<()> {
  let parent = match destination.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  let mut temp = NamedTempFile::new_in(parent)?;
  temp.write_all(bytes)?;
  temp.as_file().sync_all()?;
  temp.persist(destination).map_err(|e| PngError::Io(e.error))?;
  Ok(())
}
