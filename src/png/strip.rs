use super::*;

/// Projects a document down to its critical chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stripper {
  /// Re-check every kept chunk's length and CRC before writing anything.
  pub verify_checksums: bool,
}
impl Stripper {
  #[inline]
  #[must_use]
  pub const fn new(verify_checksums: bool) -> Self {
    Self { verify_checksums }
  }

  /// Picks out the chunks that will be written, in output order.
  ///
  /// That's the first `IHDR`, then every `PLTE` and `IDAT` in file order, then
  /// the first `IEND`. Walking the chunk list (rather than the type index)
  /// keeps a `PLTE` in front of the `IDAT` chunks it came before.
  pub fn retained<'d>(&self, document: &'d ImageDocument) -> PngResult<Vec<&'d Chunk>> {
    let ihdr = document.first(ChunkType::IHDR).ok_or(PngError::MalformedDocument(ChunkType::IHDR))?;
    let iend = document.first(ChunkType::IEND).ok_or(PngError::MalformedDocument(ChunkType::IEND))?;
    let mut out = Vec::with_capacity(document.chunks().len());
    out.push(ihdr);
    out.extend(
      document
        .chunks()
        .iter()
        .filter(|chunk| matches!(chunk.chunk_type(), ChunkType::PLTE | ChunkType::IDAT)),
    );
    out.push(iend);
    Ok(out)
  }

  /// Serializes the stripped document.
  ///
  /// `target` is only used to name the destination in a checksum error.
  ///
  /// ## Failure
  /// * [`PngError::MalformedDocument`] if there's no `IHDR` or no `IEND`.
  /// * [`PngError::ChecksumVerificationFailed`] if checking is on and any kept
  ///   chunk fails [`Chunk::verify`]. Nothing is serialized in this case.
  pub fn strip(&self, document: &ImageDocument, target: &Path) -> PngResult<Vec<u8>> {
    let retained = self.retained(document)?;
    if self.verify_checksums {
      for chunk in &retained {
        chunk.verify().map_err(|e| PngError::ChecksumVerificationFailed {
          target: target.to_path_buf(),
          source: Box::new(e),
        })?;
      }
    }
    let total = PNG_SIGNATURE.len() + retained.iter().map(|c| c.encoded_len()).sum::<usize>();
    let kept = retained.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&PNG_SIGNATURE);
    for chunk in retained {
      chunk.encode(&mut out)?;
    }
    trace!(path = %target.display(), kept, read = document.chunks().len(), bytes = out.len(), "stripped");
    Ok(out)
  }
}
