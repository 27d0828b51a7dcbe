use super::*;

/// Decodes a full PNG stream into an [`ImageDocument`].
///
/// The signature is read but *not* checked, use [`check_signature`] for that.
/// Decoding stops right after the first `IEND` chunk, so any bytes after it are
/// left in the reader.
///
/// ## Failure
/// Any problem at all fails the whole read, no partial document is returned.
/// * [`PngError::Truncated`] if the stream ends before `IEND`.
/// * Any error from [`Chunk::decode`].
pub fn read_document<R: Read>(mut reader: R) -> PngResult<ImageDocument> {
  let signature = Signature(read_array(&mut reader)?);
  read_chunks(reader, signature)
}

/// Like [`read_document`], but the signature is run through
/// [`check_signature`] before any chunk is decoded.
///
/// A damaged or foreign signature is reported as such
/// ([`PngError::NotAPng`], [`PngError::LineEndingCorrupted`]) instead of as
/// whatever chunk error the shifted bytes would cause.
pub fn read_verified_document<R: Read>(mut reader: R) -> PngResult<ImageDocument> {
  let mut head = Vec::with_capacity(8);
  reader.by_ref().take(8).read_to_end(&mut head)?;
  check_signature(&head).into_result()?;
  let signature = <[u8; 8]>::try_from(head.as_slice()).map_err(|_| PngError::Truncated)?;
  read_chunks(reader, Signature(signature))
}

fn read_chunks<R: Read>(mut reader: R, signature: Signature) -> PngResult<ImageDocument> {
  let mut document = ImageDocument::new(signature);
  loop {
    let chunk = match Chunk::decode(&mut reader) {
      Ok(chunk) => chunk,
      Err(e) => {
        trace!(error = %e, chunks_read = document.chunks().len(), "chunk decode failed");
        return Err(e);
      }
    };
    let is_end = chunk.chunk_type() == ChunkType::IEND;
    document.push(chunk);
    if is_end {
      return Ok(document);
    }
  }
}

/// Opens a file and decodes it with [`read_document`].
///
/// The file handle is closed before this returns, on success or failure.
pub fn read_document_from_path(path: impl AsRef<Path>) -> PngResult<ImageDocument> {
  let file = File::open(path.as_ref())?;
  read_document(BufReader::new(file))
}

/// Opens a file and decodes it with [`read_verified_document`].
pub fn read_verified_document_from_path(path: impl AsRef<Path>) -> PngResult<ImageDocument> {
  let file = File::open(path.as_ref())?;
  read_verified_document(BufReader::new(file))
}
