use super::*;

/// A decoded PNG: the signature and every chunk, in file order.
///
/// The type index is only a lookup aid. Anything that cares about the order of
/// chunks of *different* types (like `PLTE` coming before `IDAT`) must walk
/// [`chunks`](ImageDocument::chunks) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDocument {
  signature: Signature,
  chunks: Vec<Chunk>,
  index: HashMap<ChunkType, Vec<usize>>,
}
impl ImageDocument {
  #[inline]
  #[must_use]
  pub fn new(signature: Signature) -> Self {
    Self { signature, chunks: Vec::new(), index: HashMap::new() }
  }

  /// Appends a chunk after all current chunks.
  pub fn push(&mut self, chunk: Chunk) {
    self.index.entry(chunk.chunk_type()).or_default().push(self.chunks.len());
    self.chunks.push(chunk);
  }

  #[inline]
  #[must_use]
  pub const fn signature(&self) -> Signature {
    self.signature
  }

  #[inline]
  #[must_use]
  pub fn chunks(&self) -> &[Chunk] {
    &self.chunks
  }

  /// Positions (into [`chunks`](ImageDocument::chunks)) of every chunk of the
  /// given type, ascending.
  #[must_use]
  pub fn positions(&self, chunk_type: ChunkType) -> &[usize] {
    self.index.get(&chunk_type).map(Vec::as_slice).unwrap_or(&[])
  }

  /// The first chunk of the given type, if any.
  #[must_use]
  pub fn first(&self, chunk_type: ChunkType) -> Option<&Chunk> {
    self.positions(chunk_type).first().map(|&i| &self.chunks[i])
  }

  #[must_use]
  pub fn contains(&self, chunk_type: ChunkType) -> bool {
    !self.positions(chunk_type).is_empty()
  }

  /// Rebuilds the type index from the chunk list.
  pub fn reindex(&mut self) {
    self.index.clear();
    for (i, chunk) in self.chunks.iter().enumerate() {
      self.index.entry(chunk.chunk_type()).or_default().push(i);
    }
  }
}
