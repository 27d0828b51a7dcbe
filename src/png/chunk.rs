use super::*;

/// The four byte tag naming a chunk's type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkType {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tEXt: Self = Self(*b"tEXt");
  pub const gAMA: Self = Self(*b"gAMA");

  /// If the "ancillary" bit (bit 5 of the first byte) is clear.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 32) == 0
  }

  /// If this is one of the chunk types needed to rebuild the pixels.
  ///
  /// This is a closed list rather than [`is_critical`](Self::is_critical):
  /// a private critical chunk wouldn't mean anything to other decoders either.
  #[inline]
  #[must_use]
  pub fn is_retained(self) -> bool {
    matches!(self, Self::IHDR | Self::PLTE | Self::IDAT | Self::IEND)
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char('"')?;
    Display::fmt(self, f)?;
    f.write_char('"')
  }
}
impl Display for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for ch in self.0.iter().copied().map(|u| u as char) {
      f.write_char(ch)?;
    }
    Ok(())
  }
}
impl From<[u8; 4]> for ChunkType {
  #[inline]
  fn from(array: [u8; 4]) -> Self {
    Self(array)
  }
}

/// Computes the PNG CRC (CRC-32/IEEE) of a chunk's type and data.
#[inline]
#[must_use]
pub fn chunk_crc(chunk_type: ChunkType, data: &[u8]) -> u32 {
  let mut hasher = crc32fast::Hasher::new();
  hasher.update(&chunk_type.0);
  hasher.update(data);
  hasher.finalize()
}

/// One chunk record: `length`, `type`, `data`, `crc`.
///
/// The fields are private so that a chunk can't change after it's built. The
/// stored `length` and `crc` are whatever the chunk was built with, which
/// isn't necessarily consistent with the data. Use [`verify`](Chunk::verify)
/// to check that.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Chunk {
  length: u32,
  chunk_type: ChunkType,
  data: Vec<u8>,
  crc: u32,
}
impl Debug for Chunk {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Chunk")
      .field("length", &self.length)
      .field("chunk_type", &self.chunk_type)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("crc", &self.crc)
      .finish()
  }
}
impl Chunk {
  /// Chunks longer than this are invalid PNG.
  pub const MAX_LENGTH: u32 = (1 << 31) - 1;

  /// Builds a consistent chunk, computing the length and CRC from the data.
  ///
  /// ## Panics
  /// * If `data` is longer than [`Chunk::MAX_LENGTH`].
  #[must_use]
  pub fn new(chunk_type: ChunkType, data: Vec<u8>) -> Self {
    let length = u32::try_from(data.len())
      .ok()
      .filter(|len| *len <= Self::MAX_LENGTH)
      .expect("chunk data exceeds the PNG length limit");
    let crc = chunk_crc(chunk_type, &data);
    Self { length, chunk_type, data, crc }
  }

  /// Builds a chunk from raw field values, without any checking.
  #[inline]
  #[must_use]
  pub const fn from_parts(length: u32, chunk_type: ChunkType, data: Vec<u8>, crc: u32) -> Self {
    Self { length, chunk_type, data, crc }
  }

  #[inline]
  #[must_use]
  pub const fn length(&self) -> u32 {
    self.length
  }
  #[inline]
  #[must_use]
  pub const fn chunk_type(&self) -> ChunkType {
    self.chunk_type
  }
  #[inline]
  #[must_use]
  pub fn data(&self) -> &[u8] {
    &self.data
  }
  #[inline]
  #[must_use]
  pub const fn declared_crc(&self) -> u32 {
    self.crc
  }

  /// The CRC of the type and data as they are right now.
  #[inline]
  #[must_use]
  pub fn compute_actual_crc(&self) -> u32 {
    chunk_crc(self.chunk_type, &self.data)
  }

  /// Number of bytes [`encode`](Chunk::encode) writes.
  #[inline]
  #[must_use]
  pub fn encoded_len(&self) -> usize {
    12 + self.data.len()
  }

  /// Checks the length and CRC against the chunk's data.
  ///
  /// ## Failure
  /// * [`PngError::MissingBytes`] if the declared length isn't the data length.
  /// * [`PngError::CrcMismatch`] if the declared CRC isn't the computed CRC.
  pub fn verify(&self) -> PngResult<()> {
    if self.length as usize != self.data.len() {
      return Err(PngError::MissingBytes { declared: self.length, actual: self.data.len() });
    }
    let computed = self.compute_actual_crc();
    if computed != self.crc {
      return Err(PngError::CrcMismatch {
        chunk_type: self.chunk_type,
        declared: self.crc,
        computed,
      });
    }
    Ok(())
  }

  /// Reads one chunk from the reader and checks its CRC.
  ///
  /// Every field must be fully present: running out of input anywhere in the
  /// chunk is [`PngError::Truncated`].
  pub fn decode<R: Read>(reader: &mut R) -> PngResult<Self> {
    let length = u32::from_be_bytes(read_array(reader)?);
    if length > Self::MAX_LENGTH {
      return Err(PngError::ChunkTooLong(length));
    }
    let chunk_type = ChunkType(read_array(reader)?);
    // Note: reading through `take` means we only ever allocate for bytes that
    // are actually there, no matter what length the chunk claims.
    let mut data = Vec::new();
    reader.by_ref().take(u64::from(length)).read_to_end(&mut data)?;
    if data.len() != length as usize {
      return Err(PngError::Truncated);
    }
    let crc = u32::from_be_bytes(read_array(reader)?);
    let chunk = Self { length, chunk_type, data, crc };
    let computed = chunk.compute_actual_crc();
    if computed != crc {
      return Err(PngError::CrcMismatch { chunk_type, declared: crc, computed });
    }
    Ok(chunk)
  }

  /// Writes the chunk in file layout, using the stored CRC as-is.
  ///
  /// This does *not* recompute the CRC, so call [`verify`](Chunk::verify)
  /// first if the chunk might be inconsistent.
  pub fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
    writer.write_all(&self.length.to_be_bytes())?;
    writer.write_all(&self.chunk_type.0)?;
    writer.write_all(&self.data)?;
    writer.write_all(&self.crc.to_be_bytes())
  }
}

/// Fills an array from the reader, turning a short read into
/// [`PngError::Truncated`].
pub(crate) fn read_array<R: Read, const N: usize>(reader: &mut R) -> PngResult<[u8; N]> {
  let mut buf = [0_u8; N];
  match reader.read_exact(&mut buf) {
    Ok(()) => Ok(buf),
    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(PngError::Truncated),
    Err(e) => Err(PngError::Io(e)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encoded(chunk: &Chunk) -> Vec<u8> {
    let mut out = Vec::new();
    chunk.encode(&mut out).unwrap();
    out
  }

  #[test]
  fn test_chunk_crc_known_value() {
    // the CRC of an empty IEND chunk, as found at the end of every PNG
    assert_eq!(chunk_crc(ChunkType::IEND, &[]), 0xAE42_6082);
    assert_eq!(Chunk::new(ChunkType::IEND, vec![]).declared_crc(), 0xAE42_6082);
  }

  #[test]
  fn test_chunk_type_classification() {
    assert!(ChunkType::IHDR.is_critical());
    assert!(ChunkType::IDAT.is_critical());
    assert!(!ChunkType::tEXt.is_critical());
    assert!(!ChunkType::gAMA.is_critical());
    assert!(ChunkType::PLTE.is_retained());
    assert!(!ChunkType(*b"tIME").is_retained());
    assert_eq!(format!("{}", ChunkType::IHDR), "IHDR");
    assert_eq!(format!("{:?}", ChunkType::IHDR), "\"IHDR\"");
  }

  #[test]
  fn test_verify_accepts_consistent_chunk() {
    let chunk = Chunk::new(ChunkType::IDAT, b"some compressed bytes".to_vec());
    assert_eq!(chunk.length(), 21);
    chunk.verify().unwrap();
  }

  #[test]
  fn test_verify_missing_bytes() {
    let data = vec![7_u8; 8];
    let crc = chunk_crc(ChunkType::IDAT, &data);
    let chunk = Chunk::from_parts(10, ChunkType::IDAT, data, crc);
    assert!(matches!(chunk.verify(), Err(PngError::MissingBytes { declared: 10, actual: 8 })));
  }

  #[test]
  fn test_verify_flipped_crc_byte() {
    let good = Chunk::new(ChunkType::PLTE, vec![1, 2, 3, 4, 5, 6]);
    let bad_crc = good.declared_crc() ^ 0x0000_FF00;
    let bad = Chunk::from_parts(6, ChunkType::PLTE, good.data().to_vec(), bad_crc);
    match bad.verify() {
      Err(PngError::CrcMismatch { computed, declared, chunk_type }) => {
        assert_eq!(chunk_type, ChunkType::PLTE);
        assert_eq!(declared, bad_crc);
        assert_eq!(computed, good.declared_crc());
        assert_ne!(computed, declared);
      }
      other => panic!("expected a crc mismatch, got {other:?}"),
    }
  }

  #[test]
  fn test_every_single_byte_corruption_is_caught() {
    let good = Chunk::new(ChunkType::IDAT, (0..64).collect());
    for i in 0..good.data().len() {
      let mut data = good.data().to_vec();
      data[i] ^= 0x01;
      let bad = Chunk::from_parts(good.length(), ChunkType::IDAT, data, good.declared_crc());
      assert!(matches!(bad.verify(), Err(PngError::CrcMismatch { .. })), "byte {i}");
    }
  }

  #[test]
  fn test_encode_layout() {
    let chunk = Chunk::new(ChunkType::gAMA, vec![0, 0, 0xB1, 0x8F]);
    let bytes = encoded(&chunk);
    assert_eq!(bytes.len(), chunk.encoded_len());
    assert_eq!(&bytes[0..4], &4_u32.to_be_bytes());
    assert_eq!(&bytes[4..8], b"gAMA");
    assert_eq!(&bytes[8..12], &[0, 0, 0xB1, 0x8F]);
    assert_eq!(&bytes[12..16], &chunk.declared_crc().to_be_bytes());
  }

  #[test]
  fn test_encode_uses_stored_crc() {
    let chunk = Chunk::from_parts(1, ChunkType::IDAT, vec![9], 0xDEAD_BEEF);
    let bytes = encoded(&chunk);
    assert_eq!(&bytes[9..13], &0xDEAD_BEEF_u32.to_be_bytes());
  }

  #[test]
  fn test_decode_reads_one_chunk() {
    let first = Chunk::new(ChunkType::IHDR, vec![0; 13]);
    let second = Chunk::new(ChunkType::IEND, vec![]);
    let mut bytes = encoded(&first);
    bytes.extend(encoded(&second));
    let mut reader = bytes.as_slice();
    assert_eq!(Chunk::decode(&mut reader).unwrap(), first);
    assert_eq!(Chunk::decode(&mut reader).unwrap(), second);
    assert!(reader.is_empty());
  }

  #[test]
  fn test_decode_short_data_is_truncated() {
    let chunk = Chunk::new(ChunkType::IDAT, vec![3; 10]);
    let bytes = encoded(&chunk);
    // cut off in the middle of the data
    assert!(matches!(Chunk::decode(&mut &bytes[..14]), Err(PngError::Truncated)));
    // cut off in the middle of the crc
    assert!(matches!(Chunk::decode(&mut &bytes[..20]), Err(PngError::Truncated)));
    // cut off in the length
    assert!(matches!(Chunk::decode(&mut &bytes[..2]), Err(PngError::Truncated)));
  }

  #[test]
  fn test_decode_huge_declared_length_does_not_allocate() {
    let mut bytes = (Chunk::MAX_LENGTH).to_be_bytes().to_vec();
    bytes.extend_from_slice(b"IDAT");
    bytes.extend_from_slice(&[1, 2, 3]);
    assert!(matches!(Chunk::decode(&mut bytes.as_slice()), Err(PngError::Truncated)));

    let mut bytes = u32::MAX.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"IDAT");
    assert!(matches!(Chunk::decode(&mut bytes.as_slice()), Err(PngError::ChunkTooLong(u32::MAX))));
  }

  #[test]
  fn test_decode_crc_mismatch_carries_computed() {
    let chunk = Chunk::new(ChunkType::IDAT, vec![1, 2, 3]);
    let mut bytes = encoded(&chunk);
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    match Chunk::decode(&mut bytes.as_slice()) {
      Err(PngError::CrcMismatch { computed, declared, .. }) => {
        assert_eq!(computed, chunk.declared_crc());
        assert_ne!(computed, declared);
      }
      other => panic!("expected a crc mismatch, got {other:?}"),
    }
  }
}
