use super::*;

/// The 8 bytes at the start of every PNG stream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// The 8 signature bytes read from the start of a stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(pub [u8; 8]);
impl Signature {
  /// The canonical PNG signature.
  pub const PNG: Self = Self(PNG_SIGNATURE);

  /// Classifies these bytes, see [`check_signature`].
  #[inline]
  #[must_use]
  pub fn check(&self) -> SignatureStatus {
    check_signature(&self.0)
  }
}
impl Debug for Signature {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "Signature({:02X?})", self.0)
  }
}

/// Which way a text-mode transfer rewrote the line endings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEndingConversion {
  /// `CR LF` became `LF`, so the stream lost a byte.
  DosToUnix,
  /// `LF` became `CR LF`, so the stream gained a byte.
  UnixToDos,
}
impl Display for LineEndingConversion {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_str(match self {
      Self::DosToUnix => "dos to unix",
      Self::UnixToDos => "unix to dos",
    })
  }
}

/// The outcome of looking at the first bytes of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureStatus {
  Valid,
  NotAPng,
  Truncated,
  LineEndingCorrupted(LineEndingConversion),
}
impl SignatureStatus {
  /// `Ok` for [`Valid`](SignatureStatus::Valid), the matching error otherwise.
  pub fn into_result(self) -> PngResult<()> {
    match self {
      Self::Valid => Ok(()),
      Self::NotAPng => Err(PngError::NotAPng),
      Self::Truncated => Err(PngError::Truncated),
      Self::LineEndingCorrupted(conversion) => Err(PngError::LineEndingCorrupted(conversion)),
    }
  }
}

/// Classifies the first bytes of a stream.
///
/// The signature deliberately contains a `CR LF` pair (bytes 5 and 6) and a
/// lone `LF` (byte 8), so line ending conversions leave recognizable damage:
/// * Fewer than 8 bytes with a 5th byte that isn't `CR` means a `CR LF` was
///   collapsed to `LF`.
/// * A full 8 bytes where the 8th isn't `LF` means an `LF` was expanded.
///
/// Only after that is the `\x89PNG` prefix checked. Extra bytes past the 8th
/// are ignored, so the whole file can be passed in.
#[must_use]
pub fn check_signature(bytes: &[u8]) -> SignatureStatus {
  if bytes.len() < 8 {
    return match bytes.get(4) {
      Some(&b) if b != b'\r' => SignatureStatus::LineEndingCorrupted(LineEndingConversion::DosToUnix),
      _ => SignatureStatus::Truncated,
    };
  }
  if bytes[7] != b'\n' {
    return SignatureStatus::LineEndingCorrupted(LineEndingConversion::UnixToDos);
  }
  if bytes[0] != 0x89 || &bytes[1..4] != b"PNG" {
    return SignatureStatus::NotAPng;
  }
  SignatureStatus::Valid
}
