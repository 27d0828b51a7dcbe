//! Reading, checking, and stripping PNG chunk streams.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! A PNG is an 8 byte signature followed by a series of "chunks". Each chunk is
//! a big-endian `u32` length, a four byte type tag, that many bytes of data,
//! and a big-endian CRC-32 of the type and data. There's four "critical" chunk
//! types that are needed to rebuild the image:
//! * **Header** (`IHDR`) - dimensions and pixel format, always first.
//! * **Palette** (`PLTE`) - for indexed color, must come before image data.
//! * **Image Data** (`IDAT`) - one or more chunks of compressed pixel data.
//! * **End** (`IEND`) - the last chunk, lets you know the stream wasn't cut off.
//!
//! Everything else is "ancillary": text, gamma, timestamps, color profiles,
//! and so on. This module drops all of those.
//!
//! ## Steps
//!
//! 1) [`read_document`] decodes the stream into an [`ImageDocument`], checking
//!    every chunk's CRC as it goes. It does not look at the signature, call
//!    [`check_signature`] if you care.
//! 2) [`Stripper::strip`] keeps `IHDR`, `PLTE`, `IDAT`, and `IEND`, in file
//!    order, and serializes them behind a fresh signature.
//!
//! ```
//! use pngstrip::png::*;
//! # fn main() -> pngstrip::PngResult<()> {
//! let mut bytes = PNG_SIGNATURE.to_vec();
//! for chunk in [
//!   Chunk::new(ChunkType::IHDR, vec![0; 13]),
//!   Chunk::new(ChunkType::tEXt, b"Comment\0hi".to_vec()),
//!   Chunk::new(ChunkType::IDAT, vec![1, 2, 3]),
//!   Chunk::new(ChunkType::IEND, vec![]),
//! ] {
//!   chunk.encode(&mut bytes)?;
//! }
//! let doc = read_document(bytes.as_slice())?;
//! let stripped = Stripper::new(true).strip(&doc, "out.png".as_ref())?;
//! assert!(stripped.len() < bytes.len());
//! # Ok(())
//! # }
//! ```

use core::fmt::{Debug, Display, Write as _};
use std::{
  collections::HashMap,
  fs::File,
  io::{self, BufReader, Read, Write},
  path::Path,
};

use tracing::trace;

use crate::{PngError, PngResult};

mod chunk;
pub use chunk::*;

mod signature;
pub use signature::*;

mod document;
pub use document::*;

mod reader;
pub use reader::*;

mod strip;
pub use strip::*;
