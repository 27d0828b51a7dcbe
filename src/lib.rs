#![forbid(unsafe_code)]

//! A crate for stripping PNG files down to their critical chunks.
//!
//! Every chunk's CRC is checked on the way in, ancillary chunks (text, gamma,
//! timestamps, color profiles, ...) are dropped, and the `IHDR`, `PLTE`,
//! `IDAT`, and `IEND` chunks are written back out in their original order.
//! Optionally the result is handed to an external lossless encoder.
//!
//! * [`png`] has the chunk level reading, checking, and writing.
//! * [`BatchPipeline`] runs that over a whole directory tree using a pool of
//!   worker threads.

pub mod png;

mod error;
pub use error::*;

mod config;
pub use config::*;

pub mod sink;
pub use sink::{ExternalEncoder, OutputSink};

pub mod pipeline;
pub use pipeline::{BatchPipeline, PipelineReport};

pub mod logging;
