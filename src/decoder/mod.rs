//! QR code decoding
//!
//! Decoding is layered:
//! - [`reader`]: the codec seam, a [`SymbolReader`] that locates and reads one
//!   symbol in a binarized bitmap
//! - [`single_shot`]: one attempt per call, classified into a
//!   [`DecodeOutcome`](crate::models::DecodeOutcome), with the reader reset
//!   on every exit path
//! - [`file`]: adaptive downsampling retries for still images

/// Adaptive file decoder
pub mod file;
/// Symbol reader trait and the `rqrr`-backed implementation
pub mod reader;
/// Single-attempt decoding with guaranteed reader reset
pub mod single_shot;

pub use file::{FileDecoder, FileImage, FileScan, ImageSource, MemoryImage, initial_sample_factor};
pub use reader::{QrReader, ReaderError, SymbolReader};
pub use single_shot::SingleShotDecoder;
