//! rxqr - adaptive QR code scanning for camera streams and image files
//!
//! Two decode paths share one single-shot decoder:
//! - still images are decoded with adaptive downsampling, retrying at
//!   coarser resolutions when a symbol is missed or unreadable
//!   ([`decoder::FileDecoder`])
//! - camera frames are decoded continuously on a worker pool that drops
//!   frames while busy ([`stream::StreamingDecoder`])
//!
//! QR generation renders a payload to a PNG file ([`encoder::QrEncoder`]).
//!
//! ```no_run
//! match rxqr::scan_file("ticket.jpg") {
//!     Ok(decoded) => println!("{}", decoded.text),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Scan and encode tuning, including `RXQR_*` environment overrides
pub mod config;
/// Symbol reader seam, single-shot and adaptive file decoding
pub mod decoder;
/// QR image generation
pub mod encoder;
/// Error types for every public operation
pub mod error;
/// Luminance views and binarized bitmaps
pub mod luminance;
/// Core data structures (frames, bit matrices, decode results)
pub mod models;
/// Camera frame sources and the streaming decoder
pub mod stream;
/// Pixel-level helpers (grayscale, binarization, buffer pool)
pub mod utils;

use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;

pub use config::{DecodeHints, EncodeConfig, ScanConfig};
pub use decoder::{FileDecoder, FileScan, QrReader, SingleShotDecoder, SymbolReader};
pub use encoder::QrEncoder;
pub use error::{CaptureError, DecodeError, EncodeError, ScanError};
pub use models::{
    BarcodeFormat, BitMatrix, DecodeOutcome, Decoded, ECLevel, FormatFault, MaskPattern, PixelFormat,
    PixelFrame, Point, SymbolMetadata,
};
pub use stream::{CameraScan, FrameAdapter, FrameSource, StreamingDecoder};

/// Decode the QR code in an image file
///
/// Blocks for the whole retry loop; call it off any interactive thread.
/// Tuning comes from [`ScanConfig::from_env`].
pub fn scan_file(path: impl AsRef<Path>) -> Result<Decoded, ScanError> {
    FileDecoder::new(ScanConfig::from_env())
        .decode_file(path)
        .into_result()
}

/// Start decoding frames from `source`, which delivers them in `format`
///
/// Stop the scan by calling [`CameraScan::stop`] or dropping the handle.
pub fn scan_camera(source: Box<dyn FrameSource>, format: PixelFormat) -> Result<CameraScan, DecodeError> {
    StreamingDecoder::new(ScanConfig::from_env()).start(FrameAdapter::new(source, format))
}

/// Write a `width x height` QR image of `payload` into `dir` in the
/// background; the receiver yields the written path or the failure
pub fn generate_qr_file(
    payload: impl Into<String>,
    width: u32,
    height: u32,
    dir: impl Into<PathBuf>,
) -> Receiver<Result<PathBuf, EncodeError>> {
    QrEncoder::default().generate_file(payload, width, height, dir)
}
