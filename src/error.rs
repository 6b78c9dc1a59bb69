use std::path::PathBuf;

/// Failures that end a decode attempt regardless of image content
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// The symbol reader failed for reasons unrelated to the image
    #[error("codec failure: {0}")]
    Codec(String),

    /// The image could not be opened or decoded
    #[error("failed to read image: {0}")]
    Image(#[from] image::ImageError),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pixel buffer is shorter than its dimensions require
    #[error("frame {width}x{height} needs {expected} bytes, got {actual}")]
    InvalidFrame {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    /// A crop rectangle does not fit its source plane
    #[error("crop {left},{top} {width}x{height} exceeds {data_width}x{data_height} source")]
    InvalidCrop {
        left: usize,
        top: usize,
        width: usize,
        height: usize,
        data_width: usize,
        data_height: usize,
    },

    /// The decode worker pool could not be created
    #[error("failed to build decode worker pool: {0}")]
    WorkerPool(String),

    /// The frame source failed
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Failures of a frame source
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    /// The source could not begin capturing
    #[error("frame source failed to start: {0}")]
    Start(String),

    /// `start` was called on a running source
    #[error("frame source is already running")]
    AlreadyStarted,
}

/// Failures while generating a QR image
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// The payload exceeds the largest symbol
    #[error("payload does not fit in a QR symbol: {0}")]
    Capacity(#[from] qrcode::types::QrError),

    /// A requested output dimension is zero
    #[error("invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// The output directory does not exist or is not a directory
    #[error("output directory unavailable: {}", .0.display())]
    OutputDirUnavailable(PathBuf),

    /// PNG encoding failed
    #[error("failed to encode PNG: {0}")]
    Image(#[from] image::ImageError),

    /// Writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Final failure of a scan, as seen by callers
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Every attempt missed or could not read the symbol
    #[error("no QR code located")]
    NotFound,

    /// A fatal decode failure
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
