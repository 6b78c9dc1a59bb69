pub mod frame;
pub mod matrix;
pub mod outcome;
pub mod point;
pub mod qr_code;

pub use frame::{PixelFormat, PixelFrame};
pub use matrix::BitMatrix;
pub use outcome::{DecodeOutcome, FormatFault};
pub use point::Point;
pub use qr_code::{BarcodeFormat, Decoded, ECLevel, MaskPattern, SymbolMetadata};
