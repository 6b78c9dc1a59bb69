use rqrr::{DeQRError, PreparedImage};

use crate::config::DecodeHints;
use crate::luminance::BinaryBitmap;
use crate::models::{BarcodeFormat, Decoded, ECLevel, MaskPattern, Point, SymbolMetadata};

/// Failure modes reported by a symbol reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// No symbol located
    NotFound,
    /// Symbol located, error correction failed
    Checksum,
    /// Symbol located, structure unreadable
    Format,
    /// Failure inside the codec unrelated to the image
    Internal(String),
}

impl From<DeQRError> for ReaderError {
    fn from(err: DeQRError) -> Self {
        match err {
            DeQRError::DataEcc | DeQRError::FormatEcc => ReaderError::Checksum,
            DeQRError::InvalidVersion
            | DeQRError::InvalidGridSize
            | DeQRError::UnknownDataType
            | DeQRError::DataUnderflow
            | DeQRError::DataOverflow
            | DeQRError::EncodingError => ReaderError::Format,
            other => ReaderError::Internal(format!("{other:?}")),
        }
    }
}

/// Black-box symbol detection and decoding over a binarized bitmap
///
/// Readers may keep attempt-scoped state between `decode` and `reset`;
/// callers reset after every attempt (see `SingleShotDecoder`).
pub trait SymbolReader {
    /// Locate and read one symbol
    fn decode(&mut self, bitmap: &BinaryBitmap, hints: &DecodeHints) -> Result<Decoded, ReaderError>;

    /// Discard any state left over from the previous attempt
    fn reset(&mut self);
}

/// QR reader backed by `rqrr`
///
/// Payload bytes are accumulated in a scratch buffer that only `reset`
/// clears, so a reader must be reset between attempts.
#[derive(Debug, Default)]
pub struct QrReader {
    payload: Vec<u8>,
}

impl QrReader {
    /// Create a reader with an empty scratch buffer
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&mut self, bitmap: &BinaryBitmap) -> Result<Decoded, ReaderError> {
        let mut prepared =
            PreparedImage::prepare_from_bitmap(bitmap.width(), bitmap.height(), |x, y| {
                bitmap.is_dark(x, y)
            });
        let grids = prepared.detect_grids();
        if grids.is_empty() {
            return Err(ReaderError::NotFound);
        }

        // First grid that reads wins; otherwise report the most specific fault.
        let mut fault = ReaderError::Format;
        for grid in &grids {
            let mark = self.payload.len();
            match grid.decode_to(&mut self.payload) {
                Ok(meta) => {
                    let bytes = self.payload.clone();
                    return Ok(Decoded {
                        text: String::from_utf8_lossy(&bytes).into_owned(),
                        bytes,
                        format: BarcodeFormat::QrCode,
                        metadata: SymbolMetadata {
                            version: meta.version.0 as u8,
                            error_correction: ECLevel::from_format_bits(meta.ecc_level),
                            mask_pattern: MaskPattern::from_bits(meta.mask),
                            corners: grid.bounds.each_ref().map(Point::from),
                        },
                    });
                }
                Err(err) => {
                    self.payload.truncate(mark);
                    match ReaderError::from(err) {
                        internal @ ReaderError::Internal(_) => return Err(internal),
                        ReaderError::Checksum => fault = ReaderError::Checksum,
                        _ => {}
                    }
                }
            }
        }
        Err(fault)
    }
}

impl SymbolReader for QrReader {
    fn decode(&mut self, bitmap: &BinaryBitmap, hints: &DecodeHints) -> Result<Decoded, ReaderError> {
        match self.read(bitmap) {
            Err(fault) if hints.try_harder && !matches!(fault, ReaderError::Internal(_)) => {
                // Light-on-dark symbols only show up once polarity is flipped
                self.read(&bitmap.inverted()).map_err(|inverted| match inverted {
                    ReaderError::Internal(_) => inverted,
                    _ => fault,
                })
            }
            other => other,
        }
    }

    fn reset(&mut self) {
        self.payload.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{render_modules, symbol_modules};
    use crate::models::BitMatrix;

    fn bitmap_for(payload: &str) -> BinaryBitmap {
        let modules = symbol_modules(payload).unwrap();
        BinaryBitmap::from_matrix(render_modules(&modules, 4, 4))
    }

    #[test]
    fn test_reads_rendered_symbol() {
        let mut reader = QrReader::new();
        let decoded = reader
            .decode(&bitmap_for("hello rxqr"), &DecodeHints::default())
            .unwrap();

        assert_eq!(decoded.text, "hello rxqr");
        assert_eq!(decoded.bytes, b"hello rxqr");
        assert_eq!(decoded.format, BarcodeFormat::QrCode);
        assert_eq!(decoded.metadata.version, 1);
        assert_eq!(decoded.metadata.error_correction, ECLevel::L);
    }

    #[test]
    fn test_blank_bitmap_is_not_found() {
        let mut reader = QrReader::new();
        let blank = BinaryBitmap::from_matrix(BitMatrix::new(64, 64));
        let hints = DecodeHints { try_harder: false };
        assert_eq!(reader.decode(&blank, &hints), Err(ReaderError::NotFound));
    }

    #[test]
    fn test_try_harder_reads_inverted_symbol() {
        let inverted = bitmap_for("light on dark").inverted();
        let mut reader = QrReader::new();

        let relaxed = DecodeHints { try_harder: false };
        assert!(reader.decode(&inverted, &relaxed).is_err());
        reader.reset();

        let decoded = reader.decode(&inverted, &DecodeHints::default()).unwrap();
        assert_eq!(decoded.text, "light on dark");
    }

    #[test]
    fn test_scratch_survives_until_reset() {
        let hints = DecodeHints::default();
        let mut reader = QrReader::new();

        reader.decode(&bitmap_for("alpha"), &hints).unwrap();
        let stale = reader.decode(&bitmap_for("beta"), &hints).unwrap();
        assert_eq!(stale.text, "alphabeta");

        reader.reset();
        let fresh = reader.decode(&bitmap_for("beta"), &hints).unwrap();
        assert_eq!(fresh.text, "beta");
    }

    #[test]
    fn test_codec_error_classification() {
        assert_eq!(ReaderError::from(DeQRError::DataEcc), ReaderError::Checksum);
        assert_eq!(ReaderError::from(DeQRError::FormatEcc), ReaderError::Checksum);
        assert_eq!(ReaderError::from(DeQRError::InvalidVersion), ReaderError::Format);
        assert_eq!(ReaderError::from(DeQRError::UnknownDataType), ReaderError::Format);
        assert!(matches!(
            ReaderError::from(DeQRError::IoError),
            ReaderError::Internal(_)
        ));
    }
}
