use super::Point;

/// Symbology of a decoded symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeFormat {
    /// QR Code Model 2
    QrCode,
}

/// Error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ECLevel {
    /// Low (~7% recovery capacity)
    L,
    /// Medium (~15% recovery capacity)
    M,
    /// Quartile (~25% recovery capacity)
    Q,
    /// High (~30% recovery capacity)
    H,
}

impl ECLevel {
    /// Map the two error-correction bits of the format information
    /// (01=L, 00=M, 11=Q, 10=H)
    pub fn from_format_bits(bits: u16) -> Self {
        match bits & 0x03 {
            0 => ECLevel::M,
            1 => ECLevel::L,
            2 => ECLevel::H,
            _ => ECLevel::Q,
        }
    }
}

/// Mask pattern (0-7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPattern {
    /// (i + j) % 2 == 0
    Pattern0 = 0,
    /// i % 2 == 0
    Pattern1 = 1,
    /// j % 3 == 0
    Pattern2 = 2,
    /// (i + j) % 3 == 0
    Pattern3 = 3,
    /// (i/2 + j/3) % 2 == 0
    Pattern4 = 4,
    /// (i*j)%2 + (i*j)%3 == 0
    Pattern5 = 5,
    /// ((i*j)%2 + (i*j)%3) % 2 == 0
    Pattern6 = 6,
    /// ((i+j)%2 + (i*j)%3) % 2 == 0
    Pattern7 = 7,
}

impl MaskPattern {
    /// Get mask pattern from its three format bits
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0x07 {
            0 => MaskPattern::Pattern0,
            1 => MaskPattern::Pattern1,
            2 => MaskPattern::Pattern2,
            3 => MaskPattern::Pattern3,
            4 => MaskPattern::Pattern4,
            5 => MaskPattern::Pattern5,
            6 => MaskPattern::Pattern6,
            _ => MaskPattern::Pattern7,
        }
    }
}

/// Symbol-level details reported alongside a payload
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMetadata {
    /// QR version (1-40)
    pub version: u8,
    /// Error correction level
    pub error_correction: ECLevel,
    /// Mask pattern used by the encoder
    pub mask_pattern: MaskPattern,
    /// Corner points, clockwise from top-left, in source image coordinates
    pub corners: [Point; 4],
}

/// A successfully decoded symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Decoded content as UTF-8 text (lossy for non-text payloads)
    pub text: String,
    /// Raw payload bytes
    pub bytes: Vec<u8>,
    /// Symbology
    pub format: BarcodeFormat,
    /// Version, EC level, mask and location
    pub metadata: SymbolMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ec_level_format_bits() {
        assert_eq!(ECLevel::from_format_bits(0b01), ECLevel::L);
        assert_eq!(ECLevel::from_format_bits(0b00), ECLevel::M);
        assert_eq!(ECLevel::from_format_bits(0b11), ECLevel::Q);
        assert_eq!(ECLevel::from_format_bits(0b10), ECLevel::H);
    }

    #[test]
    fn test_mask_pattern() {
        assert_eq!(MaskPattern::from_bits(0), MaskPattern::Pattern0);
        assert_eq!(MaskPattern::from_bits(5), MaskPattern::Pattern5);
        assert_eq!(MaskPattern::from_bits(0b1111), MaskPattern::Pattern7);
    }
}
