use crate::utils::binarization::Binarizer;

/// Longest side (per axis) the first file decode attempt aims for
pub const REFERENCE_BOUND: u32 = 512;
/// Decode attempts per file before giving up
pub const MAX_ATTEMPTS: usize = 4;
/// Side of the encoder's logical module grid
pub const MODULE_GRID: u32 = 200;
/// Quality requested for generated PNG files
pub const PNG_QUALITY: u8 = 85;

fn parse_usize(raw: Option<String>, default: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_u32(raw: Option<String>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

/// Hints passed to the symbol reader on every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeHints {
    /// Spend more time per attempt; on a miss the reader also tries the
    /// inverted (light-on-dark) bitmap
    pub try_harder: bool,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self { try_harder: true }
    }
}

/// Tuning for the file and camera decode paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Initial downsampling aims for both sides at or below this bound
    pub reference_bound: u32,
    /// Attempt budget for file decoding
    pub max_attempts: usize,
    /// Reader hints; `try_harder` is always on by default
    pub hints: DecodeHints,
    /// Thresholding policy for the luminance bridge
    pub binarizer: Binarizer,
    /// Decode workers for the camera stream, each with its own reader
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            reference_bound: REFERENCE_BOUND,
            max_attempts: MAX_ATTEMPTS,
            hints: DecodeHints::default(),
            binarizer: Binarizer::default(),
            workers: 1,
        }
    }
}

impl ScanConfig {
    /// Defaults overridden by `RXQR_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup
    ///
    /// Unparseable values keep the default; numeric values are clamped.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            reference_bound: parse_u32(lookup("RXQR_REFERENCE_BOUND"), defaults.reference_bound)
                .clamp(64, 8192),
            max_attempts: parse_usize(lookup("RXQR_MAX_ATTEMPTS"), defaults.max_attempts)
                .clamp(1, 16),
            hints: defaults.hints,
            binarizer: lookup("RXQR_BINARIZER")
                .and_then(|v| Binarizer::from_name(&v))
                .unwrap_or(defaults.binarizer),
            workers: parse_usize(lookup("RXQR_WORKERS"), defaults.workers).clamp(1, 16),
        }
    }
}

/// Settings for QR image generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeConfig {
    /// Side of the module grid the symbol is rendered into before scaling
    pub module_grid: u32,
    /// Requested PNG quality (0-100)
    pub png_quality: u8,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            module_grid: MODULE_GRID,
            png_quality: PNG_QUALITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.reference_bound, 512);
        assert_eq!(config.max_attempts, 4);
        assert!(config.hints.try_harder);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_lookup_overrides_and_clamps() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("RXQR_REFERENCE_BOUND", "1024"),
            ("RXQR_MAX_ATTEMPTS", "999"),
            ("RXQR_WORKERS", "not-a-number"),
            ("RXQR_BINARIZER", "otsu"),
        ]);
        let config = ScanConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.reference_bound, 1024);
        assert_eq!(config.max_attempts, 16);
        assert_eq!(config.workers, 1);
        assert_eq!(config.binarizer, Binarizer::Otsu);
    }
}
