//! QR image generation
//!
//! A payload is encoded into a module matrix, fitted into a square logical
//! grid by the largest whole multiple that fits (centred, no quiet zone),
//! rasterized at one pixel per grid cell and finally resized to the
//! requested output size with a smoothing filter.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, unbounded};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{ColorType, GrayImage, ImageEncoder, Luma};
use log::{debug, info};
use qrcode::{Color, EcLevel, QrCode};

use crate::config::EncodeConfig;
use crate::error::EncodeError;
use crate::models::BitMatrix;

/// Encode `payload` into its module matrix (error correction level L)
pub fn symbol_modules(payload: impl AsRef<[u8]>) -> Result<BitMatrix, EncodeError> {
    let code = QrCode::with_error_correction_level(payload.as_ref(), EcLevel::L)?;
    let side = code.width();
    let mut modules = BitMatrix::new(side, side);
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color == Color::Dark {
            modules.set(i % side, i / side, true);
        }
    }
    Ok(modules)
}

/// Render modules at `module_px` pixels each, surrounded by a light quiet
/// zone of `quiet_zone` modules
pub fn render_modules(modules: &BitMatrix, module_px: usize, quiet_zone: usize) -> BitMatrix {
    let out_w = (modules.width() + 2 * quiet_zone) * module_px;
    let out_h = (modules.height() + 2 * quiet_zone) * module_px;
    let mut out = BitMatrix::new(out_w, out_h);
    for y in 0..modules.height() {
        for x in 0..modules.width() {
            if modules.get(x, y) {
                out.set_region(
                    (x + quiet_zone) * module_px,
                    (y + quiet_zone) * module_px,
                    module_px,
                    module_px,
                );
            }
        }
    }
    out
}

/// Fit a symbol into a `side x side` grid
///
/// The symbol is scaled by the largest integer multiple that fits and
/// centred; leftover cells stay light. A grid smaller than the symbol grows
/// to the symbol's size.
pub fn fit_to_grid(modules: &BitMatrix, side: usize) -> BitMatrix {
    let n = modules.width().max(1);
    let output = side.max(n);
    let multiple = output / n;
    let padding = (output - n * multiple) / 2;

    let mut grid = BitMatrix::new(output, output);
    for y in 0..modules.height() {
        for x in 0..modules.width() {
            if modules.get(x, y) {
                grid.set_region(padding + x * multiple, padding + y * multiple, multiple, multiple);
            }
        }
    }
    grid
}

/// One pixel per cell: dark 0, light 255
pub fn rasterize(grid: &BitMatrix) -> GrayImage {
    GrayImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        if grid.get(x as usize, y as usize) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// PNG is lossless, so a quality setting only trades encode time for size
fn compression_for(quality: u8) -> CompressionType {
    match quality {
        0..=30 => CompressionType::Fast,
        31..=89 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Produces QR images in memory or as PNG files
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder {
    config: EncodeConfig,
}

impl QrEncoder {
    /// Create an encoder with the given settings
    pub fn new(config: EncodeConfig) -> Self {
        Self { config }
    }

    /// Render `payload` as a `width x height` grayscale image
    pub fn encode(&self, payload: &str, width: u32, height: u32) -> Result<GrayImage, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidSize { width, height });
        }
        let modules = symbol_modules(payload)?;
        let grid = fit_to_grid(&modules, self.config.module_grid as usize);
        debug!(
            "{}-module symbol fitted into {}x{} grid",
            modules.width(),
            grid.width(),
            grid.height()
        );
        Ok(imageops::resize(&rasterize(&grid), width, height, FilterType::Triangle))
    }

    /// Render `payload` and encode it as PNG bytes
    pub fn encode_png(&self, payload: &str, width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
        let image = self.encode(payload, width, height)?;
        let mut png = Vec::new();
        PngEncoder::new_with_quality(
            &mut png,
            compression_for(self.config.png_quality),
            PngFilter::Adaptive,
        )
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::L8)?;
        Ok(png)
    }

    /// Render `payload` into a new `qr_<unix-millis>.png` inside `dir`
    ///
    /// The PNG is fully encoded before the file is created, so capacity and
    /// size errors never leave a file behind; a failed write removes the
    /// partial file.
    pub fn encode_to_dir(
        &self,
        payload: &str,
        width: u32,
        height: u32,
        dir: &Path,
    ) -> Result<PathBuf, EncodeError> {
        if !dir.is_dir() {
            return Err(EncodeError::OutputDirUnavailable(dir.to_path_buf()));
        }
        let png = self.encode_png(payload, width, height)?;

        let mut stamp = chrono::Utc::now().timestamp_millis();
        let (path, mut file) = loop {
            let path = dir.join(format!("qr_{stamp}.png"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => stamp += 1,
                Err(err) => return Err(err.into()),
            }
        };

        if let Err(err) = file.write_all(&png) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(err.into());
        }
        info!("wrote {}x{} QR image to {}", width, height, path.display());
        Ok(path)
    }

    /// Generate a file on the rayon global pool
    ///
    /// The receiver yields exactly one result.
    pub fn generate_file(
        &self,
        payload: impl Into<String>,
        width: u32,
        height: u32,
        dir: impl Into<PathBuf>,
    ) -> Receiver<Result<PathBuf, EncodeError>> {
        let (tx, rx) = unbounded();
        let encoder = *self;
        let payload = payload.into();
        let dir = dir.into();
        rayon::spawn(move || {
            let result = encoder.encode_to_dir(&payload, width, height, &dir);
            if tx.send(result).is_err() {
                debug!("generation result for {} discarded: receiver dropped", dir.display());
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX epoch")
            .as_nanos();
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("rxqr_encoder_{nanos}_{sequence}"));
        fs::create_dir_all(&path).expect("failed to create temp dir");
        path
    }

    #[test]
    fn test_symbol_modules_version_one() {
        let modules = symbol_modules("hello").unwrap();
        assert_eq!(modules.width(), 21);
        // Finder pattern corners are dark, the separator next to them is light
        assert!(modules.get(0, 0));
        assert!(modules.get(20, 0));
        assert!(modules.get(0, 20));
        assert!(!modules.get(7, 0));
    }

    #[test]
    fn test_fit_to_grid_centres_largest_multiple() {
        let modules = symbol_modules("hello").unwrap();
        let grid = fit_to_grid(&modules, 200);

        // 21 modules * 9 = 189 cells, 11 left over, 5 on the leading side
        assert_eq!(grid.width(), 200);
        assert!(!grid.get(4, 4));
        assert!(grid.get(5, 5));
        assert!(grid.get(5 + 189 - 1, 5));
        assert!(!grid.get(5 + 189, 5));
    }

    #[test]
    fn test_fit_to_grid_never_shrinks_symbol() {
        let modules = symbol_modules("hello").unwrap();
        let grid = fit_to_grid(&modules, 10);
        assert_eq!(grid.width(), 21);
        assert_eq!(grid, modules);
    }

    #[test]
    fn test_render_modules_quiet_zone() {
        let modules = symbol_modules("hello").unwrap();
        let rendered = render_modules(&modules, 2, 4);
        assert_eq!(rendered.width(), (21 + 8) * 2);
        assert!(!rendered.get(7, 7));
        assert!(rendered.get(8, 8));
    }

    #[test]
    fn test_encode_dimensions_and_polarity() {
        let image = QrEncoder::default().encode("hello", 400, 300).unwrap();
        assert_eq!(image.dimensions(), (400, 300));
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        // Finder core centre sits at grid cell (36, 36); x scales by 2, y by 1.5
        assert!(image.get_pixel(73, 55)[0] < 64);
    }

    #[test]
    fn test_encode_rejects_zero_size() {
        let err = QrEncoder::default().encode("hello", 0, 100).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidSize { width: 0, height: 100 }));
    }

    #[test]
    fn test_png_signature_and_compression_mapping() {
        let png = QrEncoder::default().encode_png("hello", 64, 64).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert!(matches!(compression_for(85), CompressionType::Default));
        assert!(matches!(compression_for(10), CompressionType::Fast));
        assert!(matches!(compression_for(100), CompressionType::Best));
    }

    #[test]
    fn test_encode_to_dir_names_files_by_timestamp() {
        let dir = temp_dir();
        let encoder = QrEncoder::default();

        let first = encoder.encode_to_dir("one", 100, 100, &dir).unwrap();
        let second = encoder.encode_to_dir("two", 100, 100, &dir).unwrap();

        assert_ne!(first, second);
        for path in [&first, &second] {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("qr_") && name.ends_with(".png"), "{name}");
            assert_eq!(image::image_dimensions(path).unwrap(), (100, 100));
        }
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_dir_is_reported() {
        let dir = temp_dir().join("missing");
        let err = QrEncoder::default().encode_to_dir("x", 10, 10, &dir).unwrap_err();
        assert!(matches!(err, EncodeError::OutputDirUnavailable(p) if p == dir));
    }

    #[test]
    fn test_generate_file_delivers_one_result() {
        let dir = temp_dir();
        let rx = QrEncoder::default().generate_file("async", 50, 50, dir.clone());

        let path = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert!(path.starts_with(&dir));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        let _ = fs::remove_dir_all(dir);
    }
}
