//! Adaptive still-image decoding
//!
//! Large photos are never decoded at full resolution. The first attempt
//! samples the image down until at least one side fits the reference bound,
//! and every recoverable miss doubles the sample factor for the next
//! attempt, up to the configured attempt budget. Each attempt materializes
//! the image afresh at the new factor; nothing from a previous attempt is
//! kept except the pooled luminance buffer.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegDecoder;
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, RgbImage};
use log::{debug, info};

use super::reader::{QrReader, SymbolReader};
use super::single_shot::SingleShotDecoder;
use crate::config::ScanConfig;
use crate::error::{DecodeError, ScanError};
use crate::luminance::rgb_to_bitmap;
use crate::models::{DecodeOutcome, Decoded};
use crate::utils::memory_pool::BufferPool;

/// Sample factor for the first attempt
///
/// Doubles from 1 while both sides, divided by the factor, still exceed
/// `bound`. An image with either side already at or under the bound is
/// decoded at full resolution.
pub fn initial_sample_factor(width: u32, height: u32, bound: u32) -> u32 {
    let mut factor = 1u32;
    while height / factor > bound && width / factor > bound {
        factor *= 2;
    }
    factor
}

/// Something that can report its dimensions cheaply and produce an RGB
/// raster at a given sample factor
pub trait ImageSource {
    /// Full-resolution dimensions, without decoding pixel data where possible
    fn probe(&self) -> Result<(u32, u32), DecodeError>;

    /// The image at `(w / factor).max(1) x (h / factor).max(1)`
    fn materialize(&self, factor: u32) -> Result<RgbImage, DecodeError>;
}

fn sampled_size(width: u32, height: u32, factor: u32) -> (u32, u32) {
    let factor = factor.max(1);
    ((width / factor).max(1), (height / factor).max(1))
}

fn resize_to(image: &DynamicImage, (width, height): (u32, u32)) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.to_rgb8();
    }
    image.thumbnail_exact(width, height).to_rgb8()
}

fn downsample(image: &DynamicImage, factor: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    resize_to(image, sampled_size(w, h, factor))
}

/// Decode an image file as cheaply as `factor` allows
///
/// JPEGs are decoded straight at a reduced DCT scale no smaller than the
/// sampled size, so the full-resolution raster is never allocated. Other
/// formats decode at full size. Returns the image with the file's
/// full-resolution dimensions.
fn open_sampled(path: &Path, factor: u32) -> Result<(DynamicImage, (u32, u32)), DecodeError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if factor > 1 && reader.format() == Some(ImageFormat::Jpeg) {
        let mut jpeg = JpegDecoder::new(BufReader::new(File::open(path)?))?;
        let full = jpeg.dimensions();
        let (w, h) = sampled_size(full.0, full.1, factor);
        let clamp = |side: u32| u16::try_from(side).unwrap_or(u16::MAX);
        jpeg.scale(clamp(w), clamp(h))?;
        return Ok((DynamicImage::from_decoder(jpeg)?, full));
    }
    let image = reader.decode()?;
    let full = image.dimensions();
    Ok((image, full))
}

/// An image file on disk, re-read for every attempt
///
/// JPEG files are decoded at a reduced scale on downsampled attempts.
#[derive(Debug, Clone)]
pub struct FileImage {
    path: PathBuf,
}

impl FileImage {
    /// Refer to an image file; nothing is read until the first probe
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the image file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileImage {
    fn probe(&self) -> Result<(u32, u32), DecodeError> {
        Ok(image::image_dimensions(&self.path)?)
    }

    fn materialize(&self, factor: u32) -> Result<RgbImage, DecodeError> {
        let (image, (w, h)) = open_sampled(&self.path, factor)?;
        Ok(resize_to(&image, sampled_size(w, h, factor)))
    }
}

/// An already decoded image held in memory
#[derive(Debug, Clone)]
pub struct MemoryImage {
    image: DynamicImage,
}

impl MemoryImage {
    /// Wrap a decoded image
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Decode an encoded image (PNG, JPEG, ...) from a byte buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::new(image::load_from_memory(bytes)?))
    }
}

impl ImageSource for MemoryImage {
    fn probe(&self) -> Result<(u32, u32), DecodeError> {
        Ok(self.image.dimensions())
    }

    fn materialize(&self, factor: u32) -> Result<RgbImage, DecodeError> {
        Ok(downsample(&self.image, factor))
    }
}

/// Result of scanning one image
#[derive(Debug)]
pub struct FileScan {
    /// `Decoded`, `FatalError`, or `NotFound` once the budget is spent
    pub outcome: DecodeOutcome,
    /// Decode attempts made (0 if the image could not be probed)
    pub attempts: usize,
    /// Sample factor used by each attempt, in order
    pub sample_factors: Vec<u32>,
}

impl FileScan {
    fn finish(outcome: DecodeOutcome, sample_factors: Vec<u32>) -> Self {
        Self {
            outcome,
            attempts: sample_factors.len(),
            sample_factors,
        }
    }

    /// Collapse into the caller-facing result
    pub fn into_result(self) -> Result<Decoded, ScanError> {
        match self.outcome {
            DecodeOutcome::Decoded(decoded) => Ok(decoded),
            DecodeOutcome::FatalError(err) => Err(ScanError::Decode(err)),
            DecodeOutcome::NotFound | DecodeOutcome::RecoverableFormatError(_) => {
                Err(ScanError::NotFound)
            }
        }
    }
}

/// Adaptive downsampling decoder for still images
pub struct FileDecoder<R = QrReader> {
    config: ScanConfig,
    decoder: SingleShotDecoder<R>,
}

impl FileDecoder<QrReader> {
    /// Decoder backed by the bundled QR reader
    pub fn new(config: ScanConfig) -> Self {
        Self::with_reader(config, QrReader::new())
    }
}

impl<R: SymbolReader> FileDecoder<R> {
    /// Decoder backed by a caller-supplied reader
    pub fn with_reader(config: ScanConfig, reader: R) -> Self {
        let decoder = SingleShotDecoder::new(reader, config.hints);
        Self { config, decoder }
    }

    /// Active tuning
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan an image file
    pub fn decode_file(&mut self, path: impl AsRef<Path>) -> FileScan {
        let path = path.as_ref();
        let scan = self.scan(&FileImage::new(path));
        info!(
            "{}: {} after {} attempt(s)",
            path.display(),
            describe(&scan.outcome),
            scan.attempts
        );
        scan
    }

    /// Scan any image source, coarsening the sample factor on every miss
    pub fn scan<S: ImageSource + ?Sized>(&mut self, source: &S) -> FileScan {
        let (width, height) = match source.probe() {
            Ok(dims) => dims,
            Err(err) => return FileScan::finish(DecodeOutcome::FatalError(err), Vec::new()),
        };

        let mut pool = BufferPool::new();
        let mut factor = initial_sample_factor(width, height, self.config.reference_bound);
        let mut sample_factors = Vec::with_capacity(self.config.max_attempts);

        for attempt in 1..=self.config.max_attempts {
            sample_factors.push(factor);
            let outcome = self.attempt(source, factor, width, &mut pool);
            debug!(
                "attempt {attempt}/{} at 1/{factor} of {width}x{height}: {}",
                self.config.max_attempts,
                describe(&outcome)
            );
            if !outcome.is_recoverable() {
                return FileScan::finish(outcome, sample_factors);
            }
            factor = factor.saturating_mul(2);
        }

        FileScan::finish(DecodeOutcome::NotFound, sample_factors)
    }

    fn attempt<S: ImageSource + ?Sized>(
        &mut self,
        source: &S,
        factor: u32,
        full_width: u32,
        pool: &mut BufferPool,
    ) -> DecodeOutcome {
        let raster = match source.materialize(factor) {
            Ok(raster) => raster,
            Err(err) => return DecodeOutcome::FatalError(err),
        };
        let (w, h) = raster.dimensions();
        let bitmap = match rgb_to_bitmap(
            raster.as_raw(),
            w as usize,
            h as usize,
            pool,
            self.config.binarizer,
        ) {
            Ok(bitmap) => bitmap,
            Err(err) => return DecodeOutcome::FatalError(err),
        };
        drop(raster);

        match self.decoder.decode(&bitmap) {
            DecodeOutcome::Decoded(mut decoded) => {
                // Report corners in full-resolution coordinates
                let scale = full_width as f32 / w as f32;
                decoded.metadata.corners = decoded.metadata.corners.map(|p| p.scale(scale));
                DecodeOutcome::Decoded(decoded)
            }
            other => other,
        }
    }
}

fn describe(outcome: &DecodeOutcome) -> String {
    match outcome {
        DecodeOutcome::Decoded(d) => format!("decoded {} byte(s)", d.bytes.len()),
        DecodeOutcome::NotFound => "not found".to_string(),
        DecodeOutcome::RecoverableFormatError(fault) => format!("unreadable ({fault:?})"),
        DecodeOutcome::FatalError(err) => format!("fatal: {err}"),
    }
}
