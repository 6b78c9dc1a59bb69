//! Luminance/binarization bridge
//!
//! Projects camera frames and decoded RGB images into a single luminance
//! channel and thresholds that into the [`BinaryBitmap`] the symbol reader
//! consumes. Everything here is a pure transform with no retained state.

use std::borrow::Cow;

use crate::error::DecodeError;
use crate::models::{BitMatrix, PixelFrame};
use crate::utils::binarization::Binarizer;
use crate::utils::grayscale::rgb_to_luma_into;
use crate::utils::memory_pool::BufferPool;

/// Read-only view of a luminance plane, optionally cropped and mirrored
#[derive(Debug, Clone, Copy)]
pub struct LuminanceView<'a> {
    data: &'a [u8],
    data_width: usize,
    data_height: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
    mirror: bool,
}

impl<'a> LuminanceView<'a> {
    /// View the whole `data_width x data_height` plane
    pub fn new(data: &'a [u8], data_width: usize, data_height: usize) -> Result<Self, DecodeError> {
        Self::with_crop(data, data_width, data_height, 0, 0, data_width, data_height, false)
    }

    /// View a crop rectangle of the plane, optionally mirrored horizontally
    #[allow(clippy::too_many_arguments)]
    pub fn with_crop(
        data: &'a [u8],
        data_width: usize,
        data_height: usize,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
        mirror: bool,
    ) -> Result<Self, DecodeError> {
        let fits = left + width <= data_width
            && top + height <= data_height
            && data.len() >= data_width * data_height;
        if !fits {
            return Err(DecodeError::InvalidCrop {
                left,
                top,
                width,
                height,
                data_width,
                data_height,
            });
        }
        Ok(Self {
            data,
            data_width,
            data_height,
            left,
            top,
            width,
            height,
            mirror,
        })
    }

    /// View the luminance plane of a camera frame directly (no RGB round trip)
    pub fn from_frame(frame: &'a PixelFrame) -> Self {
        Self {
            data: frame.luma_plane(),
            data_width: frame.width(),
            data_height: frame.height(),
            left: 0,
            top: 0,
            width: frame.width(),
            height: frame.height(),
            mirror: false,
        }
    }

    /// Narrow the view further; coordinates are relative to this view
    pub fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Result<Self, DecodeError> {
        if left + width > self.width || top + height > self.height {
            return Err(DecodeError::InvalidCrop {
                left,
                top,
                width,
                height,
                data_width: self.width,
                data_height: self.height,
            });
        }
        let left = if self.mirror {
            self.left + self.width - left - width
        } else {
            self.left + left
        };
        Ok(Self {
            left,
            top: self.top + top,
            width,
            height,
            ..*self
        })
    }

    /// Visible width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Visible height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Luminance at (x, y) in view coordinates
    pub fn get(&self, x: usize, y: usize) -> u8 {
        let sx = if self.mirror {
            self.left + self.width - 1 - x
        } else {
            self.left + x
        };
        self.data[(self.top + y) * self.data_width + sx]
    }

    /// Copy row `y` of the view into `out`
    pub fn row(&self, y: usize, out: &mut [u8]) {
        let start = (self.top + y) * self.data_width + self.left;
        let src = &self.data[start..start + self.width];
        out[..self.width].copy_from_slice(src);
        if self.mirror {
            out[..self.width].reverse();
        }
    }

    /// The visible pixels as one contiguous buffer, borrowed when possible
    pub fn matrix(&self) -> Cow<'a, [u8]> {
        let full = self.left == 0
            && self.top == 0
            && self.width == self.data_width
            && self.height == self.data_height;
        if full && !self.mirror {
            return Cow::Borrowed(&self.data[..self.width * self.height]);
        }
        let mut out = vec![0u8; self.width * self.height];
        for y in 0..self.height {
            self.row(y, &mut out[y * self.width..(y + 1) * self.width]);
        }
        Cow::Owned(out)
    }
}

/// Two-tone bitmap handed to the symbol reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBitmap {
    matrix: BitMatrix,
}

impl BinaryBitmap {
    /// Threshold a luminance view
    pub fn from_luminance(view: &LuminanceView<'_>, binarizer: Binarizer) -> Self {
        let pixels = view.matrix();
        Self {
            matrix: binarizer.binarize(&pixels, view.width(), view.height()),
        }
    }

    /// Wrap an already binarized matrix
    pub fn from_matrix(matrix: BitMatrix) -> Self {
        Self { matrix }
    }

    /// Bitmap width
    pub fn width(&self) -> usize {
        self.matrix.width()
    }

    /// Bitmap height
    pub fn height(&self) -> usize {
        self.matrix.height()
    }

    /// Whether (x, y) is dark
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.matrix.get(x, y)
    }

    /// Underlying bit matrix
    pub fn matrix(&self) -> &BitMatrix {
        &self.matrix
    }

    /// A copy with light and dark swapped
    pub fn inverted(&self) -> Self {
        let mut matrix = self.matrix.clone();
        matrix.invert();
        Self { matrix }
    }
}

/// Bridge a camera frame to a binarized bitmap
pub fn frame_to_bitmap(frame: &PixelFrame, binarizer: Binarizer) -> BinaryBitmap {
    BinaryBitmap::from_luminance(&LuminanceView::from_frame(frame), binarizer)
}

/// Bridge decoded RGB pixels to a binarized bitmap, converting into the
/// pool's luminance buffer
pub fn rgb_to_bitmap(
    rgb: &[u8],
    width: usize,
    height: usize,
    pool: &mut BufferPool,
    binarizer: Binarizer,
) -> Result<BinaryBitmap, DecodeError> {
    let expected = width * height * 3;
    if rgb.len() < expected {
        return Err(DecodeError::InvalidFrame {
            width,
            height,
            expected,
            actual: rgb.len(),
        });
    }
    let luma = pool.luma_buffer(width * height);
    rgb_to_luma_into(rgb, width, height, luma);
    let view = LuminanceView::new(luma, width, height)?;
    Ok(BinaryBitmap::from_luminance(&view, binarizer))
}
