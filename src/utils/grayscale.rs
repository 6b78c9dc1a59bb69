//! Convert RGB pixels to 8-bit luminance
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8

use rayon::prelude::*;

/// Coefficients for luminance conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Images smaller than this are converted on the calling thread
const PARALLEL_MIN_PIXELS: usize = 512 * 512;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Convert RGB image to luminance
pub fn rgb_to_luma(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    rgb_to_luma_into(rgb, width, height, &mut gray);
    gray
}

/// Convert RGB to luminance into a pre-allocated buffer (no allocation)
///
/// Large images are converted row-parallel on the rayon pool.
///
/// # Returns
/// Number of pixels written (width * height)
pub fn rgb_to_luma_into(rgb: &[u8], width: usize, height: usize, output: &mut [u8]) -> usize {
    let pixel_count = width * height;
    debug_assert!(rgb.len() >= pixel_count * 3, "RGB buffer too small");
    debug_assert!(output.len() >= pixel_count, "Output buffer too small");
    if width == 0 {
        return 0;
    }

    let out = &mut output[..pixel_count];
    if pixel_count >= PARALLEL_MIN_PIXELS {
        out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            let src = &rgb[y * width * 3..(y + 1) * width * 3];
            for (dst, px) in row.iter_mut().zip(src.chunks_exact(3)) {
                *dst = luma(px[0], px[1], px[2]);
            }
        });
    } else {
        for (dst, px) in out.iter_mut().zip(rgb.chunks_exact(3)) {
            *dst = luma(px[0], px[1], px[2]);
        }
    }

    pixel_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_luma() {
        // Pure white
        let gray = rgb_to_luma(&[255, 255, 255], 1, 1);
        assert!(gray[0] >= 254);

        // Pure black
        let gray = rgb_to_luma(&[0, 0, 0], 1, 1);
        assert_eq!(gray[0], 0);

        // Pure red
        let gray = rgb_to_luma(&[255, 0, 0], 1, 1);
        assert!(gray[0] > 0 && gray[0] < 255);

        // Green dominates
        let gray = rgb_to_luma(&[0, 255, 0], 1, 1);
        assert!(gray[0] > 100);

        // 2x2 image
        let img = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        assert_eq!(rgb_to_luma(&img, 2, 2).len(), 4);
    }

    #[test]
    fn test_parallel_path_matches_scalar() {
        let width = 700;
        let height = 400;
        let rgb: Vec<u8> = (0..width * height * 3).map(|i| (i % 251) as u8).collect();

        let parallel = rgb_to_luma(&rgb, width, height);
        let scalar: Vec<u8> = rgb
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect();

        assert_eq!(parallel, scalar);
    }

    #[test]
    fn test_into_larger_buffer_writes_prefix() {
        let mut out = vec![9u8; 10];
        let written = rgb_to_luma_into(&[0, 0, 0, 0, 0, 0], 2, 1, &mut out);
        assert_eq!(written, 2);
        assert_eq!(&out[..3], &[0, 0, 9]);
    }
}
