use crate::models::BitMatrix;

/// Images with both sides at least this long use local (adaptive) thresholds
/// under [`Binarizer::Hybrid`]; anything smaller has too few pixels for a
/// meaningful neighbourhood
pub const ADAPTIVE_MIN_SIDE: usize = 40;

/// Half-width of the adaptive threshold window (31x31 block)
const ADAPTIVE_RADIUS: usize = 15;

/// A pixel must be this much darker than its neighbourhood mean to be black
const ADAPTIVE_OFFSET: u64 = 7;

/// Windows with a standard deviation below this are treated as flat and
/// fall back to the global threshold
const FLAT_WINDOW_STDDEV: u64 = 8;

/// Thresholding policy used to turn luminance into a two-tone bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binarizer {
    /// Single global threshold chosen with Otsu's method
    Otsu,
    /// Per-pixel threshold from the local neighbourhood mean
    Adaptive,
    /// Adaptive unless the image is too small for local windows, then Otsu
    #[default]
    Hybrid,
}

impl Binarizer {
    /// Binarize a contiguous `width * height` luminance buffer
    pub fn binarize(&self, gray: &[u8], width: usize, height: usize) -> BitMatrix {
        match self {
            Binarizer::Otsu => otsu_binarize(gray, width, height),
            Binarizer::Adaptive => adaptive_binarize(gray, width, height),
            Binarizer::Hybrid => {
                if width >= ADAPTIVE_MIN_SIDE && height >= ADAPTIVE_MIN_SIDE {
                    adaptive_binarize(gray, width, height)
                } else {
                    otsu_binarize(gray, width, height)
                }
            }
        }
    }

    /// Parse a policy name (`otsu`, `adaptive`, `hybrid`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "otsu" => Some(Binarizer::Otsu),
            "adaptive" => Some(Binarizer::Adaptive),
            "hybrid" => Some(Binarizer::Hybrid),
            _ => None,
        }
    }
}

/// Convert luminance to binary using Otsu's thresholding method
/// Returns a BitMatrix where true = black, false = white
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let threshold = calculate_otsu_threshold(&gray[..width * height]);
    threshold_binarize(gray, width, height, threshold)
}

/// Calculate Otsu's optimal threshold
///
/// Pixels strictly below the returned value are black. A flat image yields
/// 0, so it binarizes to all white.
fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut below_count = 0.0f64;
    let mut below_sum = 0.0f64;
    let mut max_variance = 0.0f64;
    let mut optimal_threshold = 0u8;

    // Candidate t puts levels [0, t) in the dark class
    for t in 1..=255usize {
        below_count += histogram[t - 1] as f64;
        below_sum += (t - 1) as f64 * histogram[t - 1] as f64;

        let above_count = total - below_count;
        if below_count == 0.0 || above_count == 0.0 {
            continue;
        }

        let mean_below = below_sum / below_count;
        let mean_above = (total_sum - below_sum) / above_count;
        let variance = below_count * above_count * (mean_below - mean_above).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = t as u8;
        }
    }

    optimal_threshold
}

/// Local-mean binarization over an integral image
///
/// Flat windows (little local contrast) use the global Otsu threshold
/// instead, so large uniform areas neither speckle nor hollow out.
pub fn adaptive_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);
    if width == 0 || height == 0 {
        return binary;
    }
    let gray = &gray[..width * height];
    let global = calculate_otsu_threshold(gray);

    // (width + 1) x (height + 1) summed-area tables, zero first row/column
    let stride = width + 1;
    let mut sums = vec![0u64; stride * (height + 1)];
    let mut squares = vec![0u64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0u64;
        let mut row_sq = 0u64;
        for x in 0..width {
            let v = gray[y * width + x] as u64;
            row_sum += v;
            row_sq += v * v;
            sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            squares[(y + 1) * stride + x + 1] = squares[y * stride + x + 1] + row_sq;
        }
    }

    let area = |table: &[u64], x0: usize, y0: usize, x1: usize, y1: usize| -> u64 {
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0]
    };

    for y in 0..height {
        let y0 = y.saturating_sub(ADAPTIVE_RADIUS);
        let y1 = (y + ADAPTIVE_RADIUS + 1).min(height);
        for x in 0..width {
            let x0 = x.saturating_sub(ADAPTIVE_RADIUS);
            let x1 = (x + ADAPTIVE_RADIUS + 1).min(width);
            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let sum = area(&sums, x0, y0, x1, y1);
            let sq = area(&squares, x0, y0, x1, y1);

            let pixel = gray[y * width + x] as u64;
            // variance * count^2 = count * sq - sum^2
            let spread = (count * sq).saturating_sub(sum * sum);
            let flat = spread < FLAT_WINDOW_STDDEV * FLAT_WINDOW_STDDEV * count * count;

            let is_black = if flat {
                pixel < global as u64
            } else {
                pixel * count + ADAPTIVE_OFFSET * count < sum
            };
            if is_black {
                binary.set(x, y, true);
            }
        }
    }

    binary
}

/// Simple global threshold binarization
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);

    for y in 0..height {
        for x in 0..width {
            if gray[y * width + x] < threshold {
                binary.set(x, y, true);
            }
        }
    }

    binary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarize() {
        let gray = vec![100, 150, 200, 50]; // 2x2 image
        let binary = threshold_binarize(&gray, 2, 2, 128);

        // Pixels < 128 should be black (true)
        assert!(binary.get(0, 0)); // 100 < 128
        assert!(!binary.get(1, 0)); // 150 >= 128
        assert!(!binary.get(0, 1)); // 200 >= 128
        assert!(binary.get(1, 1)); // 50 < 128
    }

    #[test]
    fn test_otsu_binarize() {
        // Create a simple two-class image
        let mut gray = vec![50u8; 50]; // Dark class
        gray.extend(vec![200u8; 50]); // Light class

        let binary = otsu_binarize(&gray, 10, 10);

        // Top half should be black (true), bottom half white (false)
        assert!(binary.get(0, 0));
        assert!(!binary.get(0, 7));
    }

    #[test]
    fn test_flat_image_is_all_white() {
        for level in [0u8, 90, 255] {
            let gray = vec![level; 64];
            assert_eq!(otsu_binarize(&gray, 8, 8).count_dark(), 0);
            assert_eq!(adaptive_binarize(&gray, 8, 8).count_dark(), 0);
        }
    }

    #[test]
    fn test_adaptive_handles_gradient_lighting() {
        // Dark squares on a background that brightens left to right; the
        // left-hand square is lighter than the right-hand background.
        let (w, h) = (120usize, 40usize);
        let mut gray = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let background = 60 + (x * 190 / w) as u8;
                let in_square = (10..30).contains(&y) && ((10..30).contains(&x) || (90..110).contains(&x));
                gray[y * w + x] = if in_square { background / 3 } else { background };
            }
        }

        let binary = adaptive_binarize(&gray, w, h);
        assert!(binary.get(20, 20));
        assert!(binary.get(100, 20));
        assert!(!binary.get(60, 5));
    }

    #[test]
    fn test_hybrid_selects_by_size() {
        assert_eq!(Binarizer::from_name("Adaptive"), Some(Binarizer::Adaptive));
        assert_eq!(Binarizer::from_name("nope"), None);

        let mut gray = vec![40u8; 16];
        gray.extend(vec![220u8; 16]);
        let hybrid = Binarizer::Hybrid.binarize(&gray, 4, 8);
        let otsu = Binarizer::Otsu.binarize(&gray, 4, 8);
        assert_eq!(hybrid, otsu);
    }

    #[test]
    fn test_hybrid_is_adaptive_on_camera_sized_images() {
        // Left-to-right light falloff over alternating 8px bars; the dark
        // bar at x=12 is brighter than the light bar at x=52
        let (w, h) = (64usize, 48usize);
        let gray: Vec<u8> = (0..w * h)
            .map(|i| {
                let x = i % w;
                let light = 250 - (x * 200 / w) as u8;
                if (x / 8) % 2 == 1 { light / 2 } else { light }
            })
            .collect();

        let hybrid = Binarizer::Hybrid.binarize(&gray, w, h);
        assert_eq!(hybrid, adaptive_binarize(&gray, w, h));
        assert!(hybrid.get(12, 24));
        assert!(!hybrid.get(52, 24));
        assert_ne!(hybrid, otsu_binarize(&gray, w, h));
    }
}
