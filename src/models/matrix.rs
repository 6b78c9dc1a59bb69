/// Compact bit matrix used for binarized bitmaps and encoder module grids.
///
/// `true` means dark (a black pixel or a dark module).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create an all-light matrix with the given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y); out-of-bounds reads are light
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Set bit at (x, y); out-of-bounds writes are ignored
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let mask = 1 << (index % 8);
        if value {
            self.data[index / 8] |= mask;
        } else {
            self.data[index / 8] &= !mask;
        }
    }

    /// Set every bit inside the rectangle `[left, left + w) x [top, top + h)`
    pub fn set_region(&mut self, left: usize, top: usize, w: usize, h: usize) {
        let right = (left + w).min(self.width);
        let bottom = (top + h).min(self.height);
        for y in top..bottom {
            for x in left..right {
                self.set(x, y, true);
            }
        }
    }

    /// Invert every bit (dark becomes light and vice versa)
    pub fn invert(&mut self) {
        for byte in &mut self.data {
            *byte = !*byte;
        }
        // Keep the padding bits of the last byte clear so equality stays meaningful.
        let used = self.width * self.height;
        if used % 8 != 0 {
            if let Some(last) = self.data.last_mut() {
                *last &= (1u8 << (used % 8)) - 1;
            }
        }
    }

    /// Count dark bits
    pub fn count_dark(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Clear all bits to light
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
