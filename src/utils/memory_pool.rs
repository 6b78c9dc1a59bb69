//! Reusable luminance buffer for the adaptive file decoder
//!
//! Each retry materializes the image at a coarser resolution, so the buffer
//! allocated for the first attempt is large enough for every later one.

/// A grow-only luminance buffer that hands out exactly-sized slices
#[derive(Debug, Default)]
pub struct BufferPool {
    luma_buffer: Vec<u8>,
    stats: AllocationStats,
}

impl BufferPool {
    /// Create an empty pool; the first request allocates
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with pre-reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            luma_buffer: Vec::with_capacity(capacity),
            stats: AllocationStats::default(),
        }
    }

    /// Get a luminance buffer of exactly `size` bytes, reusing capacity
    pub fn luma_buffer(&mut self, size: usize) -> &mut [u8] {
        if size > self.luma_buffer.capacity() {
            self.stats.allocations += 1;
        } else {
            self.stats.reuses += 1;
            self.stats.bytes_reused += size;
        }
        self.luma_buffer.resize(size, 0);
        &mut self.luma_buffer[..size]
    }

    /// Current buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        self.luma_buffer.capacity()
    }

    /// Allocation/reuse counters
    pub fn stats(&self) -> &AllocationStats {
        &self.stats
    }

    /// Reset the length but keep capacity
    pub fn clear(&mut self) {
        self.luma_buffer.clear();
    }
}

/// Statistics for monitoring allocation patterns
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocationStats {
    /// Requests that needed a larger buffer
    pub allocations: usize,
    /// Requests served from existing capacity
    pub reuses: usize,
    /// Total bytes served without allocating
    pub bytes_reused: usize,
}
