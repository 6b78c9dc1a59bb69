//! Utility functions for image processing
//!
//! This module provides the pixel-level helpers behind the luminance bridge:
//! - Luminance conversion (RGB to Y)
//! - Binarization (Otsu, adaptive, hybrid)
//! - Memory pools (buffer reuse across retries)

pub mod binarization;
pub mod grayscale;
pub mod memory_pool;
