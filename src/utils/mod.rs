//! Image helpers for reading symbols out of camera frames
//!
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Binarization (Otsu's method and threshold-based)

/// Otsu and fixed thresholds
pub mod binarization;
/// Luminance conversion
pub mod grayscale;
