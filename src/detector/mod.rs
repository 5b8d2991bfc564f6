//! Locating and reading symbols in camera frames
//!
//! - Finder pattern detection (the three square markers)
//! - Symbol geometry from a finder triple and module sampling
//! - [`RasterDecoder`]: frame -> text, the default frame decoder

/// Finder pattern scanning and cross-checks
pub mod finder;
/// Finder grouping and module-centre sampling
pub mod locate;

use crate::decoder::decode_matrix;
use crate::models::{BitMatrix, Frame};
use crate::utils::binarization::otsu_binarize;
use crate::utils::grayscale::to_grayscale;

/// Per-frame decoding switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Also try the inverted raster (light modules on a dark background)
    pub try_inverted: bool,
}

/// Reads one symbol from a frame, in any of the four orientations
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl RasterDecoder {
    /// Decoder with no state
    pub fn new() -> Self {
        Self
    }

    /// Decoded text, or `None` on a miss
    pub fn decode(&self, frame: &Frame, options: DecodeOptions) -> Option<String> {
        if !frame.is_complete() {
            tracing::debug!(width = frame.width, height = frame.height, "incomplete frame");
            return None;
        }
        let gray = to_grayscale(&frame.data, frame.width, frame.height, frame.format.channels())?;
        let binary = otsu_binarize(&gray, frame.width, frame.height);

        if let Some(text) = Self::decode_binary(&binary) {
            return Some(text);
        }
        if options.try_inverted {
            return Self::decode_binary(&binary.inverted());
        }
        None
    }

    /// Decode a binarized image (true = dark pixel)
    pub fn decode_binary(binary: &BitMatrix) -> Option<String> {
        locate::locate(binary).iter().find_map(|region| {
            let grid = locate::sample(binary, region);
            let symbol = decode_matrix(&grid)?;
            tracing::debug!(
                version = symbol.version.number(),
                ec_level = %symbol.ec_level,
                "symbol decoded"
            );
            Some(symbol.content)
        })
    }
}
