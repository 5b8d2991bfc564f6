//! QR Model 2 symbol generation
//!
//! Pipeline: mode selection -> version selection -> data codewords ->
//! RS ECC + interleaving -> function patterns -> zig-zag placement ->
//! mask selection -> format info.

/// Mask penalty scoring and selection
pub mod mask;
/// Function patterns and block interleaving
pub mod placement;
/// PNG / SVG output
pub mod render;
/// Data codewords for a single segment
pub mod segment;

use thiserror::Error;

use crate::decoder::bitstream::BitstreamExtractor;
use crate::decoder::function_mask::FunctionMask;
use crate::decoder::modes::Mode;
use crate::decoder::tables::capacity;
use crate::models::{BitMatrix, ECLevel, OpticalSymbol, Version};

pub use render::{RenderError, RenderOptions};

/// Why a payload could not be turned into a symbol
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// No version in range holds the payload
    #[error(
        "payload of {len} characters exceeds capacity {capacity} at level {ec_level} (max version {max_version})"
    )]
    PayloadTooLarge {
        /// Payload length in characters
        len: usize,
        /// Largest payload of the same mode that fits
        capacity: usize,
        /// Level the payload was encoded at
        ec_level: ECLevel,
        /// Largest version tried
        max_version: u8,
    },
    /// Zero pixels per module
    #[error("scale must be at least one pixel per module")]
    InvalidScale,
    /// `min` is above `max`
    #[error("version range {min}..={max} is empty")]
    InvalidVersionRange {
        /// Requested minimum version
        min: u8,
        /// Requested maximum version
        max: u8,
    },
}

/// Named error correction choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcPreset {
    /// Printed/exported codes: level H
    BulkExport,
    /// On-screen preview: level M
    Preview,
}

impl EcPreset {
    /// Level used for this preset
    pub fn ec_level(&self) -> ECLevel {
        match self {
            EcPreset::BulkExport => ECLevel::H,
            EcPreset::Preview => ECLevel::M,
        }
    }
}

impl From<EcPreset> for ECLevel {
    fn from(preset: EcPreset) -> Self {
        preset.ec_level()
    }
}

/// Version bounds and quiet zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Smallest version tried
    pub min_version: Version,
    /// Largest version tried
    pub max_version: Version,
    /// Quiet zone in modules used by [`OpticalEncoder::render_options`]
    pub quiet_zone: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            min_version: Version::MIN,
            max_version: Version::MAX,
            quiet_zone: 4,
        }
    }
}

/// Deterministic text -> symbol encoder
#[derive(Debug, Clone, Default)]
pub struct OpticalEncoder {
    options: EncodeOptions,
}

impl OpticalEncoder {
    /// Encoder with the given bounds
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Bounds in use
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Render options carrying this encoder's quiet zone and the default colours
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::default().with_quiet_zone(self.options.quiet_zone)
    }

    /// Encode `data` at `ec_level`, choosing the smallest version that fits
    pub fn encode(
        &self,
        data: &str,
        ec_level: ECLevel,
        scale: u32,
    ) -> Result<OpticalSymbol, EncodeError> {
        if scale == 0 {
            return Err(EncodeError::InvalidScale);
        }
        let EncodeOptions {
            min_version,
            max_version,
            ..
        } = self.options;
        if min_version > max_version {
            return Err(EncodeError::InvalidVersionRange {
                min: min_version.number(),
                max: max_version.number(),
            });
        }

        let mode = Mode::for_text(data);
        let len = mode.char_count(data);
        let version = (min_version.number()..=max_version.number())
            .filter_map(Version::new)
            .find(|&v| capacity(v, ec_level, mode) >= len)
            .ok_or(EncodeError::PayloadTooLarge {
                len,
                capacity: capacity(max_version, ec_level, mode),
                ec_level,
                max_version: max_version.number(),
            })?;

        let codewords = segment::data_codewords(data, mode, version, ec_level);
        let stream = placement::interleave_with_ecc(&codewords, version, ec_level);

        let func = FunctionMask::new(version);
        let mut modules = BitMatrix::square(version.size());
        placement::draw_function_patterns(&mut modules, version);
        BitstreamExtractor::place(&mut modules, &func, &stream);

        let (mask_pattern, modules) = mask::select_mask(&modules, &func, ec_level);

        tracing::debug!(
            version = version.number(),
            %ec_level,
            mode = ?mode,
            mask = mask_pattern.bits(),
            "symbol encoded"
        );

        Ok(OpticalSymbol {
            modules,
            version,
            ec_level,
            mask_pattern,
            scale,
        })
    }
}
