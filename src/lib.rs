//! sealed_qr - encrypted row tokens carried in QR codes
//!
//! Turns spreadsheet rows into scannable symbols and reads them back:
//!
//! ```text
//! RowRecord -> TokenCodec::issue -> OpticalEncoder::encode -> PNG / SVG
//! camera frame -> ScanSession -> OpticalPayload -> TokenCodec::verify -> RowRecord
//! ```
//!
//! Tokens are JWE compact strings (`dir` + `A256GCM`) with `exp`/`iat`
//! claims; symbols are QR Model 2, versions 1-40.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Paced bulk export to an artifact sink
pub mod batch;
/// Environment-driven pipeline configuration
pub mod config;
/// QR symbol machinery (error correction, format/version info, data modes, decoding)
pub mod decoder;
/// Symbol location in camera frames and the default frame decoder
pub mod detector;
/// QR symbol generation and rendering
pub mod encoder;
/// Crate-wide error re-exports
pub mod error;
/// Core data structures (BitMatrix, RowRecord, Frame, OpticalSymbol, etc.)
pub mod models;
/// Payload forms carried by a symbol
pub mod payload;
/// Camera scan sessions
pub mod scanner;
/// Sealed row tokens
pub mod token;
/// Image helpers (grayscale, binarization)
pub mod utils;

pub use batch::{
    Artifact, ArtifactFormat, ArtifactSink, BatchOptions, BatchOrchestrator, BatchResult,
    ItemFailure, MemorySink,
};
pub use config::PipelineConfig;
pub use decoder::{DecodedSymbol, decode_matrix};
pub use detector::{DecodeOptions, RasterDecoder};
pub use encoder::{EcPreset, EncodeOptions, OpticalEncoder, RenderOptions};
pub use error::{
    BatchError, CameraError, ConfigError, DeliveryError, EncodeError, ItemError, RenderError,
    TokenError,
};
pub use models::{BitMatrix, ECLevel, Frame, MaskPattern, OpticalSymbol, PixelFormat, RowRecord, Version};
pub use payload::{OpticalPayload, PayloadFormat};
pub use scanner::{
    CaptureDevice, Facing, FrameDecoder, FrameSource, ScanOptions, ScanOutcome, ScanSession,
    ScanState, StopHandle,
};
pub use token::{Claims, SecretKey, TokenCodec, TtlSpec};

/// Decode the first symbol in an RGB image
///
/// # Arguments
/// * `image` - Raw RGB bytes (3 bytes per pixel)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// Light-on-dark symbols are tried too. Returns `None` when nothing decodes.
pub fn decode_rgb(image: &[u8], width: usize, height: usize) -> Option<String> {
    let frame = Frame::new(width, height, PixelFormat::Rgb, image.to_vec());
    RasterDecoder::new().decode(&frame, DecodeOptions { try_inverted: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rgb_blank() {
        let image = vec![255u8; 30 * 30 * 3];
        assert!(decode_rgb(&image, 30, 30).is_none());
    }

    #[test]
    fn test_decode_rgb_rendered_symbol() {
        let symbol = OpticalEncoder::default().encode("ROW 42", ECLevel::M, 3).unwrap();
        let image = symbol.to_image(&RenderOptions::default());
        let (w, h) = image.dimensions();
        let decoded = decode_rgb(image.as_raw(), w as usize, h as usize);
        assert_eq!(decoded.as_deref(), Some("ROW 42"));
    }
}
