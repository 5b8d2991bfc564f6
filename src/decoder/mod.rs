//! QR symbol machinery shared by the encoder and the decoder
//!
//! - Error correction (Reed-Solomon, BCH)
//! - Format and version information
//! - Data modes (numeric, alphanumeric, byte)
//! - Codeword placement order and masking
//! - Symbol decoding from a sampled module grid

/// BCH error correction for format and version info
pub mod bch;
/// Codeword placement order inside the matrix
pub mod bitstream;
/// Format information (mask pattern, EC level)
pub mod format;
/// Function module mask builder (finder/timing/format/alignment/version)
pub mod function_mask;
/// Data mask application
pub mod mask;
/// Data mode encoders and decoders
pub mod modes;
/// Symbol decoder
pub mod qr_decoder;
/// Reed-Solomon error correction
pub mod reed_solomon;
/// QR specification tables (ECC codewords/blocks, capacities)
pub mod tables;
/// Version information (versions 7-40)
pub mod version;

pub use qr_decoder::{DecodedSymbol, QrDecoder, decode_matrix};
