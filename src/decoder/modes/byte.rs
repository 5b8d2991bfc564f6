//! Byte mode: 8 bits per byte of UTF-8

use super::{push_bits, read_bits};

/// Packs text into byte segments
pub struct ByteEncoder;

impl ByteEncoder {
    /// Append the UTF-8 bytes of `text`
    pub fn encode(text: &str, bits: &mut Vec<bool>) {
        for &byte in text.as_bytes() {
            push_bits(bits, u32::from(byte), 8);
        }
    }
}

/// Reads byte segments
pub struct ByteDecoder;

impl ByteDecoder {
    /// Read `character_count` raw bytes; returns (bytes, bits_consumed)
    pub fn decode(bits: &[bool], character_count: usize) -> Option<(Vec<u8>, usize)> {
        let bytes = (0..character_count)
            .map(|i| read_bits(bits, i * 8, 8).map(|b| b as u8))
            .collect::<Option<Vec<u8>>>()?;
        Some((bytes, character_count * 8))
    }
}
