//! Numeric mode: digit groups of 3/2/1 in 10/7/4 bits

use super::{push_bits, read_bits};

/// Packs digits into numeric segments
pub struct NumericEncoder;

impl NumericEncoder {
    /// Non-empty and digits only
    pub fn accepts(text: &str) -> bool {
        text.bytes().all(|b| b.is_ascii_digit())
    }

    /// Append the digit groups of `text` (caller checked `accepts`)
    pub fn encode(text: &str, bits: &mut Vec<bool>) {
        for chunk in text.as_bytes().chunks(3) {
            let value = chunk
                .iter()
                .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'));
            let width = match chunk.len() {
                3 => 10,
                2 => 7,
                _ => 4,
            };
            push_bits(bits, value, width);
        }
    }
}

/// Reads numeric segments
pub struct NumericDecoder;

impl NumericDecoder {
    /// Read `character_count` digits; returns (digits, bits_consumed)
    pub fn decode(bits: &[bool], character_count: usize) -> Option<(String, usize)> {
        let mut digits = String::with_capacity(character_count);
        let mut at = 0;
        let mut remaining = character_count;

        while remaining > 0 {
            let group = remaining.min(3);
            let width = [0, 4, 7, 10][group];
            let value = read_bits(bits, at, width)?;
            if value >= 10u32.pow(group as u32) {
                return None;
            }
            digits.push_str(&format!("{value:0group$}"));
            at += width;
            remaining -= group;
        }

        Some((digits, at))
    }
}
