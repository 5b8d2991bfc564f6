//! Alphanumeric mode: 45 symbols, pairs in 11 bits, a trailing single in 6

use super::{push_bits, read_bits};

const ALPHANUMERIC_TABLE: [char; 45] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
    'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', ' ', '$',
    '%', '*', '+', '-', '.', '/', ':',
];

fn char_value(c: char) -> Option<u32> {
    ALPHANUMERIC_TABLE
        .iter()
        .position(|&t| t == c)
        .map(|p| p as u32)
}

/// Packs text into alphanumeric segments
pub struct AlphanumericEncoder;

impl AlphanumericEncoder {
    /// Every character is in the 45-symbol set
    pub fn accepts(text: &str) -> bool {
        text.chars().all(|c| char_value(c).is_some())
    }

    /// Append pairs of characters (caller checked `accepts`)
    pub fn encode(text: &str, bits: &mut Vec<bool>) {
        let values: Vec<u32> = text.chars().filter_map(char_value).collect();
        for pair in values.chunks(2) {
            match pair {
                [a, b] => push_bits(bits, a * 45 + b, 11),
                [a] => push_bits(bits, *a, 6),
                _ => {}
            }
        }
    }
}

/// Reads alphanumeric segments
pub struct AlphanumericDecoder;

impl AlphanumericDecoder {
    /// Read `character_count` characters; returns (text, bits_consumed)
    pub fn decode(bits: &[bool], character_count: usize) -> Option<(String, usize)> {
        let mut text = String::with_capacity(character_count);
        let mut at = 0;

        for _ in 0..character_count / 2 {
            let value = read_bits(bits, at, 11)? as usize;
            text.push(*ALPHANUMERIC_TABLE.get(value / 45)?);
            text.push(ALPHANUMERIC_TABLE[value % 45]);
            at += 11;
        }
        if character_count % 2 == 1 {
            let value = read_bits(bits, at, 6)? as usize;
            text.push(*ALPHANUMERIC_TABLE.get(value)?);
            at += 6;
        }

        Some((text, at))
    }
}
