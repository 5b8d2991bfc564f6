//! QR code data modes
//!
//! Each mode has an encoder (used by the symbol generator) and a decoder
//! (used when reading a sampled symbol back):
//! - Numeric: Efficient encoding for digits (0-9)
//! - Alphanumeric: Upper-case letters, digits, and ` $%*+-./:`
//! - Byte: 8-bit data (UTF-8 here)

use crate::models::Version;

/// Alphanumeric mode
pub mod alphanumeric;
/// Byte mode
pub mod byte;
/// Numeric mode
pub mod numeric;

/// Segment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Digits only, 3 per 10 bits
    Numeric,
    /// 45-character set, 2 per 11 bits
    Alphanumeric,
    /// Raw bytes, 8 bits each
    Byte,
}

impl Mode {
    /// 4-bit mode indicator
    pub fn indicator(&self) -> u32 {
        match self {
            Mode::Numeric => 0b0001,
            Mode::Alphanumeric => 0b0010,
            Mode::Byte => 0b0100,
        }
    }

    /// Width of the character count field for a version
    pub fn char_count_bits(&self, version: Version) -> usize {
        let ver = version.number();
        let class = if ver <= 9 {
            0
        } else if ver <= 26 {
            1
        } else {
            2
        };
        match self {
            Mode::Numeric => [10, 12, 14][class],
            Mode::Alphanumeric => [9, 11, 13][class],
            Mode::Byte => [8, 16, 16][class],
        }
    }

    /// Bits needed for `count` characters (excluding header)
    pub fn payload_bits(&self, count: usize) -> usize {
        match self {
            Mode::Numeric => 10 * (count / 3) + [0, 4, 7][count % 3],
            Mode::Alphanumeric => 11 * (count / 2) + 6 * (count % 2),
            Mode::Byte => 8 * count,
        }
    }

    /// Most characters that fit into `bits` payload bits
    pub fn max_chars_in(&self, bits: usize) -> usize {
        match self {
            Mode::Numeric => {
                let rem = bits % 10;
                3 * (bits / 10) + if rem >= 7 { 2 } else if rem >= 4 { 1 } else { 0 }
            }
            Mode::Alphanumeric => 2 * (bits / 11) + usize::from(bits % 11 >= 6),
            Mode::Byte => bits / 8,
        }
    }

    /// Most compact mode able to carry the whole text
    pub fn for_text(text: &str) -> Self {
        if numeric::NumericEncoder::accepts(text) {
            Mode::Numeric
        } else if alphanumeric::AlphanumericEncoder::accepts(text) {
            Mode::Alphanumeric
        } else {
            Mode::Byte
        }
    }

    /// Number of characters the count field records for `text`
    pub fn char_count(&self, text: &str) -> usize {
        match self {
            Mode::Byte => text.len(),
            _ => text.chars().count(),
        }
    }
}

/// Append `count` low bits of `value`, most significant first
pub(crate) fn push_bits(bits: &mut Vec<bool>, value: u32, count: usize) {
    for i in (0..count).rev() {
        bits.push(((value >> i) & 1) != 0);
    }
}

/// Read `width` bits starting at `at`, most significant first
pub(crate) fn read_bits(bits: &[bool], at: usize, width: usize) -> Option<u32> {
    let field = bits.get(at..at.checked_add(width)?)?;
    Some(field.iter().fold(0, |acc, &b| (acc << 1) | u32::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        assert_eq!(Mode::for_text("0123456789"), Mode::Numeric);
        assert_eq!(Mode::for_text("HELLO WORLD"), Mode::Alphanumeric);
        assert_eq!(Mode::for_text("hello"), Mode::Byte);
        assert_eq!(Mode::for_text("eyJhbGciOiJkaXIifQ..abc"), Mode::Byte);
        assert_eq!(Mode::for_text(""), Mode::Numeric);
    }

    #[test]
    fn test_payload_bits_inverse_of_max_chars() {
        for mode in [Mode::Numeric, Mode::Alphanumeric, Mode::Byte] {
            for count in 0..50 {
                let bits = mode.payload_bits(count);
                assert_eq!(mode.max_chars_in(bits), count, "{mode:?} count {count}");
            }
        }
    }

    #[test]
    fn test_read_bits() {
        let mut bits = Vec::new();
        push_bits(&mut bits, 0b1011, 4);
        push_bits(&mut bits, 300, 9);
        assert_eq!(read_bits(&bits, 0, 4), Some(0b1011));
        assert_eq!(read_bits(&bits, 4, 9), Some(300));
        assert_eq!(read_bits(&bits, 10, 4), None);
    }

    #[test]
    fn test_char_count_bits() {
        let v = |n| Version::new(n).unwrap();
        assert_eq!(Mode::Byte.char_count_bits(v(9)), 8);
        assert_eq!(Mode::Byte.char_count_bits(v(10)), 16);
        assert_eq!(Mode::Numeric.char_count_bits(v(27)), 14);
        assert_eq!(Mode::Alphanumeric.char_count_bits(v(26)), 11);
    }
}
