/// Format information: EC level and mask pattern, stored twice per symbol
use crate::decoder::bch::Bch;
use crate::models::{BitMatrix, ECLevel, MaskPattern};

/// Format info is 15 bits (5 data + 10 ECC), XOR-masked with 0x5412
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Error correction level
    pub ec_level: ECLevel,
    /// Data mask
    pub mask_pattern: MaskPattern,
}

/// Module coordinates (x, y) of each format bit, first copy
fn first_copy_position(i: usize) -> (usize, usize) {
    match i {
        0..=5 => (8, i),
        6 => (8, 7),
        7 => (8, 8),
        8 => (7, 8),
        _ => (14 - i, 8),
    }
}

/// Module coordinates (x, y) of each format bit, second copy
fn second_copy_position(i: usize, size: usize) -> (usize, usize) {
    if i < 8 {
        (size - 1 - i, 8)
    } else {
        (8, size - 15 + i)
    }
}

impl FormatInfo {
    /// Pair a level with a mask
    pub fn new(ec_level: ECLevel, mask_pattern: MaskPattern) -> Self {
        Self {
            ec_level,
            mask_pattern,
        }
    }

    /// Masked 15-bit word for this format
    pub fn word(&self) -> u16 {
        Bch::encode_format((self.ec_level.format_bits() << 3) | self.mask_pattern.bits())
    }

    /// Extract format info from a symbol matrix
    ///
    /// Tries the copy around the top-left finder first, then the split copy
    /// along the other two finders.
    pub fn extract(matrix: &BitMatrix) -> Option<Self> {
        let size = matrix.width();
        if size < 21 {
            return None;
        }

        let read = |pos: &dyn Fn(usize) -> (usize, usize)| -> u16 {
            (0..15).fold(0u16, |acc, i| {
                let (x, y) = pos(i);
                acc | (u16::from(matrix.get(x, y)) << i)
            })
        };

        let first = read(&first_copy_position);
        let second = read(&|i| second_copy_position(i, size));

        Bch::decode_format(first)
            .or_else(|| Bch::decode_format(second))
            .map(Self::from_data)
    }

    /// Write both copies plus the always-dark module
    pub fn write(&self, matrix: &mut BitMatrix) {
        let size = matrix.width();
        let word = self.word();
        for i in 0..15 {
            let bit = (word >> i) & 1 == 1;
            let (x, y) = first_copy_position(i);
            matrix.set(x, y, bit);
            let (x, y) = second_copy_position(i, size);
            matrix.set(x, y, bit);
        }
        matrix.set(8, size - 8, true);
    }

    fn from_data(data: u8) -> Self {
        Self {
            ec_level: ECLevel::from_format_bits(data >> 3),
            mask_pattern: MaskPattern::from_bits(data),
        }
    }
}
