/// Codeword placement order inside the QR matrix
use crate::decoder::function_mask::FunctionMask;
use crate::models::BitMatrix;

/// Zig-zag traversal over data modules: column pairs from the right edge,
/// alternating upward and downward, skipping the vertical timing column.
pub struct BitstreamExtractor;

impl BitstreamExtractor {
    /// Data module coordinates (x, y) in codeword bit order
    pub fn data_positions(func: &FunctionMask) -> Vec<(usize, usize)> {
        let dimension = func.size();
        let mut positions = Vec::with_capacity(func.data_modules_count());

        let mut upward = true;
        let mut col = dimension as i32 - 1;

        while col > 0 {
            if col == 6 {
                col -= 1;
                continue;
            }

            for i in 0..dimension {
                let row = if upward { dimension - 1 - i } else { i };
                for c in [col as usize, col as usize - 1] {
                    if !func.is_function(c, row) {
                        positions.push((c, row));
                    }
                }
            }

            upward = !upward;
            col -= 2;
        }

        positions
    }

    /// Extract data bits from matrix (excluding function patterns)
    pub fn extract(matrix: &BitMatrix, func: &FunctionMask) -> Vec<bool> {
        Self::data_positions(func)
            .into_iter()
            .map(|(x, y)| matrix.get(x, y))
            .collect()
    }

    /// Write codewords MSB-first into the data modules.
    /// Modules past the last codeword (remainder bits) stay light.
    pub fn place(matrix: &mut BitMatrix, func: &FunctionMask, codewords: &[u8]) {
        let bits = codewords
            .iter()
            .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1));
        for ((x, y), bit) in Self::data_positions(func).into_iter().zip(bits) {
            matrix.set(x, y, bit);
        }
    }
}

/// Pack bits MSB-first into bytes, dropping a trailing partial byte
pub fn bits_to_codewords(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
        .collect()
}
