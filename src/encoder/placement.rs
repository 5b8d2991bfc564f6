/// Function patterns and codeword interleaving for symbol construction
use crate::decoder::function_mask::alignment_centers;
use crate::decoder::reed_solomon::ReedSolomonEncoder;
use crate::decoder::tables::{ec_block_info, num_data_codewords};
use crate::decoder::version::VersionInfo;
use crate::models::{BitMatrix, ECLevel, Version};

/// Draw finders, timing and alignment patterns plus version info.
/// Format info is written after mask selection.
pub fn draw_function_patterns(matrix: &mut BitMatrix, version: Version) {
    let size = version.size();

    // Timing patterns: dark on even indices
    for i in 0..size {
        matrix.set(6, i, i % 2 == 0);
        matrix.set(i, 6, i % 2 == 0);
    }

    draw_finder(matrix, 3, 3);
    draw_finder(matrix, size - 4, 3);
    draw_finder(matrix, 3, size - 4);

    for (cx, cy) in alignment_centers(version) {
        for dy in -2isize..=2 {
            for dx in -2isize..=2 {
                let dist = dx.abs().max(dy.abs());
                let x = cx.wrapping_add_signed(dx);
                let y = cy.wrapping_add_signed(dy);
                matrix.set(x, y, dist != 1);
            }
        }
    }

    VersionInfo::write(version, matrix);
}

/// Finder centred at (cx, cy) with its light separator, clipped to the grid
fn draw_finder(matrix: &mut BitMatrix, cx: usize, cy: usize) {
    let size = matrix.width() as isize;
    for dy in -4isize..=4 {
        for dx in -4isize..=4 {
            let x = cx as isize + dx;
            let y = cy as isize + dy;
            if !(0..size).contains(&x) || !(0..size).contains(&y) {
                continue;
            }
            // Chebyshev distance from the centre: 2 and 4 are light rings
            let dist = dx.abs().max(dy.abs());
            matrix.set(x as usize, y as usize, dist != 2 && dist != 4);
        }
    }
}

/// Split data into blocks, append RS ECC to each, and interleave:
/// data columns first (short blocks first), then ECC columns.
pub fn interleave_with_ecc(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<u8> {
    let info = ec_block_info(version, ec_level);
    let data_total = num_data_codewords(version, ec_level);
    debug_assert_eq!(data.len(), data_total);

    let num_long_blocks = data_total % info.num_blocks;
    let num_short_blocks = info.num_blocks - num_long_blocks;
    let short_len = data_total / info.num_blocks;

    let rs = ReedSolomonEncoder::new(info.ecc_per_block);
    let mut blocks: Vec<(&[u8], Vec<u8>)> = Vec::with_capacity(info.num_blocks);
    let mut offset = 0;
    for b in 0..info.num_blocks {
        let len = if b < num_short_blocks { short_len } else { short_len + 1 };
        let chunk = &data[offset..offset + len];
        blocks.push((chunk, rs.ecc(chunk)));
        offset += len;
    }

    let mut out = Vec::with_capacity(data_total + info.num_blocks * info.ecc_per_block);
    for i in 0..=short_len {
        for (chunk, _) in &blocks {
            if let Some(&byte) = chunk.get(i) {
                out.push(byte);
            }
        }
    }
    for i in 0..info.ecc_per_block {
        for (_, ecc) in &blocks {
            out.push(ecc[i]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::function_mask::FunctionMask;
    use crate::decoder::qr_decoder::deinterleave_and_correct;
    use crate::decoder::tables::num_total_codewords;

    #[test]
    fn test_finder_shape() {
        let version = Version::MIN;
        let mut m = BitMatrix::square(version.size());
        draw_function_patterns(&mut m, version);
        // Outer ring, light ring, core
        assert!(m.get(0, 0));
        assert!(m.get(6, 0));
        assert!(!m.get(1, 1));
        assert!(m.get(2, 2));
        assert!(m.get(4, 4));
        // Separator
        assert!(!m.get(7, 0));
        assert!(!m.get(0, 7));
        assert!(!m.get(20 - 7, 0));
        // Timing
        assert!(m.get(8, 6));
        assert!(!m.get(9, 6));
    }

    #[test]
    fn test_alignment_pattern_shape() {
        let version = Version::new(2).unwrap();
        let mut m = BitMatrix::square(version.size());
        draw_function_patterns(&mut m, version);
        // Centre at (18, 18)
        assert!(m.get(18, 18));
        assert!(!m.get(17, 18));
        assert!(!m.get(19, 19));
        assert!(m.get(16, 16));
        assert!(m.get(20, 18));
    }

    #[test]
    fn test_only_function_modules_drawn() {
        let version = Version::new(8).unwrap();
        let func = FunctionMask::new(version);
        let mut m = BitMatrix::square(version.size());
        draw_function_patterns(&mut m, version);
        for y in 0..version.size() {
            for x in 0..version.size() {
                if m.get(x, y) {
                    assert!(func.is_function(x, y), "({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn test_interleave_reverses() {
        for (n, level) in [(5, ECLevel::Q), (13, ECLevel::H), (1, ECLevel::M)] {
            let version = Version::new(n).unwrap();
            let len = num_data_codewords(version, level);
            let data: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
            let stream = interleave_with_ecc(&data, version, level);
            assert_eq!(stream.len(), num_total_codewords(version));
            assert_eq!(deinterleave_and_correct(&stream, version, level).unwrap(), data);
        }
    }
}
