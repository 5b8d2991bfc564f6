use crate::models::{BitMatrix, Version};

/// Function module mask for a specific QR version.
/// true = function module (not data), false = data module.
pub struct FunctionMask {
    mask: BitMatrix,
    version: Version,
}

impl FunctionMask {
    /// Mark finders, timing, alignment, format and version areas
    pub fn new(version: Version) -> Self {
        let size = version.size();
        let mut mask = BitMatrix::square(size);

        // Finder patterns + separators (8x8 areas, clipped to bounds)
        Self::mark_finder_area(&mut mask, 0, 0);
        Self::mark_finder_area(&mut mask, size - 7, 0);
        Self::mark_finder_area(&mut mask, 0, size - 7);

        // Timing patterns (row 6 and column 6)
        for i in 0..size {
            mask.set(6, i, true);
            mask.set(i, 6, true);
        }

        for (cx, cy) in alignment_centers(version) {
            for y in cy - 2..=cy + 2 {
                for x in cx - 2..=cx + 2 {
                    mask.set(x, y, true);
                }
            }
        }

        // Format info areas (includes the dark module at (8, size - 8))
        for i in 0..9 {
            mask.set(8, i, true);
            mask.set(i, 8, true);
        }
        for i in 0..8 {
            mask.set(size - 1 - i, 8, true);
            mask.set(8, size - 1 - i, true);
        }

        // Version info (v7+)
        if version.number() >= 7 {
            for dy in 0..6 {
                for dx in 0..3 {
                    mask.set(size - 11 + dx, dy, true);
                    mask.set(dy, size - 11 + dx, true);
                }
            }
        }

        Self { mask, version }
    }

    /// Modules per side
    pub fn size(&self) -> usize {
        self.mask.width()
    }

    /// Version the mask was built for
    pub fn version(&self) -> Version {
        self.version
    }

    /// True for finder, timing, alignment, format and version modules
    pub fn is_function(&self, x: usize, y: usize) -> bool {
        self.mask.get(x, y)
    }

    /// Modules left for data and ECC codewords
    pub fn data_modules_count(&self) -> usize {
        let size = self.size();
        size * size - self.mask.count_set()
    }

    fn mark_finder_area(mask: &mut BitMatrix, x: usize, y: usize) {
        let size = mask.width();
        let start_x = x.saturating_sub(1);
        let start_y = y.saturating_sub(1);
        let end_x = (x + 8).min(size);
        let end_y = (y + 8).min(size);
        for yy in start_y..end_y {
            for xx in start_x..end_x {
                mask.set(xx, yy, true);
            }
        }
    }
}

/// Alignment pattern center coordinates along one axis.
pub fn alignment_pattern_positions(version: Version) -> Vec<usize> {
    let v = version.number() as usize;
    if v == 1 {
        return Vec::new();
    }
    let num_align = v / 7 + 2;
    let step = (v * 8 + num_align * 3 + 5) / (num_align * 4 - 4) * 2;

    let mut positions = vec![0usize; num_align];
    positions[0] = 6;
    let mut pos = version.size() - 7;
    for i in (1..num_align).rev() {
        positions[i] = pos;
        pos -= step;
    }
    positions
}

/// Every alignment pattern center (x, y), skipping the three finder corners.
pub fn alignment_centers(version: Version) -> Vec<(usize, usize)> {
    let positions = alignment_pattern_positions(version);
    let last = positions.len().saturating_sub(1);
    let mut centers = Vec::new();
    for (i, &cx) in positions.iter().enumerate() {
        for (j, &cy) in positions.iter().enumerate() {
            let corner = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
            if !corner {
                centers.push((cx, cy));
            }
        }
    }
    centers
}
