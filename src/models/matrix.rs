/// Row-major packed bits, eight cells per byte
///
/// Used both for QR module grids (true = dark module) and for binarized
/// camera frames (true = dark pixel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// All-clear matrix
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Create a square matrix, the shape of every QR symbol
    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Columns
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows
    pub fn height(&self) -> usize {
        self.height
    }

    /// Out-of-range reads are clear
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Out-of-range writes are ignored
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        if value {
            self.data[index / 8] |= 1 << (index % 8);
        } else {
            self.data[index / 8] &= !(1 << (index % 8));
        }
    }

    /// Flip one bit; out-of-range is ignored
    pub fn toggle(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        self.data[index / 8] ^= 1 << (index % 8);
    }

    /// Number of set bits
    pub fn count_set(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Copy with every bit flipped (light-on-dark symbols)
    pub fn inverted(&self) -> Self {
        let mut out = self.clone();
        out.data.iter_mut().for_each(|b| *b = !*b);
        // Padding bits past the last cell stay clear
        let used = self.width * self.height % 8;
        if used != 0 {
            if let Some(last) = out.data.last_mut() {
                *last &= (1u8 << used) - 1;
            }
        }
        out
    }

    /// Clear every bit
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
