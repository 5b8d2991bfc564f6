use super::BitMatrix;
use std::fmt;

/// QR code version (1-40, Model 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u8);

impl Version {
    /// Smallest Model 2 version
    pub const MIN: Version = Version(1);
    /// Largest Model 2 version
    pub const MAX: Version = Version(40);

    /// Create a version, `None` outside 1..=40
    pub fn new(number: u8) -> Option<Self> {
        (1..=40).contains(&number).then_some(Self(number))
    }

    /// Infer the version from a symbol width in modules (21, 25, ... 177)
    pub fn from_size(size: usize) -> Option<Self> {
        if size < 21 || (size - 17) % 4 != 0 {
            return None;
        }
        u8::try_from((size - 17) / 4).ok().and_then(Self::new)
    }

    /// Get the version number (1-40)
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Get the size in modules (width = height)
    pub fn size(&self) -> usize {
        4 * self.0 as usize + 17
    }
}

/// Error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ECLevel {
    /// Low (~7% recovery capacity)
    L,
    /// Medium (~15% recovery capacity)
    M,
    /// Quartile (~25% recovery capacity)
    Q,
    /// High (~30% recovery capacity)
    H,
}

impl ECLevel {
    /// All levels, lowest redundancy first
    pub const ALL: [ECLevel; 4] = [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H];

    /// Decode the two EC bits stored in format info (01=L, 00=M, 11=Q, 10=H)
    pub fn from_format_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0b01 => ECLevel::L,
            0b00 => ECLevel::M,
            0b11 => ECLevel::Q,
            _ => ECLevel::H,
        }
    }

    /// The two EC bits written into format info
    pub fn format_bits(&self) -> u8 {
        match self {
            ECLevel::L => 0b01,
            ECLevel::M => 0b00,
            ECLevel::Q => 0b11,
            ECLevel::H => 0b10,
        }
    }

    /// Row index into the ECC tables
    pub(crate) fn table_index(&self) -> usize {
        match self {
            ECLevel::L => 0,
            ECLevel::M => 1,
            ECLevel::Q => 2,
            ECLevel::H => 3,
        }
    }

    /// Parse a level name (`L`, `M`, `Q`, `H`, case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Some(ECLevel::L),
            "M" | "MEDIUM" => Some(ECLevel::M),
            "Q" | "QUARTILE" => Some(ECLevel::Q),
            "H" | "HIGH" => Some(ECLevel::H),
            _ => None,
        }
    }
}

impl fmt::Display for ECLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ECLevel::L => "L",
            ECLevel::M => "M",
            ECLevel::Q => "Q",
            ECLevel::H => "H",
        };
        f.write_str(name)
    }
}

/// Mask pattern (0-7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskPattern {
    /// (i + j) % 2 == 0
    Pattern0 = 0,
    /// i % 2 == 0
    Pattern1 = 1,
    /// j % 3 == 0
    Pattern2 = 2,
    /// (i + j) % 3 == 0
    Pattern3 = 3,
    /// (i/2 + j/3) % 2 == 0
    Pattern4 = 4,
    /// (i*j)%2 + (i*j)%3 == 0
    Pattern5 = 5,
    /// ((i*j)%2 + (i*j)%3) % 2 == 0
    Pattern6 = 6,
    /// ((i+j)%2 + (i*j)%3) % 2 == 0
    Pattern7 = 7,
}

impl MaskPattern {
    /// All eight patterns in reference order
    pub const ALL: [MaskPattern; 8] = [
        MaskPattern::Pattern0,
        MaskPattern::Pattern1,
        MaskPattern::Pattern2,
        MaskPattern::Pattern3,
        MaskPattern::Pattern4,
        MaskPattern::Pattern5,
        MaskPattern::Pattern6,
        MaskPattern::Pattern7,
    ];

    /// Get mask pattern from bits
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0x07) as usize]
    }

    /// Pattern number as stored in format info
    pub fn bits(&self) -> u8 {
        *self as u8
    }

    /// Check if module at row `i`, column `j` should be flipped
    pub fn is_masked(&self, i: usize, j: usize) -> bool {
        match self {
            MaskPattern::Pattern0 => (i + j) % 2 == 0,
            MaskPattern::Pattern1 => i % 2 == 0,
            MaskPattern::Pattern2 => j % 3 == 0,
            MaskPattern::Pattern3 => (i + j) % 3 == 0,
            MaskPattern::Pattern4 => (i / 2 + j / 3) % 2 == 0,
            MaskPattern::Pattern5 => ((i * j) % 2 + (i * j) % 3) == 0,
            MaskPattern::Pattern6 => (((i * j) % 2) + ((i * j) % 3)) % 2 == 0,
            MaskPattern::Pattern7 => (((i + j) % 2) + ((i * j) % 3)) % 2 == 0,
        }
    }
}

/// Encoded QR symbol
///
/// `scale` is the rendered size of one module in pixels; the module grid
/// itself does not depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpticalSymbol {
    /// Module matrix (true = dark, false = light), no quiet zone
    pub modules: BitMatrix,
    /// Symbol version
    pub version: Version,
    /// Error correction level
    pub ec_level: ECLevel,
    /// Mask pattern chosen by penalty scoring
    pub mask_pattern: MaskPattern,
    /// Pixels per module when rendered
    pub scale: u32,
}

impl OpticalSymbol {
    /// Width of the module grid
    pub fn size(&self) -> usize {
        self.modules.width()
    }

    /// Module at (x, y), `false` outside the grid
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules.get(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_size() {
        assert_eq!(Version::MIN.size(), 21);
        assert_eq!(Version::new(2).unwrap().size(), 25);
        assert_eq!(Version::MAX.size(), 177);
        assert!(Version::new(0).is_none());
        assert!(Version::new(41).is_none());
    }

    #[test]
    fn test_version_from_size() {
        assert_eq!(Version::from_size(21), Version::new(1));
        assert_eq!(Version::from_size(177), Version::new(40));
        assert_eq!(Version::from_size(22), None);
        assert_eq!(Version::from_size(181), None);
    }

    #[test]
    fn test_ec_level_format_bits() {
        for level in ECLevel::ALL {
            assert_eq!(ECLevel::from_format_bits(level.format_bits()), level);
        }
        assert_eq!(ECLevel::from_format_bits(0b01), ECLevel::L);
        assert_eq!(ECLevel::from_format_bits(0b10), ECLevel::H);
    }

    #[test]
    fn test_ec_level_parse() {
        assert_eq!(ECLevel::parse("h"), Some(ECLevel::H));
        assert_eq!(ECLevel::parse(" Medium "), Some(ECLevel::M));
        assert_eq!(ECLevel::parse("X"), None);
        assert_eq!(ECLevel::Q.to_string(), "Q");
    }

    #[test]
    fn test_mask_pattern() {
        let mask = MaskPattern::Pattern0;
        assert!(mask.is_masked(0, 0));
        assert!(!mask.is_masked(0, 1));
        assert!(mask.is_masked(1, 1));
        assert_eq!(MaskPattern::from_bits(5), MaskPattern::Pattern5);
        assert_eq!(MaskPattern::Pattern7.bits(), 7);
    }
}
