/// BCH codes protecting QR format info (15,5) and version info (18,6)
///
/// Both codes are small enough that decoding is done by nearest-codeword
/// search over all valid codewords, which corrects up to 3 bit errors.
pub struct Bch;

/// Generator x^10 + x^8 + x^5 + x^4 + x^2 + x + 1
const FORMAT_GENERATOR: u32 = 0x537;
/// XOR mask applied to format info so it is never all-zero
const FORMAT_MASK: u32 = 0x5412;
/// Generator x^12 + x^11 + x^10 + x^9 + x^8 + x^5 + x^2 + 1
const VERSION_GENERATOR: u32 = 0x1F25;
/// Largest Hamming distance accepted as a correction
const MAX_CORRECTABLE: u32 = 3;

impl Bch {
    /// 15-bit masked format word for 5 data bits (EC level << 3 | mask)
    pub fn encode_format(data: u8) -> u16 {
        let data = u32::from(data & 0x1F);
        let mut rem = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * FORMAT_GENERATOR);
        }
        (((data << 10) | (rem & 0x3FF)) ^ FORMAT_MASK) as u16
    }

    /// Recover 5 data bits from a possibly damaged format word
    pub fn decode_format(word: u16) -> Option<u8> {
        let mut best: Option<(u32, u8)> = None;
        for data in 0u8..32 {
            let distance = (u32::from(Self::encode_format(data)) ^ u32::from(word)).count_ones();
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, data));
            }
        }
        best.filter(|&(d, _)| d <= MAX_CORRECTABLE).map(|(_, data)| data)
    }

    /// 18-bit version word for versions 7-40
    pub fn encode_version(version: u8) -> u32 {
        let data = u32::from(version);
        let mut rem = data;
        for _ in 0..12 {
            rem = (rem << 1) ^ ((rem >> 11) * VERSION_GENERATOR);
        }
        (data << 12) | (rem & 0xFFF)
    }

    /// Recover the version number from a possibly damaged version word
    pub fn decode_version(word: u32) -> Option<u8> {
        let mut best: Option<(u32, u8)> = None;
        for version in 7u8..=40 {
            let distance = (Self::encode_version(version) ^ word).count_ones();
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, version));
            }
        }
        best.filter(|&(d, _)| d <= MAX_CORRECTABLE).map(|(_, v)| v)
    }
}
