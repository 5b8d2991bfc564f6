/// Data codeword construction: one segment, terminator, byte alignment, pad bytes
use crate::decoder::modes::{
    Mode, alphanumeric::AlphanumericEncoder, byte::ByteEncoder, numeric::NumericEncoder, push_bits,
};
use crate::decoder::tables::num_data_codewords;
use crate::models::{ECLevel, Version};

/// Alternating pad codewords
const PAD_BYTES: [u8; 2] = [0xEC, 0x11];

/// Data codewords for `text` in `mode`, filling the symbol's full data capacity.
/// The caller has checked that the text fits.
pub fn data_codewords(text: &str, mode: Mode, version: Version, ec_level: ECLevel) -> Vec<u8> {
    let capacity_bits = num_data_codewords(version, ec_level) * 8;
    let mut bits = Vec::with_capacity(capacity_bits);

    push_bits(&mut bits, mode.indicator(), 4);
    push_bits(&mut bits, mode.char_count(text) as u32, mode.char_count_bits(version));
    match mode {
        Mode::Numeric => NumericEncoder::encode(text, &mut bits),
        Mode::Alphanumeric => AlphanumericEncoder::encode(text, &mut bits),
        Mode::Byte => ByteEncoder::encode(text, &mut bits),
    }
    debug_assert!(bits.len() <= capacity_bits);

    // Terminator of up to four zero bits, then pad to a byte boundary
    let terminator = (capacity_bits - bits.len()).min(4);
    bits.extend(std::iter::repeat_n(false, terminator));
    while bits.len() % 8 != 0 {
        bits.push(false);
    }

    let mut codewords: Vec<u8> = bits
        .chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
        .collect();
    let data_len = capacity_bits / 8;
    for pad in PAD_BYTES.iter().cycle() {
        if codewords.len() >= data_len {
            break;
        }
        codewords.push(*pad);
    }
    codewords
}
