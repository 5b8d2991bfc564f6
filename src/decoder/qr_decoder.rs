/// Symbol decoder: sampled module grid -> text
use crate::decoder::bitstream::{BitstreamExtractor, bits_to_codewords};
use crate::decoder::format::FormatInfo;
use crate::decoder::function_mask::FunctionMask;
use crate::decoder::mask::apply_mask;
use crate::decoder::modes::{
    Mode, alphanumeric::AlphanumericDecoder, byte::ByteDecoder, numeric::NumericDecoder,
};
use crate::decoder::reed_solomon::ReedSolomonDecoder;
use crate::decoder::tables::{ec_block_info, num_data_codewords};
use crate::decoder::version::VersionInfo;
use crate::models::{BitMatrix, ECLevel, MaskPattern, Version};

/// Result of decoding one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    /// Decoded text (byte segments read as UTF-8, lossily)
    pub content: String,
    /// Raw segment bytes
    pub data: Vec<u8>,
    /// Symbol version
    pub version: Version,
    /// Error correction level
    pub ec_level: ECLevel,
    /// Mask the symbol was read with
    pub mask_pattern: MaskPattern,
}

/// Decodes module grids produced by a sampler (or directly by the encoder)
pub struct QrDecoder;

impl QrDecoder {
    /// Decode a square module matrix, trying each quarter turn
    pub fn decode(matrix: &BitMatrix) -> Option<DecodedSymbol> {
        let mut oriented = matrix.clone();
        for _ in 0..4 {
            if let Some(symbol) = Self::decode_oriented(&oriented) {
                return Some(symbol);
            }
            oriented = rotate_clockwise(&oriented);
        }
        None
    }

    fn decode_oriented(matrix: &BitMatrix) -> Option<DecodedSymbol> {
        if matrix.width() != matrix.height() {
            return None;
        }
        let dimension = matrix.width();
        let version = Version::from_size(dimension)?;

        // Version info is authoritative from v7 up; it must agree with the size
        if version.number() >= 7 {
            match VersionInfo::extract(matrix) {
                Some(read) if read == version => {}
                _ => return None,
            }
        }

        let format_info = FormatInfo::extract(matrix)?;
        let func = FunctionMask::new(version);

        let mut unmasked = matrix.clone();
        apply_mask(&mut unmasked, format_info.mask_pattern, &func);

        let bits = BitstreamExtractor::extract(&unmasked, &func);
        let codewords = bits_to_codewords(&bits);
        let data_codewords = deinterleave_and_correct(&codewords, version, format_info.ec_level)?;
        let data = decode_segments(&data_codewords, version)?;
        let content = String::from_utf8_lossy(&data).into_owned();

        Some(DecodedSymbol {
            content,
            data,
            version,
            ec_level: format_info.ec_level,
            mask_pattern: format_info.mask_pattern,
        })
    }
}

/// Shorthand for [`QrDecoder::decode`]
pub fn decode_matrix(matrix: &BitMatrix) -> Option<DecodedSymbol> {
    QrDecoder::decode(matrix)
}

fn rotate_clockwise(matrix: &BitMatrix) -> BitMatrix {
    let size = matrix.width();
    let mut rotated = BitMatrix::square(size);
    for y in 0..size {
        for x in 0..size {
            if matrix.get(x, y) {
                rotated.set(size - 1 - y, x, true);
            }
        }
    }
    rotated
}

/// Split interleaved codewords into blocks, correct each, and join the data parts
pub(crate) fn deinterleave_and_correct(
    codewords: &[u8],
    version: Version,
    ec_level: ECLevel,
) -> Option<Vec<u8>> {
    let info = ec_block_info(version, ec_level);
    let data_total = num_data_codewords(version, ec_level);
    let total = data_total + info.num_blocks * info.ecc_per_block;
    if codewords.len() < total {
        return None;
    }

    let num_long_blocks = data_total % info.num_blocks;
    let num_short_blocks = info.num_blocks - num_long_blocks;
    let short_len = data_total / info.num_blocks;
    let block_data_len = |b: usize| if b < num_short_blocks { short_len } else { short_len + 1 };

    let mut blocks: Vec<Vec<u8>> = (0..info.num_blocks)
        .map(|_| Vec::with_capacity(short_len + 1 + info.ecc_per_block))
        .collect();

    let mut stream = codewords[..total].iter().copied();
    for i in 0..=short_len {
        for (b, block) in blocks.iter_mut().enumerate() {
            if i < block_data_len(b) {
                block.push(stream.next()?);
            }
        }
    }
    for _ in 0..info.ecc_per_block {
        for block in blocks.iter_mut() {
            block.push(stream.next()?);
        }
    }

    let rs = ReedSolomonDecoder::new(info.ecc_per_block);
    let mut data_out = Vec::with_capacity(data_total);
    for (b, block) in blocks.iter_mut().enumerate() {
        rs.decode(block).ok()?;
        data_out.extend_from_slice(&block[..block_data_len(b)]);
    }

    Some(data_out)
}

/// Parse the segment sequence; stops at the terminator or when the stream runs out
pub(crate) fn decode_segments(data_codewords: &[u8], version: Version) -> Option<Vec<u8>> {
    let bits: Vec<bool> = data_codewords
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .collect();

    let mut reader = BitReader::new(&bits);
    let mut data = Vec::new();

    while reader.remaining() >= 4 {
        let indicator = reader.read_bits(4)?;
        let mode = match indicator {
            0 => break,
            1 => Mode::Numeric,
            2 => Mode::Alphanumeric,
            4 => Mode::Byte,
            7 => {
                // ECI designator: 1, 2 or 3 bytes; content is treated as UTF-8
                let first = reader.read_bits(8)?;
                if first & 0x80 != 0 {
                    let extra = if first & 0x40 != 0 { 16 } else { 8 };
                    reader.read_bits(extra)?;
                }
                continue;
            }
            _ => return None,
        };

        let count = reader.read_bits(mode.char_count_bits(version))? as usize;
        let rest = reader.rest();
        let used = match mode {
            Mode::Numeric => {
                let (text, used) = NumericDecoder::decode(rest, count)?;
                data.extend_from_slice(text.as_bytes());
                used
            }
            Mode::Alphanumeric => {
                let (text, used) = AlphanumericDecoder::decode(rest, count)?;
                data.extend_from_slice(text.as_bytes());
                used
            }
            Mode::Byte => {
                let (bytes, used) = ByteDecoder::decode(rest, count)?;
                data.extend_from_slice(&bytes);
                used
            }
        };
        reader.advance(used);
    }

    Some(data)
}

struct BitReader<'a> {
    bits: &'a [bool],
    idx: usize,
}

impl<'a> BitReader<'a> {
    fn new(bits: &'a [bool]) -> Self {
        Self { bits, idx: 0 }
    }

    fn remaining(&self) -> usize {
        self.bits.len().saturating_sub(self.idx)
    }

    fn rest(&self) -> &'a [bool] {
        &self.bits[self.idx..]
    }

    fn advance(&mut self, n: usize) {
        self.idx = (self.idx + n).min(self.bits.len());
    }

    fn read_bits(&mut self, n: usize) -> Option<u32> {
        if self.idx + n > self.bits.len() {
            return None;
        }
        let val = self.bits[self.idx..self.idx + n]
            .iter()
            .fold(0u32, |acc, &b| (acc << 1) | b as u32);
        self.idx += n;
        Some(val)
    }
}
