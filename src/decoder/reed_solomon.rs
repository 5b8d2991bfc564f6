//! Reed-Solomon coding over GF(256)
//!
//! Field polynomial x^8 + x^4 + x^3 + x^2 + 1 (0x11d), generator roots
//! alpha^0 .. alpha^(n-1). Codeword byte 0 is the highest-degree coefficient.

use thiserror::Error;

const FIELD_POLY: u16 = 0x11d;

const fn build_tables() -> ([u8; 256], [u8; 256]) {
    let mut exp = [0u8; 256];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= FIELD_POLY;
        }
        i += 1;
    }
    exp[255] = exp[0];
    (exp, log)
}

const TABLES: ([u8; 256], [u8; 256]) = build_tables();
static EXP: [u8; 256] = TABLES.0;
static LOG: [u8; 256] = TABLES.1;

/// GF(256) arithmetic
pub struct Gf256;

impl Gf256 {
    /// alpha^n
    pub fn exp(n: usize) -> u8 {
        EXP[n % 255]
    }

    /// Product in GF(256)
    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        EXP[(LOG[a as usize] as usize + LOG[b as usize] as usize) % 255]
    }

    /// a / b; `b` must be non-zero
    pub fn div(a: u8, b: u8) -> u8 {
        debug_assert_ne!(b, 0, "division by zero in GF(256)");
        if a == 0 || b == 0 {
            return 0;
        }
        EXP[(LOG[a as usize] as usize + 255 - LOG[b as usize] as usize) % 255]
    }

    /// Evaluate a polynomial stored lowest degree first
    fn eval_ascending(poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0, |acc, &c| Gf256::mul(acc, x) ^ c)
    }
}

/// Uncorrectable block
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RsError {
    /// More errors than the ECC covers
    #[error("block has more errors than its ECC can correct")]
    TooManyErrors,
    /// Error magnitude had a zero denominator
    #[error("error value could not be computed")]
    Degenerate,
}

/// Computes the ECC codewords appended to a data block
pub struct ReedSolomonEncoder {
    /// Generator coefficients below the leading term, highest degree first
    generator: Vec<u8>,
}

impl ReedSolomonEncoder {
    /// Encoder for `num_ecc` ECC codewords per block
    pub fn new(num_ecc: usize) -> Self {
        // Ascending coefficients of prod (x + alpha^i)
        let mut poly = vec![1u8];
        for i in 0..num_ecc {
            let root = Gf256::exp(i);
            let mut next = vec![0u8; poly.len() + 1];
            for (j, &c) in poly.iter().enumerate() {
                next[j] ^= Gf256::mul(c, root);
                next[j + 1] ^= c;
            }
            poly = next;
        }
        poly.pop();
        poly.reverse();
        Self { generator: poly }
    }

    /// Remainder of data * x^n divided by the generator
    pub fn ecc(&self, data: &[u8]) -> Vec<u8> {
        let n = self.generator.len();
        let mut remainder = vec![0u8; n];
        if n == 0 {
            return remainder;
        }
        for &byte in data {
            let factor = byte ^ remainder[0];
            remainder.rotate_left(1);
            remainder[n - 1] = 0;
            for (r, &g) in remainder.iter_mut().zip(&self.generator) {
                *r ^= Gf256::mul(g, factor);
            }
        }
        remainder
    }
}

/// Corrects up to `num_ecc / 2` byte errors in a block in place
pub struct ReedSolomonDecoder {
    num_ecc: usize,
}

impl ReedSolomonDecoder {
    /// Decoder for blocks with `num_ecc` ECC codewords
    pub fn new(num_ecc: usize) -> Self {
        Self { num_ecc }
    }

    /// Correct `block` (data then ECC) in place
    pub fn decode(&self, block: &mut [u8]) -> Result<(), RsError> {
        let syndromes = self.syndromes(block);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(());
        }

        let locator = berlekamp_massey(&syndromes);
        let degree = locator.len() - 1;
        if degree == 0 || degree > self.num_ecc / 2 {
            return Err(RsError::TooManyErrors);
        }

        let n = block.len();
        // Root of the locator for position p is alpha^-(n-1-p)
        let inverse_locator = |pos: usize| Gf256::exp(255 - (n - 1 - pos) % 255);
        let positions: Vec<usize> = (0..n)
            .filter(|&pos| Gf256::eval_ascending(&locator, inverse_locator(pos)) == 0)
            .collect();
        if positions.len() != degree {
            return Err(RsError::TooManyErrors);
        }

        // Forney: e = X * omega(X^-1) / locator'(X^-1)
        let mut omega = vec![0u8; syndromes.len()];
        for (i, slot) in omega.iter_mut().enumerate() {
            for (j, &l) in locator.iter().enumerate().take(i + 1) {
                *slot ^= Gf256::mul(l, syndromes[i - j]);
            }
        }
        let derivative: Vec<u8> = locator
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| if i % 2 == 1 { c } else { 0 })
            .collect();

        for pos in positions {
            let x_inv = inverse_locator(pos);
            let denominator = Gf256::eval_ascending(&derivative, x_inv);
            if denominator == 0 {
                return Err(RsError::Degenerate);
            }
            let x = Gf256::exp((n - 1 - pos) % 255);
            let numerator = Gf256::eval_ascending(&omega, x_inv);
            block[pos] ^= Gf256::mul(x, Gf256::div(numerator, denominator));
        }

        if self.syndromes(block).iter().any(|&s| s != 0) {
            return Err(RsError::TooManyErrors);
        }
        Ok(())
    }

    /// S_i = block(alpha^i)
    fn syndromes(&self, block: &[u8]) -> Vec<u8> {
        (0..self.num_ecc)
            .map(|i| {
                let x = Gf256::exp(i);
                block.iter().fold(0, |acc, &c| Gf256::mul(acc, x) ^ c)
            })
            .collect()
    }
}

/// Error locator polynomial, lowest degree first, trailing zeros trimmed
fn berlekamp_massey(syndromes: &[u8]) -> Vec<u8> {
    let mut locator = vec![1u8];
    let mut previous = vec![1u8];
    let mut previous_delta = 1u8;
    let mut length = 0usize;
    let mut shift = 1usize;

    for k in 0..syndromes.len() {
        let mut delta = syndromes[k];
        for j in 1..=length.min(locator.len() - 1) {
            delta ^= Gf256::mul(locator[j], syndromes[k - j]);
        }
        if delta == 0 {
            shift += 1;
            continue;
        }

        let factor = Gf256::div(delta, previous_delta);
        let mut next = locator.clone();
        if next.len() < previous.len() + shift {
            next.resize(previous.len() + shift, 0);
        }
        for (j, &p) in previous.iter().enumerate() {
            next[j + shift] ^= Gf256::mul(factor, p);
        }

        if 2 * length <= k {
            previous = std::mem::replace(&mut locator, next);
            previous_delta = delta;
            length = k + 1 - length;
            shift = 1;
        } else {
            locator = next;
            shift += 1;
        }
    }

    while locator.len() > 1 && locator.last() == Some(&0) {
        locator.pop();
    }
    locator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codeword(data: &[u8], num_ecc: usize) -> Vec<u8> {
        let mut block = data.to_vec();
        block.extend(ReedSolomonEncoder::new(num_ecc).ecc(data));
        block
    }

    #[test]
    fn test_field_tables() {
        assert_eq!(Gf256::exp(0), 1);
        assert_eq!(Gf256::exp(8), 0x1d);
        assert_eq!(Gf256::exp(255), 1);
        for a in 1..=255u8 {
            assert_eq!(EXP[LOG[a as usize] as usize], a);
            assert_eq!(Gf256::div(Gf256::mul(a, 0x53), 0x53), a);
        }
        assert_eq!(Gf256::mul(0, 7), 0);
    }

    #[test]
    fn test_ecc_known_vector() {
        // 1-M "01234567" from ISO/IEC 18004 Annex I
        let data = [
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
            0xEC, 0x11,
        ];
        let ecc = ReedSolomonEncoder::new(10).ecc(&data);
        assert_eq!(ecc, [0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55]);
    }

    #[test]
    fn test_clean_block_untouched() {
        let mut block = codeword(b"sealed", 10);
        let expected = block.clone();
        ReedSolomonDecoder::new(10).decode(&mut block).unwrap();
        assert_eq!(block, expected);
    }

    #[test]
    fn test_corrects_up_to_half_the_ecc() {
        let data: Vec<u8> = (0..40u8).map(|i| i.wrapping_mul(37)).collect();
        let clean = codeword(&data, 16);
        let decoder = ReedSolomonDecoder::new(16);

        for errors in 1..=8 {
            let mut block = clean.clone();
            for e in 0..errors {
                block[e * 7] ^= 0xA5 ^ e as u8;
            }
            decoder.decode(&mut block).unwrap();
            assert_eq!(block, clean, "{errors} errors");
        }
    }

    #[test]
    fn test_corrects_errors_in_ecc_bytes() {
        let clean = codeword(&[1, 2, 3, 4, 5], 8);
        let mut block = clean.clone();
        let last = block.len() - 1;
        block[last] ^= 0xFF;
        block[last - 1] ^= 0x33;
        ReedSolomonDecoder::new(8).decode(&mut block).unwrap();
        assert_eq!(block, clean);
    }

    #[test]
    fn test_too_much_damage_is_reported() {
        let clean = codeword(&[0x42; 12], 4);
        let mut block = clean.clone();
        for b in block.iter_mut().take(6) {
            *b ^= 0x5A;
        }
        // Rejected, or miscorrected into some other codeword
        if ReedSolomonDecoder::new(4).decode(&mut block).is_ok() {
            assert_ne!(block, clean);
        }
    }
}
