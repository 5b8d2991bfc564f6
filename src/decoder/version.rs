/// Version information blocks for QR versions 7-40
use crate::decoder::bch::Bch;
use crate::models::{BitMatrix, Version};

/// Version info is 18 bits (6 data + 12 ECC), stored in two 6x3 blocks
pub struct VersionInfo;

impl VersionInfo {
    /// Extract version from a symbol matrix (versions 7+ only)
    pub fn extract(matrix: &BitMatrix) -> Option<Version> {
        let size = matrix.width();
        if size < 45 {
            return None;
        }

        let mut top_right = 0u32;
        let mut bottom_left = 0u32;
        for i in 0..18 {
            let a = size - 11 + i % 3;
            let b = i / 3;
            top_right |= u32::from(matrix.get(a, b)) << i;
            bottom_left |= u32::from(matrix.get(b, a)) << i;
        }

        Bch::decode_version(top_right)
            .or_else(|| Bch::decode_version(bottom_left))
            .and_then(Version::new)
    }

    /// Write both version blocks; no-op below version 7
    pub fn write(version: Version, matrix: &mut BitMatrix) {
        if version.number() < 7 {
            return;
        }
        let size = version.size();
        let word = Bch::encode_version(version.number());
        for i in 0..18 {
            let bit = (word >> i) & 1 == 1;
            let a = size - 11 + i % 3;
            let b = i / 3;
            matrix.set(a, b, bit);
            matrix.set(b, a, bit);
        }
    }
}
