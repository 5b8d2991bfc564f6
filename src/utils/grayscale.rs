/// Luminance conversion for camera frames
/// Y = 0.299*R + 0.587*G + 0.114*B
/// Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * u32::from(r) + COEF_G * u32::from(g) + COEF_B * u32::from(b)) >> 8;
    lum.min(255) as u8
}

/// Convert interleaved pixels with `channels` bytes each (3 = RGB, 4 = RGBA)
/// to one luminance byte per pixel. Rows are processed in parallel.
/// Returns `None` when the buffer is shorter than `width * height` pixels.
pub fn to_grayscale(pixels: &[u8], width: usize, height: usize, channels: usize) -> Option<Vec<u8>> {
    let pixel_count = width.checked_mul(height)?;
    if pixels.len() < pixel_count.checked_mul(channels)? {
        return None;
    }
    if channels == 1 {
        return Some(pixels[..pixel_count].to_vec());
    }
    if channels < 3 || width == 0 {
        return None;
    }

    let mut gray = vec![0u8; pixel_count];
    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * channels;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * channels;
            *out = luminance(pixels[idx], pixels[idx + 1], pixels[idx + 2]);
        }
    });

    Some(gray)
}

/// Convert RGB image to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
    to_grayscale(rgb, width, height, 3)
}

/// Convert RGBA image to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
    to_grayscale(rgba, width, height, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_grayscale() {
        // Pure white
        let gray = rgb_to_grayscale(&[255, 255, 255], 1, 1).unwrap();
        assert!(gray[0] >= 254);

        // Pure black
        let gray = rgb_to_grayscale(&[0, 0, 0], 1, 1).unwrap();
        assert_eq!(gray[0], 0);

        // Pure red
        let gray = rgb_to_grayscale(&[255, 0, 0], 1, 1).unwrap();
        assert!(gray[0] < 255);
        assert!(gray[0] > 0);

        // Pure green
        let gray = rgb_to_grayscale(&[0, 255, 0], 1, 1).unwrap();
        assert!(gray[0] > 100);

        // 2x2 image
        let img = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let gray = rgb_to_grayscale(&img, 2, 2).unwrap();
        assert_eq!(gray.len(), 4);
    }

    #[test]
    fn test_rgba_to_grayscale() {
        let gray = rgba_to_grayscale(&[255, 128, 64, 255], 1, 1).unwrap();
        assert_eq!(gray.len(), 1);
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(rgb_to_grayscale(&[0; 5], 2, 1).is_none());
        assert!(to_grayscale(&[0; 3], 2, 2, 1).is_none());
    }

    #[test]
    fn test_luma_passthrough() {
        assert_eq!(to_grayscale(&[7, 8, 9, 10], 2, 2, 1).unwrap(), vec![7, 8, 9, 10]);
    }
}
