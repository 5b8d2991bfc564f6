use crate::models::BitMatrix;

/// Convert grayscale image to binary using Otsu's thresholding method
/// Returns a BitMatrix where true = black, false = white
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let threshold = calculate_otsu_threshold(gray);
    threshold_binarize(gray, width, height, threshold)
}

/// Calculate Otsu's optimal threshold (128 for single-tone images)
pub fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total_pixels = gray.len() as f64;
    let total_sum: u64 = histogram
        .iter()
        .enumerate()
        .map(|(intensity, &count)| intensity as u64 * count)
        .sum();

    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;
    let mut class1_pixels = 0u64;
    let mut class1_sum = 0u64;

    // Class 1 holds intensities strictly below the candidate threshold
    for threshold in 1..=255usize {
        class1_pixels += histogram[threshold - 1];
        class1_sum += (threshold as u64 - 1) * histogram[threshold - 1];
        let class2_pixels = gray.len() as u64 - class1_pixels;

        if class1_pixels == 0 || class2_pixels == 0 {
            continue;
        }

        let class1_mean = class1_sum as f64 / class1_pixels as f64;
        let class2_mean = (total_sum - class1_sum) as f64 / class2_pixels as f64;

        let weight1 = class1_pixels as f64 / total_pixels;
        let weight2 = class2_pixels as f64 / total_pixels;

        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Simple global threshold binarization
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);

    for (idx, &value) in gray.iter().take(width * height).enumerate() {
        if value < threshold {
            binary.set(idx % width, idx / width, true);
        }
    }

    binary
}
