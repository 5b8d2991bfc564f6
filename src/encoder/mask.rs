/// Mask selection by the four standard penalty rules
use rayon::prelude::*;

use crate::decoder::format::FormatInfo;
use crate::decoder::function_mask::FunctionMask;
use crate::decoder::mask::apply_mask;
use crate::models::{BitMatrix, ECLevel, MaskPattern};

const PENALTY_N1: u32 = 3;
const PENALTY_N2: u32 = 3;
const PENALTY_N3: u32 = 40;
const PENALTY_N4: u32 = 10;

/// 1:1:3:1:1 finder lookalike with four light modules on one side
const FINDER_LIKE: [[bool; 11]; 2] = [
    [true, false, true, true, true, false, true, false, false, false, false],
    [false, false, false, false, true, false, true, true, true, false, true],
];

/// Try all eight masks (in parallel) on the unmasked symbol and keep the one
/// with the lowest penalty; ties go to the lowest pattern number.
/// Returns the finished matrix with format info written.
pub fn select_mask(
    unmasked: &BitMatrix,
    func: &FunctionMask,
    ec_level: ECLevel,
) -> (MaskPattern, BitMatrix) {
    let scored: Vec<(u32, MaskPattern, BitMatrix)> = MaskPattern::ALL
        .par_iter()
        .map(|&mask| {
            let mut candidate = unmasked.clone();
            apply_mask(&mut candidate, mask, func);
            FormatInfo::new(ec_level, mask).write(&mut candidate);
            (penalty(&candidate), mask, candidate)
        })
        .collect();

    let mut best: Option<(u32, MaskPattern, BitMatrix)> = None;
    for entry in scored {
        if best.as_ref().is_none_or(|(score, _, _)| entry.0 < *score) {
            best = Some(entry);
        }
    }
    match best {
        Some((_, mask, matrix)) => (mask, matrix),
        // ALL is never empty
        None => (MaskPattern::Pattern0, unmasked.clone()),
    }
}

/// Total penalty score N1 + N2 + N3 + N4
pub fn penalty(matrix: &BitMatrix) -> u32 {
    let size = matrix.width();
    let rows = (0..size).map(|y| (0..size).map(|x| matrix.get(x, y)).collect::<Vec<_>>());
    let cols = (0..size).map(|x| (0..size).map(|y| matrix.get(x, y)).collect::<Vec<_>>());

    let mut score = 0;
    for line in rows.chain(cols) {
        score += run_penalty(&line);
        score += finder_penalty(&line);
    }
    score + block_penalty(matrix) + balance_penalty(matrix)
}

/// N1: runs of five or more same-coloured modules
fn run_penalty(line: &[bool]) -> u32 {
    let mut score = 0;
    let mut run = 1;
    for i in 1..=line.len() {
        if i < line.len() && line[i] == line[i - 1] {
            run += 1;
            continue;
        }
        if run >= 5 {
            score += PENALTY_N1 + (run - 5);
        }
        run = 1;
    }
    score
}

/// N2: each 2x2 block of one colour
fn block_penalty(matrix: &BitMatrix) -> u32 {
    let size = matrix.width();
    let mut score = 0;
    for y in 0..size.saturating_sub(1) {
        for x in 0..size.saturating_sub(1) {
            let c = matrix.get(x, y);
            if matrix.get(x + 1, y) == c && matrix.get(x, y + 1) == c && matrix.get(x + 1, y + 1) == c
            {
                score += PENALTY_N2;
            }
        }
    }
    score
}

/// N3: finder-like sequences in a row or column
fn finder_penalty(line: &[bool]) -> u32 {
    let count = line
        .windows(11)
        .filter(|w| FINDER_LIKE.iter().any(|p| *w == p.as_slice()))
        .count();
    count as u32 * PENALTY_N3
}

/// N4: deviation of the dark proportion from 50%, per 5% step
fn balance_penalty(matrix: &BitMatrix) -> u32 {
    let total = matrix.width() * matrix.height();
    if total == 0 {
        return 0;
    }
    let percent = matrix.count_set() * 100 / total;
    (percent.abs_diff(50) / 5) as u32 * PENALTY_N4
}
