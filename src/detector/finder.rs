/// Finder pattern detection using 1:1:3:1:1 run-length scanning
use crate::models::{BitMatrix, Point};

/// Merged candidates kept for grouping, most-confirmed first
const MAX_CANDIDATES: usize = 8;

/// Centre of one of the three square markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    /// Sub-pixel centre of the inner square
    pub center: Point,
    /// Mean module width in pixels
    pub module_size: f32,
    /// Scan rows that confirmed this pattern
    pub hits: usize,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Scans a binary image for finder patterns
pub struct FinderDetector;

impl FinderDetector {
    /// Scan every row for 1:1:3:1:1 windows, confirm each through the centre
    /// column and row, and merge repeated sightings
    pub fn detect(matrix: &BitMatrix) -> Vec<FinderPattern> {
        let mut found: Vec<FinderPattern> = Vec::new();

        for y in 0..matrix.height() {
            let runs = row_runs(matrix, y);
            let mut start = 0;
            for (i, &(dark, len)) in runs.iter().enumerate() {
                if let Some(window) = runs.get(i..i + 5) {
                    if dark && Self::is_candidate(window) {
                        let (l0, l1, l2) = (window[0].1, window[1].1, window[2].1);
                        let centre_x = start as f32 + (l0 + l1) as f32 + l2 as f32 / 2.0;
                        if let Some(pattern) = Self::confirm(matrix, centre_x, y) {
                            Self::merge(&mut found, pattern);
                        }
                    }
                }
                start += len;
            }
        }

        found.sort_by(|a, b| b.hits.cmp(&a.hits));
        found.truncate(MAX_CANDIDATES);
        found
    }

    fn is_candidate(window: &[(bool, usize)]) -> bool {
        let colours_ok = window
            .iter()
            .map(|&(dark, _)| dark)
            .eq([true, false, true, false, true]);
        let lengths = [window[0].1, window[1].1, window[2].1, window[3].1, window[4].1];
        colours_ok && finder_ratio(&lengths).is_some()
    }

    /// Re-measure vertically through the row hit, then horizontally through
    /// the refined centre row
    fn confirm(matrix: &BitMatrix, centre_x: f32, y: usize) -> Option<FinderPattern> {
        let x = centre_x as usize;
        let (cy, vertical) = cross_check(matrix, x, y, Axis::Vertical)?;
        let (cx, horizontal) = cross_check(matrix, x, cy as usize, Axis::Horizontal)?;
        if (vertical - horizontal).abs() > vertical.max(horizontal) * 0.5 {
            return None;
        }
        Some(FinderPattern {
            center: Point::new(cx, cy),
            module_size: (vertical + horizontal) / 2.0,
            hits: 1,
        })
    }

    fn merge(found: &mut Vec<FinderPattern>, candidate: FinderPattern) {
        let near = found.iter_mut().find(|p| {
            p.center.distance(&candidate.center) < p.module_size.max(candidate.module_size) * 2.0
        });
        match near {
            Some(existing) => {
                let n = existing.hits as f32;
                existing.center = Point::new(
                    (existing.center.x * n + candidate.center.x) / (n + 1.0),
                    (existing.center.y * n + candidate.center.y) / (n + 1.0),
                );
                existing.module_size = (existing.module_size * n + candidate.module_size) / (n + 1.0);
                existing.hits += 1;
            }
            None => found.push(candidate),
        }
    }
}

/// Run lengths of alternating colours along row `y` as (is_dark, length)
pub fn row_runs(matrix: &BitMatrix, y: usize) -> Vec<(bool, usize)> {
    let width = matrix.width();
    let mut runs = Vec::new();
    if width == 0 || y >= matrix.height() {
        return runs;
    }

    let mut current = matrix.get(0, y);
    let mut run_start = 0;
    for x in 1..width {
        let colour = matrix.get(x, y);
        if colour != current {
            runs.push((current, x - run_start));
            run_start = x;
            current = colour;
        }
    }
    runs.push((current, width - run_start));
    runs
}

/// Module size if the five run lengths read 1:1:3:1:1. Side runs may be off
/// by half a module, the centre run by a whole one.
pub fn finder_ratio(lengths: &[usize; 5]) -> Option<f32> {
    let total: usize = lengths.iter().sum();
    if total < 7 {
        return None;
    }
    let module = total as f32 / 7.0;
    let ok = [1.0f32, 1.0, 3.0, 1.0, 1.0]
        .iter()
        .zip(lengths)
        .all(|(&expected, &len)| {
            let tolerance = if expected > 1.0 { 1.0 } else { 0.5 };
            (len as f32 / module - expected).abs() <= tolerance
        });
    ok.then_some(module)
}

/// Measure the five runs through the dark pixel at (x, y) along `axis`.
/// Returns the centre coordinate on that axis and the module size.
fn cross_check(matrix: &BitMatrix, x: usize, y: usize, axis: Axis) -> Option<(f32, f32)> {
    let (origin, limit) = match axis {
        Axis::Horizontal => (x as isize, matrix.width() as isize),
        Axis::Vertical => (y as isize, matrix.height() as isize),
    };
    let at = |pos: isize| -> Option<bool> {
        if !(0..limit).contains(&pos) {
            return None;
        }
        let pos = pos as usize;
        Some(match axis {
            Axis::Horizontal => matrix.get(pos, y),
            Axis::Vertical => matrix.get(x, pos),
        })
    };
    if at(origin) != Some(true) {
        return None;
    }

    let mut lengths = [0usize, 0, 1, 0, 0];
    let mut back = origin - 1;
    for (slot, dark) in [(2, true), (1, false), (0, true)] {
        while at(back) == Some(dark) {
            lengths[slot] += 1;
            back -= 1;
        }
    }
    let mut forward = origin + 1;
    for (slot, dark) in [(2, true), (3, false), (4, true)] {
        while at(forward) == Some(dark) {
            lengths[slot] += 1;
            forward += 1;
        }
    }

    let module = finder_ratio(&lengths)?;
    let start = (back + 1) as f32;
    let centre = start + (lengths[0] + lengths[1]) as f32 + lengths[2] as f32 / 2.0;
    Some((centre, module))
}

/// Paint a 7x7 finder of `module` px modules with its top-left at (x0, y0)
#[cfg(test)]
pub(crate) fn paint_finder(m: &mut BitMatrix, x0: usize, y0: usize, module: usize) {
    for my in 0..7 {
        for mx in 0..7 {
            let ring = mx == 0 || mx == 6 || my == 0 || my == 6;
            let core = (2..=4).contains(&mx) && (2..=4).contains(&my);
            if ring || core {
                for dy in 0..module {
                    for dx in 0..module {
                        m.set(x0 + mx * module + dx, y0 + my * module + dy, true);
                    }
                }
            }
        }
    }
}
