/// Symbol geometry from three finder patterns, and module sampling
use crate::detector::finder::{FinderDetector, FinderPattern};
use crate::models::{BitMatrix, Point, Version};

/// Largest accepted |cos| of the angle at the top-left finder
const MAX_CORNER_COS: f32 = 0.25;

/// Finder centres of a candidate symbol plus its size in modules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolRegion {
    /// Centre of the top-left finder
    pub top_left: Point,
    /// Centre of the top-right finder
    pub top_right: Point,
    /// Centre of the bottom-left finder
    pub bottom_left: Point,
    /// Modules per side
    pub dimension: usize,
}

impl SymbolRegion {
    /// Pixel position of module-space point (u, v). Finder centres sit at
    /// module (3.5, 3.5), (dimension - 3.5, 3.5) and (3.5, dimension - 3.5).
    pub fn project(&self, u: f32, v: f32) -> Point {
        let span = (self.dimension - 7) as f32;
        let (ax, ay) = self.top_left.to(&self.top_right);
        let (bx, by) = self.top_left.to(&self.bottom_left);
        let s = (u - 3.5) / span;
        let t = (v - 3.5) / span;
        Point::new(
            self.top_left.x + s * ax + t * bx,
            self.top_left.y + s * ay + t * by,
        )
    }

    /// Mean pixels per module along both symbol axes
    pub fn module_size(&self) -> f32 {
        let span = (self.dimension - 7) as f32;
        (self.top_left.distance(&self.top_right) + self.top_left.distance(&self.bottom_left))
            / 2.0
            / span
    }
}

/// Candidate regions, best-confirmed finder triples first. Each plausible
/// triple yields its estimated dimension, then the neighbouring versions.
pub fn locate(binary: &BitMatrix) -> Vec<SymbolRegion> {
    let finders = FinderDetector::detect(binary);
    if finders.len() < 3 {
        tracing::debug!(finders = finders.len(), "too few finder patterns");
        return Vec::new();
    }

    let mut regions = Vec::new();
    for i in 0..finders.len() {
        for j in i + 1..finders.len() {
            for k in j + 1..finders.len() {
                regions.extend(arrange([&finders[i], &finders[j], &finders[k]]));
            }
        }
    }
    regions
}

/// Order a finder triple as top-left, top-right, bottom-left and estimate
/// the dimension from the finder spacing
fn arrange(patterns: [&FinderPattern; 3]) -> Vec<SymbolRegion> {
    let sizes = patterns.map(|p| p.module_size);
    let smallest = sizes.iter().copied().fold(f32::INFINITY, f32::min);
    let largest = sizes.iter().copied().fold(0.0, f32::max);
    if smallest < 1.0 || largest > smallest * 1.5 {
        return Vec::new();
    }

    // Top-left is the corner closest to a right angle
    let corner = (0..3).min_by(|&a, &b| corner_cos(patterns, a).total_cmp(&corner_cos(patterns, b)));
    let Some(corner) = corner else {
        return Vec::new();
    };
    if corner_cos(patterns, corner) > MAX_CORNER_COS {
        return Vec::new();
    }

    let top_left = patterns[corner].center;
    let p1 = patterns[(corner + 1) % 3].center;
    let p2 = patterns[(corner + 2) % 3].center;
    let (v1x, v1y) = top_left.to(&p1);
    let (v2x, v2y) = top_left.to(&p2);
    // Image y grows downwards, so top-right -> bottom-left turns clockwise
    let (top_right, bottom_left) = if v1x * v2y - v1y * v2x > 0.0 { (p1, p2) } else { (p2, p1) };

    let d_right = top_left.distance(&top_right);
    let d_down = top_left.distance(&bottom_left);
    if d_right.max(d_down) > d_right.min(d_down) * 1.25 {
        return Vec::new();
    }

    let module = sizes.iter().sum::<f32>() / 3.0;
    let estimate = (d_right + d_down) / 2.0 / module + 7.0;
    let guess = ((estimate - 17.0) / 4.0).round();
    if !(0.0..=41.0).contains(&guess) {
        return Vec::new();
    }

    [0i16, -1, 1]
        .into_iter()
        .filter_map(|delta| u8::try_from(guess as i16 + delta).ok().and_then(Version::new))
        .map(|version| SymbolRegion {
            top_left,
            top_right,
            bottom_left,
            dimension: version.size(),
        })
        .collect()
}

/// |cos| of the angle at `patterns[i]` between the other two
fn corner_cos(patterns: [&FinderPattern; 3], i: usize) -> f32 {
    let p = patterns[i].center;
    let (v1x, v1y) = p.to(&patterns[(i + 1) % 3].center);
    let (v2x, v2y) = p.to(&patterns[(i + 2) % 3].center);
    let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
    if denom == 0.0 {
        return f32::INFINITY;
    }
    ((v1x * v2x + v1y * v2y) / denom).abs()
}

/// Read module centres of `region` into a dimension x dimension grid
pub fn sample(binary: &BitMatrix, region: &SymbolRegion) -> BitMatrix {
    let mut grid = BitMatrix::square(region.dimension);
    for y in 0..region.dimension {
        for x in 0..region.dimension {
            let p = region.project(x as f32 + 0.5, y as f32 + 0.5);
            if p.x >= 0.0 && p.y >= 0.0 && binary.get(p.x as usize, p.y as usize) {
                grid.set(x, y, true);
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::finder::paint_finder;

    /// Version 1 finder layout at `module` px with a `margin` px border
    fn v1_finders(module: usize, margin: usize) -> BitMatrix {
        let side = 21 * module + 2 * margin;
        let mut m = BitMatrix::new(side, side);
        paint_finder(&mut m, margin, margin, module);
        paint_finder(&mut m, margin + 14 * module, margin, module);
        paint_finder(&mut m, margin, margin + 14 * module, module);
        m
    }

    fn rotate_180(m: &BitMatrix) -> BitMatrix {
        let (w, h) = (m.width(), m.height());
        let mut out = BitMatrix::new(w, h);
        for y in 0..h {
            for x in 0..w {
                out.set(w - 1 - x, h - 1 - y, m.get(x, y));
            }
        }
        out
    }

    #[test]
    fn test_locate_upright() {
        let m = v1_finders(3, 8);
        let regions = locate(&m);
        assert!(!regions.is_empty());
        let region = regions[0];
        assert_eq!(region.dimension, 21);
        assert_eq!(region.top_left, Point::new(18.5, 18.5));
        assert_eq!(region.top_right, Point::new(60.5, 18.5));
        assert_eq!(region.module_size(), 3.0);

        let grid = sample(&m, &region);
        assert!(grid.get(0, 0));
        assert!(!grid.get(1, 1));
        assert!(grid.get(3, 3));
        assert!(grid.get(20, 0));
        assert!(grid.get(0, 20));
        assert!(!grid.get(10, 10));
    }

    #[test]
    fn test_locate_rotated_half_turn() {
        let upright = v1_finders(4, 10);
        let rotated = rotate_180(&upright);
        let region = locate(&rotated)[0];
        assert_eq!(region.dimension, 21);
        // Top-left finder is now at the bottom-right of the image
        assert!(region.top_left.x > region.top_right.x);
        assert!(region.top_left.y > region.bottom_left.y);
        assert_eq!(sample(&rotated, &region), sample(&upright, &locate(&upright)[0]));
    }

    #[test]
    fn test_locate_ignores_clutter() {
        let mut m = v1_finders(3, 30);
        for y in 0..4 {
            for x in 0..4 {
                m.set(x, y, true);
                m.set(m.width() - 1 - x, m.height() - 10 - y, true);
            }
        }
        let region = locate(&m)[0];
        assert_eq!(region.top_left, Point::new(40.5, 40.5));
        assert_eq!(region.dimension, 21);
    }

    #[test]
    fn test_locate_needs_three_finders() {
        let mut m = BitMatrix::new(80, 80);
        paint_finder(&mut m, 5, 5, 3);
        paint_finder(&mut m, 50, 5, 3);
        assert!(locate(&m).is_empty());
    }
}
