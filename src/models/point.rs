/// Pixel-space position with sub-pixel precision
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Column, growing to the right
    pub x: f32,
    /// Row, growing downwards
    pub y: f32,
}

impl Point {
    /// Point at (x, y)
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Vector from `self` to `other`
    pub fn to(&self, other: &Point) -> (f32, f32) {
        (other.x - self.x, other.y - self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_vector() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.to(&b), (3.0, 4.0));
    }
}
