use super::{Matrix, Point};

/// An axis-aligned rectangle in `x, y, width, height` form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if a point is inside this rectangle (right/bottom edges exclusive)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Whether the two rectangles share any area.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// An axis-aligned bounding box accumulated from transformed geometry.
///
/// A cleared box is inverted (`min > max`) so the first point added defines
/// it; [`is_empty`](Self::is_empty) reports that state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Bounds containing nothing.
    pub const EMPTY: Self = Self {
        min_x: f32::INFINITY,
        min_y: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        max_y: f32::NEG_INFINITY,
    };

    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    /// True when nothing has been added (or the box was inverted by a fit).
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    pub fn height(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    /// Convert to `x, y, width, height` form; empty bounds map to a zero rect.
    pub fn rectangle(&self) -> Rectangle {
        if self.is_empty() {
            return Rectangle::default();
        }
        Rectangle::new(self.min_x, self.min_y, self.width(), self.height())
    }

    fn add_point(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Add the rectangle `(x0, y0)..(x1, y1)` after transforming its four corners.
    pub fn add_frame(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, matrix: &Matrix) {
        for (x, y) in [(x0, y0), (x1, y0), (x1, y1), (x0, y1)] {
            let (tx, ty) = matrix.transform_point(x, y);
            self.add_point(tx, ty);
        }
    }

    pub fn add_rect(&mut self, rect: &Rectangle, matrix: &Matrix) {
        self.add_frame(
            rect.x,
            rect.y,
            rect.x + rect.width,
            rect.y + rect.height,
            matrix,
        );
    }

    /// Add another box, transformed by `matrix`. Empty boxes are ignored.
    pub fn add_bounds(&mut self, other: &Bounds, matrix: &Matrix) {
        if other.is_empty() {
            return;
        }
        self.add_frame(other.min_x, other.min_y, other.max_x, other.max_y, matrix);
    }

    /// Add interleaved `x, y` positions for vertices `begin..end`.
    pub fn add_vertices(&mut self, positions: &[f32], begin: usize, end: usize, matrix: &Matrix) {
        for i in begin..end {
            let (x, y) = matrix.transform_point(positions[i * 2], positions[i * 2 + 1]);
            self.add_point(x, y);
        }
    }

    /// Replace the box with the bounds of its corners under `matrix`.
    pub fn apply_matrix(&mut self, matrix: &Matrix) {
        if self.is_empty() {
            return;
        }
        let current = *self;
        self.clear();
        self.add_bounds(&current, matrix);
    }

    /// Intersect with `other`.
    pub fn fit(&mut self, other: &Bounds) {
        self.min_x = self.min_x.max(other.min_x);
        self.min_y = self.min_y.max(other.min_y);
        self.max_x = self.max_x.min(other.max_x);
        self.max_y = self.max_y.min(other.max_y);
    }

    /// Grow every edge by `padding`.
    pub fn pad(&mut self, padding: f32) {
        if self.is_empty() {
            return;
        }
        self.min_x -= padding;
        self.min_y -= padding;
        self.max_x += padding;
        self.max_y += padding;
    }

    /// Containment test; edges are inclusive.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl crate::pool::Poolable for Bounds {
    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let b = Bounds::default();
        assert!(b.is_empty());
        assert_eq!(b.width(), 0.0);
        assert_eq!(b.rectangle(), Rectangle::default());
    }

    #[test]
    fn test_add_frame_with_matrix() {
        let mut b = Bounds::EMPTY;
        b.add_frame(0.0, 0.0, 10.0, 5.0, &Matrix::translate(2.0, 3.0));
        assert_eq!(b, Bounds::new(2.0, 3.0, 12.0, 8.0));
    }

    #[test]
    fn test_add_bounds_rotated() {
        let mut b = Bounds::EMPTY;
        b.add_bounds(
            &Bounds::new(0.0, 0.0, 10.0, 10.0),
            &Matrix::rotate(std::f32::consts::FRAC_PI_2),
        );
        assert!((b.min_x - -10.0).abs() < 1e-4);
        assert!((b.max_y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_fit_and_pad() {
        let mut b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        b.fit(&Bounds::new(5.0, -5.0, 20.0, 6.0));
        assert_eq!(b, Bounds::new(5.0, 0.0, 10.0, 6.0));
        b.pad(1.0);
        assert_eq!(b, Bounds::new(4.0, -1.0, 11.0, 7.0));
    }

    #[test]
    fn test_disjoint_fit_is_empty() {
        let mut b = Bounds::new(0.0, 0.0, 1.0, 1.0);
        b.fit(&Bounds::new(5.0, 5.0, 6.0, 6.0));
        assert!(b.is_empty());
    }

    #[test]
    fn test_contains_point() {
        let b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains_point(10.0, 0.0));
        assert!(!b.contains_point(10.1, 0.0));
    }

    #[test]
    fn test_rectangle_intersects() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rectangle::new(9.0, 9.0, 5.0, 5.0)));
        assert!(!a.intersects(&Rectangle::new(10.0, 0.0, 5.0, 5.0)));
    }
}
