use super::Point;

/// A 2D affine transform.
///
/// Stored as the six free coefficients of
///
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0  1  |
/// ```
///
/// so a point maps as `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

/// Local transform components recovered from a matrix by [`Matrix::decompose`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    pub position: Point,
    pub scale: Point,
    pub skew: Point,
    pub rotation: f32,
}

impl Matrix {
    /// Identity matrix (no transformation)
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Create a matrix from raw coefficients.
    pub fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Create an identity transform
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Create a translation transform
    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            tx: x,
            ty: y,
            ..Self::IDENTITY
        }
    }

    /// Create a rotation transform (radians, clockwise in y-down space)
    pub fn rotate(angle_radians: f32) -> Self {
        let cos = angle_radians.cos();
        let sin = angle_radians.sin();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Create a non-uniform scale transform
    pub fn scale_xy(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Compose this transform with another: `self * other`.
    /// Applies `other` first, then `self`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            tx: self.a * other.tx + self.c * other.ty + self.tx,
            ty: self.b * other.tx + self.d * other.ty + self.ty,
        }
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Compute the inverse of this transform.
    ///
    /// A degenerate matrix (zero determinant) inverts to the identity.
    pub fn inverse(&self) -> Matrix {
        let det = self.determinant();
        if det.abs() < 1e-10 {
            return Self::IDENTITY;
        }
        let inv_det = 1.0 / det;

        Matrix {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            tx: (self.c * self.ty - self.d * self.tx) * inv_det,
            ty: (self.b * self.tx - self.a * self.ty) * inv_det,
        }
    }

    /// Transform a 2D point by this matrix
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Transform a [`Point`] by this matrix
    pub fn apply(&self, p: Point) -> Point {
        let (x, y) = self.transform_point(p.x, p.y);
        Point::new(x, y)
    }

    /// Split the matrix into position/scale/skew/rotation relative to `pivot`.
    ///
    /// When the two skew angles agree (a pure rotation) the result carries a
    /// rotation and zero skew, otherwise zero rotation and both skews.
    pub fn decompose(&self, pivot: Point) -> Decomposed {
        let skew_x = -(-self.c).atan2(self.d);
        let skew_y = self.b.atan2(self.a);
        let delta = (skew_x + skew_y).abs();

        let (rotation, skew) = if delta < 0.00001
            || (std::f32::consts::TAU - delta).abs() < 0.00001
        {
            (skew_y, Point::ZERO)
        } else {
            (0.0, Point::new(skew_x, skew_y))
        };

        Decomposed {
            position: Point::new(
                self.tx + (pivot.x * self.a + pivot.y * self.c),
                self.ty + (pivot.x * self.b + pivot.y * self.d),
            ),
            scale: Point::new(
                (self.a * self.a + self.b * self.b).sqrt(),
                (self.c * self.c + self.d * self.d).sqrt(),
            ),
            skew,
            rotation,
        }
    }

    /// Coefficients in `[a, b, c, d, tx, ty]` order
    pub fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.tx, self.ty]
    }

    /// Check if this is the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Compare coefficient-wise within `epsilon`.
    pub fn approx_eq(&self, other: &Matrix, epsilon: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl crate::pool::Poolable for Matrix {
    fn reset(&mut self) {
        *self = Self::IDENTITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_identity() {
        let t = Matrix::identity();
        assert_eq!(t, Matrix::IDENTITY);
        assert!(t.is_identity());
    }

    #[test]
    fn test_translate() {
        let t = Matrix::translate(10.0, 20.0);
        let (x, y) = t.transform_point(5.0, 5.0);
        assert!(approx_eq(x, 15.0));
        assert!(approx_eq(y, 25.0));
    }

    #[test]
    fn test_rotate() {
        let t = Matrix::rotate(std::f32::consts::FRAC_PI_2);
        let (x, y) = t.transform_point(1.0, 0.0);
        assert!(approx_eq(x, 0.0));
        assert!(approx_eq(y, 1.0));
    }

    #[test]
    fn test_scale_xy() {
        let t = Matrix::scale_xy(2.0, 3.0);
        let (x, y) = t.transform_point(1.0, 1.0);
        assert!(approx_eq(x, 2.0));
        assert!(approx_eq(y, 3.0));
    }

    #[test]
    fn test_compose() {
        // scale.then(translate): first translate, then scale
        // Point (0,0) -> translate -> (10,0) -> scale -> (20,0)
        let composed = Matrix::scale_xy(2.0, 2.0).then(&Matrix::translate(10.0, 0.0));
        let (x, y) = composed.transform_point(0.0, 0.0);
        assert!(approx_eq(x, 20.0));
        assert!(approx_eq(y, 0.0));
    }

    #[test]
    fn test_inverse() {
        let t = Matrix::translate(10.0, 20.0)
            .then(&Matrix::rotate(30f32.to_radians()))
            .then(&Matrix::scale_xy(2.0, 0.5));
        let composed = t.then(&t.inverse());
        assert!(composed.approx_eq(&Matrix::IDENTITY, 1e-5));
    }

    #[test]
    fn test_degenerate_inverse_is_identity() {
        assert_eq!(Matrix::scale_xy(0.0, 0.0).inverse(), Matrix::IDENTITY);
    }

    #[test]
    fn test_decompose_rotation() {
        let m = Matrix::translate(5.0, 6.0)
            .then(&Matrix::rotate(0.5))
            .then(&Matrix::scale_xy(2.0, 3.0));
        let parts = m.decompose(Point::ZERO);
        assert!(approx_eq(parts.rotation, 0.5));
        assert_eq!(parts.skew, Point::ZERO);
        assert!(approx_eq(parts.scale.x, 2.0));
        assert!(approx_eq(parts.scale.y, 3.0));
        assert!(approx_eq(parts.position.x, 5.0));
        assert!(approx_eq(parts.position.y, 6.0));
    }

    #[test]
    fn test_decompose_skew() {
        // Shear only along x: skew_x != -skew_y
        let m = Matrix::new(1.0, 0.0, 0.5, 1.0, 0.0, 0.0);
        let parts = m.decompose(Point::ZERO);
        assert_eq!(parts.rotation, 0.0);
        assert!(parts.skew.x != 0.0);
    }
}
