//! 2D affine transforms

use crate::primitives::Point;

/// 2x3 affine transform
///
/// ```text
/// [a c e]
/// [b d f]
/// [0 0 1]
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn scale_uniform(s: f32) -> Self {
        Self::scale(s, s)
    }

    /// Rotation by `angle` radians
    pub fn rotate(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn skew_x(angle: f32) -> Self {
        Self::new(1.0, 0.0, angle.tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(angle: f32) -> Self {
        Self::new(1.0, angle.tan(), 0.0, 1.0, 0.0, 0.0)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Transform that applies `self` first and then `next`
    pub fn then(&self, next: &Transform2D) -> Transform2D {
        Transform2D {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    /// Inverse transform, or `None` when the matrix is (nearly) singular.
    /// The determinant is evaluated in f64.
    pub fn inverse(&self) -> Option<Transform2D> {
        let (a, b, c, d, e, f) = (
            self.a as f64,
            self.b as f64,
            self.c as f64,
            self.d as f64,
            self.e as f64,
            self.f as f64,
        );
        let det = a * d - c * b;
        if det > -1e-6 && det < 1e-6 {
            return None;
        }
        let invdet = 1.0 / det;
        Some(Transform2D {
            a: (d * invdet) as f32,
            c: (-c * invdet) as f32,
            e: ((c * f - d * e) * invdet) as f32,
            b: (-b * invdet) as f32,
            d: (a * invdet) as f32,
            f: ((b * e - a * f) * invdet) as f32,
        })
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point::new(
            p.x * self.a + p.y * self.c + self.e,
            p.x * self.b + p.y * self.d + self.f,
        )
    }

    /// Mean of the horizontal and vertical scale factors
    pub fn average_scale(&self) -> f32 {
        let sx = (self.a * self.a + self.c * self.c).sqrt();
        let sy = (self.b * self.b + self.d * self.d).sqrt();
        (sx + sy) * 0.5
    }

    /// Column-major 3x3 padded to three vec4 columns, as shader uniforms expect
    pub fn to_mat3x4(&self) -> [[f32; 4]; 3] {
        [
            [self.a, self.b, 0.0, 0.0],
            [self.c, self.d, 0.0, 0.0],
            [self.e, self.f, 1.0, 0.0],
        ]
    }

    pub fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn test_then_order() {
        // Scale first, then translate
        let t = Transform2D::scale(2.0, 2.0).then(&Transform2D::translate(10.0, 0.0));
        assert!(close(t.transform_point(Point::new(1.0, 1.0)), Point::new(12.0, 2.0)));

        // Translate first, then scale
        let t = Transform2D::translate(10.0, 0.0).then(&Transform2D::scale(2.0, 2.0));
        assert!(close(t.transform_point(Point::new(1.0, 1.0)), Point::new(22.0, 2.0)));
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform2D::rotate(0.7)
            .then(&Transform2D::scale(3.0, 0.5))
            .then(&Transform2D::translate(1000.0, -250.0));
        let inv = t.inverse().unwrap();
        let p = Point::new(12.5, -7.25);
        assert!(close(inv.transform_point(t.transform_point(p)), p));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(Transform2D::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_average_scale() {
        assert!((Transform2D::rotate(1.2).average_scale() - 1.0).abs() < 1e-5);
        assert!((Transform2D::scale(2.0, 4.0).average_scale() - 3.0).abs() < 1e-5);
    }
}
