//! Geometric primitives

use std::ops::{Add, Mul, Sub};

/// A 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product; positive when `other` turns left of `self`
    /// in a y-down coordinate system
    pub fn cross(self, other: Point) -> f32 {
        other.x * self.y - self.x * other.y
    }

    /// Normalizes in place and returns the original length.
    /// Vectors shorter than 1e-6 are left untouched.
    pub fn normalize(&mut self) -> f32 {
        let d = self.length();
        if d > 1e-6 {
            let id = 1.0 / d;
            self.x *= id;
            self.y *= id;
        }
        d
    }

    /// Whether two points lie within `tol` of each other
    pub fn approx_eq(self, other: Point, tol: f32) -> bool {
        (other - self).length_squared() < tol * tol
    }

    /// Squared distance from `self` to the segment `p..q`
    pub fn distance_to_segment_squared(self, p: Point, q: Point) -> f32 {
        let pq = q - p;
        let d = pq.length_squared();
        let mut t = pq.dot(self - p);
        if d > 0.0 {
            t /= d;
        }
        let t = t.clamp(0.0, 1.0);
        let closest = p + pq * t;
        (closest - self).length_squared()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned bounds accumulated from points.
///
/// An empty bounds has `min = (+inf, +inf)` and `max = (-inf, -inf)`, so the
/// first included point always tightens both corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min: Point::new(f32::INFINITY, f32::INFINITY),
        max: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn reset(&mut self) {
        *self = Self::EMPTY;
    }

    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn union(&mut self, other: &Bounds) {
        if !other.is_empty() {
            self.include(other.min);
            self.include(other.max);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn width(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.max.x - self.min.x
        }
    }

    pub fn height(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.max.y - self.min.y
        }
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Bounds {
        if self.is_empty() {
            return *self;
        }
        Bounds::new(
            Point::new(self.min.x + dx, self.min.y + dy),
            Point::new(self.max.x + dx, self.max.y + dy),
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_points(p1: Point, p2: Point) -> Self {
        Self::new(
            p1.x.min(p2.x),
            p1.y.min(p2.y),
            (p2.x - p1.x).abs(),
            (p2.y - p1.y).abs(),
        )
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Overlap of two rectangles; disjoint inputs give a zero-sized rect
    pub fn intersect(&self, other: &Rect) -> Rect {
        let minx = self.x.max(other.x);
        let miny = self.y.max(other.y);
        let maxx = (self.x + self.width).min(other.x + other.width);
        let maxy = (self.y + self.height).min(other.y + other.height);
        Rect::new(minx, miny, (maxx - minx).max(0.0), (maxy - miny).max(0.0))
    }
}

/// Corner radius for rounded rectangles
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct CornerRadius {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl CornerRadius {
    pub const fn uniform(radius: f32) -> Self {
        Self {
            top_left: radius,
            top_right: radius,
            bottom_right: radius,
            bottom_left: radius,
        }
    }

    pub const fn new(top_left: f32, top_right: f32, bottom_right: f32, bottom_left: f32) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// All corners below a tenth of a pixel, drawn as a plain rect
    pub fn is_sharp(&self) -> bool {
        self.top_left < 0.1 && self.top_right < 0.1 && self.bottom_right < 0.1 && self.bottom_left < 0.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_reset_then_first_point() {
        let mut b = Bounds::new(Point::new(5.0, 5.0), Point::new(6.0, 6.0));
        b.reset();
        assert!(b.is_empty());
        b.include(Point::new(10.0, -3.0));
        assert_eq!(b.min, Point::new(10.0, -3.0));
        assert_eq!(b.max, Point::new(10.0, -3.0));
        assert!(!b.is_empty());
    }

    #[test]
    fn test_bounds_union_skips_empty() {
        let mut b = Bounds::EMPTY;
        b.union(&Bounds::EMPTY);
        assert!(b.is_empty());
        b.union(&Bounds::new(Point::new(0.0, 0.0), Point::new(2.0, 3.0)));
        assert_eq!(b.width(), 2.0);
        assert_eq!(b.height(), 3.0);
    }

    #[test]
    fn test_rect_intersect_disjoint() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 5.0, 5.0);
        let r = a.intersect(&b);
        assert_eq!(r.width, 0.0);
        assert_eq!(r.height, 0.0);

        let c = a.intersect(&Rect::new(5.0, -5.0, 10.0, 10.0));
        assert_eq!(c, Rect::new(5.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn test_segment_distance() {
        let d = Point::new(5.0, 3.0)
            .distance_to_segment_squared(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 9.0).abs() < 1e-5);
        // Beyond the end clamps to the endpoint
        let d = Point::new(13.0, 4.0)
            .distance_to_segment_squared(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 25.0).abs() < 1e-4);
    }
}
