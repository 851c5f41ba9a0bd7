//! Geometry primitives and numeric helpers.
//!
//! This module provides:
//! - 2D points and affine transforms used throughout the crate
//! - The shared epsilon used by index searches and interpolation
//! - The unscaled log-normal weight used by guideline scoring

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Shared tolerance for index searches, interpolation clamping, and
/// degenerate-geometry checks.
pub const EPSILON: f64 = 1e-9;

/// A 2D point (or vector) with `f64` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product with another vector.
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Squared Euclidean norm.
    pub fn norm2(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean norm.
    pub fn norm(self) -> f64 {
        self.norm2().sqrt()
    }

    /// Distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        (other - self).norm()
    }

    /// Counter-clockwise perpendicular vector.
    pub fn rotate90(self) -> Point {
        Point::new(-self.y, self.x)
    }

    /// Returns the unit vector, or zero when the norm is degenerate.
    pub fn normalized(self) -> Point {
        let n2 = self.norm2();
        if n2 > EPSILON * EPSILON {
            self * (1.0 / n2.sqrt())
        } else {
            Point::ZERO
        }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Row-major 2x3 affine transform:
///
/// ```text
/// | a11 a12 a13 |
/// | a21 a22 a23 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a11: f64,
    pub a12: f64,
    pub a13: f64,
    pub a21: f64,
    pub a22: f64,
    pub a23: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a11: 1.0,
        a12: 0.0,
        a13: 0.0,
        a21: 0.0,
        a22: 1.0,
        a23: 0.0,
    };

    /// Pure translation by `(x, y)`.
    pub fn translation(x: f64, y: f64) -> Self {
        Affine {
            a13: x,
            a23: y,
            ..Self::IDENTITY
        }
    }

    /// Uniform scale about the origin.
    pub fn scale(s: f64) -> Self {
        Affine {
            a11: s,
            a22: s,
            ..Self::IDENTITY
        }
    }

    /// Rotation about the origin by `angle` radians.
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Affine {
            a11: cos,
            a12: -sin,
            a13: 0.0,
            a21: sin,
            a22: cos,
            a23: 0.0,
        }
    }

    /// Applies the transform to a point.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a11 * p.x + self.a12 * p.y + self.a13,
            self.a21 * p.x + self.a22 * p.y + self.a23,
        )
    }

    /// Applies only the linear part (no translation), for directions.
    pub fn apply_vector(&self, v: Point) -> Point {
        Point::new(self.a11 * v.x + self.a12 * v.y, self.a21 * v.x + self.a22 * v.y)
    }

    /// Composition: `self * other` applies `other` first.
    pub fn compose(&self, other: &Affine) -> Affine {
        Affine {
            a11: self.a11 * other.a11 + self.a12 * other.a21,
            a12: self.a11 * other.a12 + self.a12 * other.a22,
            a13: self.a11 * other.a13 + self.a12 * other.a23 + self.a13,
            a21: self.a21 * other.a11 + self.a22 * other.a21,
            a22: self.a21 * other.a12 + self.a22 * other.a22,
            a23: self.a21 * other.a13 + self.a22 * other.a23 + self.a23,
        }
    }

    /// Determinant of the linear part.
    pub fn det(&self) -> f64 {
        self.a11 * self.a22 - self.a12 * self.a21
    }

    /// Inverse transform. Returns identity for a degenerate matrix.
    pub fn invert(&self) -> Affine {
        let det = self.det();
        if det.abs() <= EPSILON * EPSILON {
            return Affine::IDENTITY;
        }
        let inv = 1.0 / det;
        Affine {
            a11: self.a22 * inv,
            a12: -self.a12 * inv,
            a13: (self.a12 * self.a23 - self.a22 * self.a13) * inv,
            a21: -self.a21 * inv,
            a22: self.a11 * inv,
            a23: (self.a21 * self.a13 - self.a11 * self.a23) * inv,
        }
    }
}

/// Axis-aligned rectangle with `f64` bounds, used for view clipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Returns the four corner points.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }
}

/// Unscaled log-normal density used as the arc-length weighting kernel in
/// guideline scoring. Returns 0 for non-positive `x`.
pub fn log_normal_unscaled(x: f64, x0: f64, w: f64) -> f64 {
    if x <= EPSILON {
        return 0.0;
    }
    let t = (x / x0).ln() / w;
    (-0.5 * t * t).exp() / x
}

/// Linear blend of two scalars: `a*(1-l) + b*l`.
pub fn lerp(a: f64, b: f64, l: f64) -> f64 {
    a * (1.0 - l) + b * l
}

/// Linear blend of two points.
pub fn lerp_point(a: Point, b: Point, l: f64) -> Point {
    a * (1.0 - l) + b * l
}
