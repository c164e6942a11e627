use std::ops::{Add, Mul, Neg, Sub};

use crate::error::FitDegenerate;

/// A 2D point (or vector) in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Squared Euclidean distance, used for every error comparison.
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).dot(self - other)
    }

    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.dot(self).sqrt();
        if len == 0.0 {
            self
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1).
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
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

/// Cubic Bezier segment. `points[0]` and `points[3]` sit on the data,
/// `points[1]` and `points[2]` shape the tangents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierSegment {
    pub points: [Point; 4],
}

/// Ordered chain of segments where each segment ends where the next begins.
pub type CurveSet = Vec<BezierSegment>;

impl BezierSegment {
    pub fn new(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self {
            points: [p0, p1, p2, p3],
        }
    }

    /// Straight connector with control points at 1/3 and 2/3 of the chord.
    pub fn line(start: Point, end: Point) -> Self {
        Self::new(start, start.lerp(end, 1.0 / 3.0), start.lerp(end, 2.0 / 3.0), end)
    }

    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[3]
    }

    /// Point on the curve at parameter `t`.
    pub fn eval(&self, t: f64) -> Point {
        let [p0, p1, p2, p3] = self.points;
        let mt = 1.0 - t;
        p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
    }

    /// First derivative with respect to `t`.
    pub fn derivative(&self, t: f64) -> Point {
        let [p0, p1, p2, p3] = self.points;
        let mt = 1.0 - t;
        (p1 - p0) * (3.0 * mt * mt) + (p2 - p1) * (6.0 * mt * t) + (p3 - p2) * (3.0 * t * t)
    }

    /// Second derivative with respect to `t`.
    pub fn second_derivative(&self, t: f64) -> Point {
        let [p0, p1, p2, p3] = self.points;
        (p2 - p1 * 2.0 + p0) * (6.0 * (1.0 - t)) + (p3 - p2 * 2.0 + p1) * (6.0 * t)
    }

    /// Checks the four-control-point contract: every coordinate is finite.
    pub fn validate(&self, index: usize) -> Result<(), FitDegenerate> {
        if self.points.iter().all(|p| p.is_finite()) {
            Ok(())
        } else {
            Err(FitDegenerate { index })
        }
    }

    /// `[x0, y0, x1, y1, x2, y2, x3, y3]`
    pub fn flatten(&self) -> [f64; 8] {
        let [p0, p1, p2, p3] = self.points;
        [p0.x, p0.y, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y]
    }
}

/// True when every adjacent pair of segments shares its joint exactly.
#[cfg(test)]
pub fn is_continuous(curves: &[BezierSegment]) -> bool {
    curves.windows(2).all(|w| w[0].end() == w[1].start())
}
