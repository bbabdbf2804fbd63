use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::graph::Edge;

/// Lengths below this are treated as zero when deriving directions.
pub const DEGENERATE_LENGTH: f64 = 1e-9;

/// A 2D position. Serialized as a `[x, y]` pair to match the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Componentwise square, used by every loss term.
    pub fn squared(self) -> Point {
        Point::new(self.x * self.x, self.y * self.y)
    }

    /// Rotates counter-clockwise by `angle` radians.
    pub fn rotated(self, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn axis(self, axis: usize) -> f64 {
        if axis == 0 { self.x } else { self.y }
    }

    pub fn axis_mut(&mut self, axis: usize) -> &mut f64 {
        if axis == 0 { &mut self.x } else { &mut self.y }
    }
}

impl From<[f64; 2]> for Point {
    fn from(value: [f64; 2]) -> Self {
        Point::new(value[0], value[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(value: Point) -> Self {
        [value.x, value.y]
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

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Euclidean distance between two positions.
pub fn length(a: Point, b: Point) -> f64 {
    (a - b).norm()
}

/// Unit vector pointing from `b` towards `a`.
///
/// Coincident points have no direction; they yield [`Point::ZERO`] instead of
/// dividing by zero, so callers get a zero contribution rather than `NaN`.
pub fn orientation(a: Point, b: Point) -> Point {
    let len = length(a, b);
    if len <= DEGENERATE_LENGTH {
        return Point::ZERO;
    }
    (a - b) / len
}

/// 2D cross product (z component of the 3D cross product).
pub fn cross(a: Point, b: Point) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Splits edges into parallel start/end position sequences indexed by edge order.
///
/// Edges must reference valid indices into `positions`; [`crate::Graph::validate`]
/// guarantees this for every graph a session is built from.
pub fn edge_endpoint_positions(positions: &[Point], edges: &[Edge]) -> (Vec<Point>, Vec<Point>) {
    edges
        .iter()
        .map(|edge| (positions[edge.start], positions[edge.end]))
        .unzip()
}

/// Parameters `(t, u)` at which segment `a1 -> a2` meets segment `b1 -> b2`.
///
/// Returns `None` for parallel (or degenerate) segments.
pub fn segment_intersection_params(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<(f64, f64)> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = cross(r, s);
    if denom.abs() <= DEGENERATE_LENGTH {
        return None;
    }
    let offset = b1 - a1;
    Some((cross(offset, s) / denom, cross(offset, r) / denom))
}
