//! Board coordinates and bounding boxes.
//!
//! Coordinates are integer nanometres, as on the host board, so pure
//! translations are exact. Angles are degrees, positive counter-clockwise as
//! seen on screen (the y axis points down).

use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

/// Nanometres.
pub type Coord = i64;

pub const NM_PER_MM: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub fn from_mm(x: f64, y: f64) -> Self {
        Self {
            x: (x * NM_PER_MM).round() as Coord,
            y: (y * NM_PER_MM).round() as Coord,
        }
    }

    /// Rotate about `center` by `angle` degrees.
    ///
    /// Quarter turns are computed exactly; other angles are rounded to the
    /// nearest nanometre.
    pub fn rotated_about(self, center: Point, angle: f64) -> Point {
        let d = self - center;
        let angle = normalize_angle(angle);

        let rotated = if angle == 0.0 {
            d
        } else if angle == 90.0 {
            Point::new(d.y, -d.x)
        } else if angle == 180.0 {
            Point::new(-d.x, -d.y)
        } else if angle == 270.0 {
            Point::new(-d.y, d.x)
        } else {
            let (sin, cos) = angle.to_radians().sin_cos();
            let (dx, dy) = (d.x as f64, d.y as f64);
            Point::new(
                (dx * cos + dy * sin).round() as Coord,
                (dy * cos - dx * sin).round() as Coord,
            )
        };

        center + rotated
    }

    /// Mirror top/bottom about the horizontal line through `center`.
    pub fn mirrored_y(self, center: Point) -> Point {
        Point::new(self.x, 2 * center.y - self.y)
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

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Normalize an angle into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// Axis-aligned box. `min` is closest to negative infinity on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Smallest box around all `points`; empty if there are none.
    pub fn around(points: impl IntoIterator<Item = Point>) -> Self {
        points
            .into_iter()
            .fold(Self::empty(), |bbox, p| bbox.union(&Self::from_points(p, p)))
    }

    /// A box containing nothing. Union with it is the identity.
    pub fn empty() -> Self {
        Self {
            min: Point::new(Coord::MAX, Coord::MAX),
            max: Point::new(Coord::MIN, Coord::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow by `delta` on every side.
    pub fn inflated(&self, delta: Coord) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        BoundingBox {
            min: Point::new(self.min.x - delta, self.min.y - delta),
            max: Point::new(self.max.x + delta, self.max.y + delta),
        }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.contains_point(other.min)
            && self.contains_point(other.max)
    }

    /// The boxes share at least one point.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }
}

/// Anything occupying board area.
pub trait Bounded {
    fn bounding_box(&self) -> BoundingBox;
}
