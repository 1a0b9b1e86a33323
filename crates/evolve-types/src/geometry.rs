//! Geometry and math utilities: vectors, rectangles, clamping, distances.
//!
//! Positions are top-left corners in arena coordinates, with x growing to
//! the right and y growing downward. All functions here are pure.

use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Smallest magnitude treated as a real distance.
///
/// Direction and force computations clamp to this value instead of dividing
/// by (near) zero.
pub const MAGNITUDE_EPSILON: f64 = 1e-6;

/// A 2D vector of `f64` components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Build a vector from its components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.x.mul_add(other.x, self.y * other.y)
    }

    /// Unit vector in the same direction, or `None` when the length is
    /// below [`MAGNITUDE_EPSILON`].
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len <= MAGNITUDE_EPSILON {
            None
        } else {
            Some(Self::new(self.x / len, self.y / len))
        }
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Build a rectangle from a top-left corner and a size.
    pub const fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.x,
            height: size.y,
        }
    }

    /// Top-left corner.
    pub const fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Width and height as a vector.
    pub const fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Right edge (`x + width`).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Geometric center.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap test. Rectangles that only share an edge do not
    /// overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Whether this rectangle lies fully inside `[lower, upper]` on both axes.
    pub fn is_within(&self, lower: Vec2, upper: Vec2) -> bool {
        self.x >= lower.x && self.y >= lower.y && self.right() <= upper.x && self.bottom() <= upper.y
    }
}

/// Grid coordinates of a board sector: `i` is the column (x), `j` the row (y).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectorIndex {
    /// Column index.
    pub i: usize,
    /// Row index.
    pub j: usize,
}

impl SectorIndex {
    /// Build a sector index.
    pub const fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

/// Distance from one agent to another, as stored in neighbor caches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    /// The agent the distance was measured from.
    pub from: AgentId,
    /// The agent the distance was measured to.
    pub to: AgentId,
    /// Euclidean distance between the two positions.
    pub value: f64,
}

impl core::fmt::Display for Distance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "<Distance: from {} to {} is {}>", self.from, self.to, self.value)
    }
}

/// Clamp `value` into `[lower, upper]`.
///
/// Returns the clamped value and whether clamping changed it.
pub fn clamp(value: f64, lower: f64, upper: f64) -> (f64, bool) {
    if value < lower {
        (lower, true)
    } else if value > upper {
        (upper, true)
    } else {
        (value, false)
    }
}

/// Euclidean distance between two points, floored at [`MAGNITUDE_EPSILON`].
pub fn distance(a: Vec2, b: Vec2) -> f64 {
    (b - a).length().max(MAGNITUDE_EPSILON)
}
