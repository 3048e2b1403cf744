//! Screen-space geometry: rectangles, axes and the four facings.
//!
//! Coordinates follow screen convention: `x` grows to the right and `y`
//! grows downward, so `Facing::Up` is the vector `(0, -1)`.
//!
//! Rectangle intersection is strict: two rectangles that merely share an edge
//! do not intersect. The collision resolver relies on this so that an actor
//! clamped flush against a wall is no longer considered overlapping it.

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::UnknownDirection;

// =============================================================================
// Rect
// =============================================================================

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Creates a rectangle of `size` centered on `center`.
    #[must_use]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Top-left corner.
    #[must_use]
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Size as a vector.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Moves the rectangle so its left edge is at `value`.
    pub fn set_left(&mut self, value: f32) {
        self.x = value;
    }

    /// Moves the rectangle so its right edge is at `value`.
    pub fn set_right(&mut self, value: f32) {
        self.x = value - self.w;
    }

    /// Moves the rectangle so its top edge is at `value`.
    pub fn set_top(&mut self, value: f32) {
        self.y = value;
    }

    /// Moves the rectangle so its bottom edge is at `value`.
    pub fn set_bottom(&mut self, value: f32) {
        self.y = value - self.h;
    }

    /// Moves the rectangle so it is centered on `center`.
    pub fn set_center(&mut self, center: Vec2) {
        self.x = center.x - self.w / 2.0;
        self.y = center.y - self.h / 2.0;
    }

    /// Translates the rectangle in place.
    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Returns a copy translated by `delta`.
    #[must_use]
    pub fn offset(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.w, self.h)
    }

    /// Strict overlap test; touching edges do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

// =============================================================================
// Axis
// =============================================================================

/// One of the two movement axes resolved separately by the collision resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// The x axis.
    Horizontal,
    /// The y axis.
    Vertical,
}

impl Axis {
    /// A vector with `value` on this axis and zero on the other.
    #[must_use]
    pub fn vector(self, value: f32) -> Vec2 {
        match self {
            Axis::Horizontal => Vec2::new(value, 0.0),
            Axis::Vertical => Vec2::new(0.0, value),
        }
    }
}

// =============================================================================
// Facing
// =============================================================================

/// The four sprite facings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Toward the top of the screen.
    Up,
    /// Toward the bottom of the screen.
    #[default]
    Down,
    /// Toward the left of the screen.
    Left,
    /// Toward the right of the screen.
    Right,
}

impl Facing {
    /// All facings in a fixed order.
    pub const ALL: [Facing; 4] = [Facing::Up, Facing::Down, Facing::Left, Facing::Right];

    /// Unit vector for this facing.
    #[must_use]
    pub fn vector(self) -> Vec2 {
        match self {
            Facing::Up => Vec2::new(0.0, -1.0),
            Facing::Down => Vec2::new(0.0, 1.0),
            Facing::Left => Vec2::new(-1.0, 0.0),
            Facing::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// The opposite facing.
    #[must_use]
    pub fn opposite(self) -> Facing {
        match self {
            Facing::Up => Facing::Down,
            Facing::Down => Facing::Up,
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// The axis this facing moves along.
    #[must_use]
    pub fn axis(self) -> Axis {
        match self {
            Facing::Up | Facing::Down => Axis::Vertical,
            Facing::Left | Facing::Right => Axis::Horizontal,
        }
    }

    /// Quarter turn clockwise on screen: down, left, up, right.
    #[must_use]
    pub fn turned_clockwise(self) -> Facing {
        match self {
            Facing::Down => Facing::Left,
            Facing::Left => Facing::Up,
            Facing::Up => Facing::Right,
            Facing::Right => Facing::Down,
        }
    }

    /// Snaps a continuous vector to its dominant axis.
    ///
    /// Ties go to the horizontal axis. Returns `None` for the zero vector.
    #[must_use]
    pub fn from_vector(v: Vec2) -> Option<Facing> {
        if v.x == 0.0 && v.y == 0.0 {
            return None;
        }
        if v.x.abs() >= v.y.abs() {
            Some(if v.x < 0.0 { Facing::Left } else { Facing::Right })
        } else {
            Some(if v.y < 0.0 { Facing::Up } else { Facing::Down })
        }
    }

    /// Lowercase label used in data files and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Facing::Up => "up",
            Facing::Down => "down",
            Facing::Left => "left",
            Facing::Right => "right",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Facing {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Facing::Up),
            "down" => Ok(Facing::Down),
            "left" => Ok(Facing::Left),
            "right" => Ok(Facing::Right),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
