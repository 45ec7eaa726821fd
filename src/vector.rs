//! 2D vector and axis-aligned bounding box primitives.
//!
//! Everything in this module is plain scalar arithmetic; the integration unit
//! throughout the engine is points per millisecond (see [`crate::config`]).

use serde::{Deserialize, Serialize};

/// A 2D point or displacement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Vector2 { x, y }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scale(&self, scalar: f64) -> Vector2 {
        Vector2::new(self.x * scalar, self.y * scalar)
    }

    pub fn add(&self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(&self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }
}

/// Axis-aligned bounding box, `min` inclusive, `max` exclusive-by-convention
/// (overlap tests below treat both edges as closed; strict-inequality rules
/// are applied one level up, in `narrow`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vector2,
    pub max: Vector2,
}

impl Aabb {
    pub fn new(min: Vector2, max: Vector2) -> Self {
        Aabb { min, max }
    }

    /// Builds the bounds of a body centred at `position` with the given
    /// full `size` (width, height).
    pub fn centered(position: Vector2, size: Vector2) -> Self {
        let half = size.scale(0.5);
        Aabb::new(position.sub(half), position.add(half))
    }

    /// The axis-aligned hull of two points — used for a bullet's swept
    /// segment bounds.
    pub fn hull_of_segment(a: Vector2, b: Vector2) -> Self {
        Aabb::new(
            Vector2::new(a.x.min(b.x), a.y.min(b.y)),
            Vector2::new(a.x.max(b.x), a.y.max(b.y)),
        )
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains_point(&self, p: Vector2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// `true` if `self`'s X extent lies strictly inside `other`'s X extent.
    pub fn contained_x(&self, other: &Aabb) -> bool {
        self.min.x > other.min.x && self.max.x < other.max.x
    }

    /// `true` if `self`'s Y extent lies strictly inside `other`'s Y extent.
    pub fn contained_y(&self, other: &Aabb) -> bool {
        self.min.y > other.min.y && self.max.y < other.max.y
    }
}
