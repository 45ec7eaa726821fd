//! Stable handles for bodies, and the small key types the broad phase hashes
//! on.
//!
//! [`slotmap`] is the arena bodies live in: [`BodyId`] is a generational
//! key, cheap to copy and compare, and automatically invalidated once its
//! slot is reused.

use std::fmt;

slotmap::new_key_type! {
    /// Handle to a body inside a [`crate::World`]. Stable for the lifetime
    /// of the slot; a stale `BodyId` (from a body already removed) simply
    /// fails to resolve rather than aliasing a newer body in the same slot.
    pub struct BodyId;
}

/// One 512x512 cell of the infinite uniform broad-phase grid.
///
/// World coordinates map to a region by flooring to an integer and taking
/// an arithmetic right shift of 9 bits (`512 == 1 << 9`), which floors
/// toward negative infinity for integer inputs — callers are expected to
/// keep static geometry at integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub sx: i32,
    pub sy: i32,
}

impl RegionKey {
    pub const CELL_SHIFT: i32 = 9;

    pub fn from_world(x: f64, y: f64) -> Self {
        RegionKey {
            sx: (x.floor() as i32) >> Self::CELL_SHIFT,
            sy: (y.floor() as i32) >> Self::CELL_SHIFT,
        }
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sx, self.sy)
    }
}

/// An order-independent key for a candidate pair: two bodies `a` and `b`
/// always hash to the same [`PairKey`] regardless of which one the caller
/// found first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(BodyId, BodyId);

impl PairKey {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a < b {
            PairKey(a, b)
        } else {
            PairKey(b, a)
        }
    }

    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_key_floors_toward_negative_infinity() {
        assert_eq!(RegionKey::from_world(0.0, 0.0), RegionKey { sx: 0, sy: 0 });
        assert_eq!(RegionKey::from_world(511.9, 0.0), RegionKey { sx: 0, sy: 0 });
        assert_eq!(RegionKey::from_world(512.0, 0.0), RegionKey { sx: 1, sy: 0 });
        assert_eq!(RegionKey::from_world(-1.0, 0.0), RegionKey { sx: -1, sy: 0 });
        assert_eq!(RegionKey::from_world(-512.0, 0.0), RegionKey { sx: -1, sy: 0 });
        assert_eq!(RegionKey::from_world(-513.0, 0.0), RegionKey { sx: -2, sy: 0 });
    }

    #[test]
    fn region_key_canonical_string_form() {
        let r = RegionKey { sx: -3, sy: 7 };
        assert_eq!(r.to_string(), "-3:7");
    }
}
