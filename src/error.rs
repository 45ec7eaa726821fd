//! Invariant verification for tests and debug tooling.
//!
//! The engine itself has no runtime error paths — malformed construction
//! input is undefined behaviour the host must prevent. This module is a
//! structured way to *check* the engine's broad-phase and fix-count
//! invariants after the fact.

use std::fmt;

use crate::ids::{BodyId, PairKey};

/// One of the engine's invariants failed to hold. Returned by
/// [`crate::World::check_invariants`]; never produced by normal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A pair's reference count didn't match the number of regions the two
    /// bodies actually co-reside in.
    PairCountMismatch { pair: PairKey, recorded: u32, actual: u32 },
    /// A body appears in a region's member list but that region is absent
    /// from the body's own `regions`.
    RegionMembershipMismatch { body: BodyId },
    /// A step returned with bodies still queued for removal.
    PendingRemovalAfterStep { body: BodyId },
    /// A bounce body's fix-count counter exceeded the documented bound.
    BounceFixCountOverflow { body: BodyId, axis: &'static str, count: u8 },
    /// A pair was materialised between two bodies that `can_collide` would
    /// reject (same type, or a bounce paired with a non-static).
    IllegalPair { pair: PairKey },
    /// A bullet paired against the body whose id equals its `owner_id`.
    BulletPairedWithOwner { bullet: BodyId, owner: BodyId },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::PairCountMismatch { pair, recorded, actual } => write!(
                f,
                "pair {pair:?} recorded count {recorded} but bodies co-reside in {actual} region(s)"
            ),
            InvariantViolation::RegionMembershipMismatch { body } => {
                write!(f, "body {body:?} occupies a region that is not in its own region list")
            }
            InvariantViolation::PendingRemovalAfterStep { body } => {
                write!(f, "body {body:?} still queued for removal after step returned")
            }
            InvariantViolation::BounceFixCountOverflow { body, axis, count } => {
                write!(f, "bounce body {body:?} fix-count on axis {axis} reached {count}, above the documented bound")
            }
            InvariantViolation::IllegalPair { pair } => {
                write!(f, "pair {pair:?} exists between two bodies that can_collide forbids")
            }
            InvariantViolation::BulletPairedWithOwner { bullet, owner } => {
                write!(f, "bullet {bullet:?} is paired with its own owner {owner:?}")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}
