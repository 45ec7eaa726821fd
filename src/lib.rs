//! A deterministic 2D axis-aligned physics step engine for an authoritative
//! multiplayer platformer server.
//!
//! A [`World<U>`] owns a flat collection of bodies (static geometry,
//! players, elastic bounce bodies, and swept-segment bullets) plus a
//! region-hashed broad phase. [`World::update`] decomposes an elapsed
//! wall-clock interval into sub-steps no larger than
//! [`config::MAX_SUBSTEP_MS`] and, for each, runs a fixed five-stage
//! pipeline — integrate, purge, re-index, detect, resolve — before arming
//! any idle airborne player's fall timer. Each call returns the ordered
//! sensor events (world-escapes, sensor overlaps, bullet hits) generated
//! along the way; positions are mutated in place on the bodies themselves.
//!
//! The body payload type `U` is opaque to the engine: it is never read,
//! only carried, cloned into [`sensor::BodySnapshot`] when an event needs to
//! report a body's state without a follow-up lookup.
//!
//! This crate has no networking, no entity/input model, and no rendering —
//! those are a host's concern. It also has no runtime error paths:
//! malformed construction input is undefined behaviour the host must
//! prevent (checked by `debug_assert!` in debug builds), and
//! [`World::check_invariants`] is test/debug tooling, not a hot-path
//! validation step.

mod body;
mod config;
mod error;
mod grid;
mod ids;
mod integrate;
mod narrow;
mod sensor;
mod vector;
mod world;

pub use body::{
    BodyKind, BodyTag, BounceBody, BounceSpec, BulletBody, BulletSpec, Direction, LineCoefs, PlayerBody, PlayerSpec,
    StaticBody, StaticSpec,
};
pub use body::Body;
pub use config::{WorldConfig, DEFAULT_GRAVITY, MAX_SUBSTEP_MS};
pub use error::InvariantViolation;
pub use ids::{BodyId, PairKey, RegionKey};
pub use sensor::{BodySnapshot, SensorEvent};
pub use vector::{Aabb, Vector2};
pub use world::World;
