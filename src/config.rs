//! World configuration.
//!
//! This crate has no process entry point of its own, so the tunables a
//! binary would otherwise take as CLI flags are instead a plain struct
//! passed to [`crate::World::new`].

use crate::vector::Aabb;

/// The public step clamps each sub-step to this many milliseconds before
/// invoking the internal pipeline.
pub const MAX_SUBSTEP_MS: f64 = 33.0;

/// Default gravity, carried here as the library default rather than
/// re-derived by every caller.
pub const DEFAULT_GRAVITY: f64 = 0.001;

/// Construction parameters for a [`crate::World`].
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    /// World-space bounds used by the out-of-world sensor check. `None`
    /// means unbounded on both axes.
    pub bounds: Option<Aabb>,
    /// Injected into every player/bounce body created afterward, unless a
    /// body-specific override is added in a future factory revision.
    pub gravity: f64,
    /// Upper bound on a single internal sub-step, in milliseconds.
    pub max_substep_ms: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            bounds: None,
            gravity: DEFAULT_GRAVITY,
            max_substep_ms: MAX_SUBSTEP_MS,
        }
    }
}
