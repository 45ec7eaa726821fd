//! The four body variants and the shared envelope around them.
//!
//! [`Body<U>`] is the shared envelope and [`BodyKind`] is the sum type over
//! the four variants, rather than a virtual hierarchy; stage dispatch in
//! [`crate::integrate`] and [`crate::narrow`] matches on it.

use serde::{Deserialize, Serialize};

use crate::ids::BodyId;
use crate::vector::{Aabb, Vector2};

/// Horizontal input direction for [`crate::World::player_move`]. `dir == 0`
/// is unrepresentable: a host that wants to stop horizontal movement calls
/// `player_stop` instead, which keeps the zero case out of reach at compile
/// time rather than leaving it as an undefined input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub fn matches_sign(self, s: i8) -> bool {
        match self {
            Direction::Left => s < 0,
            Direction::Right => s > 0,
        }
    }
}

/// Cheap tag used by the collision filter and by callers who only need to
/// know which variant a [`Body`] is without matching on its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyTag {
    Static,
    Player,
    Bounce,
    Bullet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticBody {
    pub size: Vector2,
    pub is_sensor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBody {
    pub size: Vector2,
    /// Origin-centred half-extents, used to rebuild `bounds` from `position`.
    pub normal_bounds: Aabb,
    /// Points per millisecond.
    pub move_speed: f64,
    pub jump_distance: f64,
    pub gravity: f64,
    /// `sqrt(jump_distance / gravity)` — half-period of the jump parabola.
    pub jump_coef: f64,
    pub last_ground_position_y: f64,
    pub force_x: f64,
    pub move_direction_y: i8,
    pub is_on_ground: bool,
    pub jump_init_dir: i8,
    pub jump_timer: Option<f64>,
    pub fall_timer: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CollisionFixCount {
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BounceBody {
    pub size: Vector2,
    pub normal_bounds: Aabb,
    /// Points per millisecond.
    pub force: Vector2,
    pub gravity: f64,
    /// Negated so rebound is upward.
    pub rebound_speed: f64,
    pub move_direction_y: i8,
    pub count_collisions_fix: CollisionFixCount,
}

/// Coefficients of the bullet's line equation `a*x + b*y + c = 0`, stored
/// pre-derived (`a = -force.y`, `b = force.x`, `c = x0*force.y - y0*force.x`)
/// so each edge-intersection probe in [`crate::narrow`] reduces to two
/// multiplies. Purely axial bullets (`force.x == 0.0` or `force.y == 0.0`)
/// yield non-finite `ab`/`ba` and the corresponding probes are skipped: an
/// axis-aligned bullet can never register a hit on the axis it travels
/// along.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineCoefs {
    pub ab: f64,
    pub ba: f64,
    pub ca: f64,
    pub cb: f64,
}

impl LineCoefs {
    pub fn from_origin_and_force(origin: Vector2, force: Vector2) -> Self {
        let a = -force.y;
        let b = force.x;
        let c = origin.x * force.y - origin.y * force.x;
        LineCoefs {
            ab: a / b,
            ba: b / a,
            ca: c / a,
            cb: c / b,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletBody {
    pub prev_position: Vector2,
    /// Points per millisecond.
    pub force: Vector2,
    pub owner_id: Option<BodyId>,
    pub long_of_life: Option<f64>,
    pub long: f64,
    pub coefs: LineCoefs,
}

/// The sum type over the four body variants, in place of an inheritance
/// hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyKind {
    Static(StaticBody),
    Player(PlayerBody),
    Bounce(BounceBody),
    Bullet(BulletBody),
}

impl BodyKind {
    pub fn tag(&self) -> BodyTag {
        match self {
            BodyKind::Static(_) => BodyTag::Static,
            BodyKind::Player(_) => BodyTag::Player,
            BodyKind::Bounce(_) => BodyTag::Bounce,
            BodyKind::Bullet(_) => BodyTag::Bullet,
        }
    }

    pub fn as_static(&self) -> Option<&StaticBody> {
        match self {
            BodyKind::Static(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerBody> {
        match self {
            BodyKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_bounce(&self) -> Option<&BounceBody> {
        match self {
            BodyKind::Bounce(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bullet(&self) -> Option<&BulletBody> {
        match self {
            BodyKind::Bullet(b) => Some(b),
            _ => None,
        }
    }
}

/// The shared envelope every body carries regardless of variant:
/// identity, live bounds, the host's opaque payload, and broad-phase
/// bookkeeping. The region list, its cached joined-key form, and the
/// moved-or-resized flag live here rather than per-variant, since the grid
/// only ever touches the envelope.
#[derive(Debug, Clone)]
pub struct Body<U> {
    pub(crate) id: BodyId,
    pub kind: BodyKind,
    pub position: Vector2,
    pub bounds: Aabb,
    pub user_data: U,
    pub(crate) regions: Option<Vec<BodyRegion>>,
    pub(crate) regions_key: Option<String>,
    pub(crate) is_updated: bool,
}

pub(crate) type BodyRegion = crate::ids::RegionKey;

impl<U> Body<U> {
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn tag(&self) -> BodyTag {
        self.kind.tag()
    }

    pub fn is_sensor(&self) -> bool {
        matches!(&self.kind, BodyKind::Static(s) if s.is_sensor)
    }

    pub(crate) fn new(id: BodyId, kind: BodyKind, position: Vector2, bounds: Aabb, user_data: U) -> Self {
        Body {
            id,
            kind,
            position,
            bounds,
            user_data,
            regions: None,
            regions_key: None,
            is_updated: false,
        }
    }
}

/// Parameters for [`crate::World::create_static_body`].
#[derive(Debug, Clone, Copy)]
pub struct StaticSpec {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub is_sensor: bool,
}

/// Parameters for [`crate::World::create_player_body`]. `move_speed` and
/// `jump_distance` default to `0.4` points/ms and `height * 1.1`
/// respectively when left `None`.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSpec {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub move_speed: Option<f64>,
    pub jump_distance: Option<f64>,
}

/// Parameters for [`crate::World::create_bounce_body`]. `force` is in
/// points per second; the engine integrates in points per millisecond.
#[derive(Debug, Clone, Copy)]
pub struct BounceSpec {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub force: Vector2,
}

/// Parameters for [`crate::World::create_bullet_body`]. `force` is in
/// points per second.
#[derive(Debug, Clone, Copy)]
pub struct BulletSpec {
    pub x: f64,
    pub y: f64,
    pub force: Vector2,
    pub owner_id: Option<BodyId>,
    pub long_of_life: Option<f64>,
}

/// Divides a points-per-second force into the points-per-millisecond unit
/// the integrators use.
pub(crate) fn force_per_ms(force_per_sec: Vector2) -> Vector2 {
    force_per_sec.scale(1.0 / 1000.0)
}

pub(crate) fn build_static<U>(id: BodyId, spec: StaticSpec, user_data: U) -> Body<U> {
    debug_assert!(spec.width > 0.0 && spec.height > 0.0, "static body must have positive size");
    debug_assert!(
        spec.x.is_finite() && spec.y.is_finite(),
        "static body position must be finite"
    );
    let position = Vector2::new(spec.x, spec.y);
    let size = Vector2::new(spec.width, spec.height);
    let bounds = Aabb::centered(position, size);
    Body::new(
        id,
        BodyKind::Static(StaticBody { size, is_sensor: spec.is_sensor }),
        position,
        bounds,
        user_data,
    )
}

pub(crate) fn build_player<U>(id: BodyId, spec: PlayerSpec, gravity: f64, user_data: U) -> Body<U> {
    debug_assert!(spec.width > 0.0 && spec.height > 0.0, "player body must have positive size");
    debug_assert!(gravity > 0.0, "player gravity must be positive");
    debug_assert!(
        spec.x.is_finite() && spec.y.is_finite(),
        "player body position must be finite"
    );
    let position = Vector2::new(spec.x, spec.y);
    let size = Vector2::new(spec.width, spec.height);
    let jump_distance = spec.jump_distance.unwrap_or(spec.height * 1.1);
    debug_assert!(jump_distance > 0.0, "player jump_distance must be positive");
    let normal_bounds = Aabb::centered(Vector2::ZERO, size);
    let player = PlayerBody {
        size,
        normal_bounds,
        move_speed: spec.move_speed.unwrap_or(0.4),
        jump_distance,
        gravity,
        jump_coef: (jump_distance / gravity).sqrt(),
        last_ground_position_y: spec.y,
        force_x: 0.0,
        move_direction_y: 0,
        is_on_ground: false,
        jump_init_dir: 0,
        jump_timer: None,
        fall_timer: None,
    };
    let bounds = Aabb::centered(position, size);
    Body::new(id, BodyKind::Player(player), position, bounds, user_data)
}

pub(crate) fn build_bounce<U>(id: BodyId, spec: BounceSpec, gravity: f64, user_data: U) -> Body<U> {
    debug_assert!(spec.width > 0.0 && spec.height > 0.0, "bounce body must have positive size");
    debug_assert!(
        spec.x.is_finite() && spec.y.is_finite(),
        "bounce body position must be finite"
    );
    debug_assert!(
        spec.force.x.is_finite() && spec.force.y.is_finite(),
        "bounce body force must be finite"
    );
    let position = Vector2::new(spec.x, spec.y);
    let size = Vector2::new(spec.width, spec.height);
    let normal_bounds = Aabb::centered(Vector2::ZERO, size);
    let force = force_per_ms(spec.force);
    let bounce = BounceBody {
        size,
        normal_bounds,
        force,
        gravity,
        rebound_speed: -force.y.abs(),
        move_direction_y: if force.y > 0.0 { 1 } else if force.y < 0.0 { -1 } else { 0 },
        count_collisions_fix: CollisionFixCount::default(),
    };
    let bounds = Aabb::centered(position, size);
    Body::new(id, BodyKind::Bounce(bounce), position, bounds, user_data)
}

pub(crate) fn build_bullet<U>(id: BodyId, spec: BulletSpec, user_data: U) -> Body<U> {
    debug_assert!(
        spec.x.is_finite() && spec.y.is_finite(),
        "bullet body position must be finite"
    );
    debug_assert!(
        spec.force.x.is_finite() && spec.force.y.is_finite(),
        "bullet body force must be finite"
    );
    let position = Vector2::new(spec.x, spec.y);
    let force = force_per_ms(spec.force);
    let coefs = LineCoefs::from_origin_and_force(position, force);
    let bullet = BulletBody {
        prev_position: position,
        force,
        owner_id: spec.owner_id,
        long_of_life: spec.long_of_life,
        long: 0.0,
        coefs,
    };
    // A bullet's bounds start as a degenerate point; stage 1 of the first
    // sub-step refreshes them from the prev->current segment immediately.
    let bounds = Aabb::new(position, position);
    let mut body = Body::new(id, BodyKind::Bullet(bullet), position, bounds, user_data);
    body.is_updated = true;
    body
}
