//! Narrow phase (AABB overlap, bullet ray probes) and contact resolution.

use std::collections::BTreeMap;

use log::trace;
use slotmap::SlotMap;

use crate::body::{Body, BodyKind, BodyTag, BounceBody, LineCoefs, PlayerBody};
use crate::grid::Grid;
use crate::ids::BodyId;
use crate::vector::{Aabb, Vector2};

/// Overlap depth on both axes between two bounds. Negative on an axis means
/// the bounds are separated on that axis.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Intersection {
    pub width: f64,
    pub height: f64,
}

fn intersection(a: &Aabb, b: &Aabb) -> Intersection {
    Intersection {
        width: a.max.x.min(b.max.x) - a.min.x.max(b.min.x),
        height: a.max.y.min(b.max.y) - a.min.y.max(b.min.y),
    }
}

/// A pair recorded for contact resolution: `resolved` is always the PLAYER
/// or BOUNCE side, `other` the STATIC side (the collision filter guarantees
/// pair filtering never lets two bodies of the same tag, or a pair without
/// exactly one STATIC on a PLAYER/BOUNCE contact, reach this list).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Contact {
    pub resolved: BodyId,
    pub other: BodyId,
    pub intersection: Intersection,
}

/// Everything stage 4 produces from one sweep of `grid.pairs`.
#[derive(Debug, Default)]
pub(crate) struct DetectOutcome {
    pub sensor_pairs: Vec<(BodyId, BodyId)>,
    /// Bullet id -> candidate targets, in the order each target was first
    /// stashed. Keyed by a `BTreeMap` (ordered on `BodyId`'s derived `Ord`)
    /// rather than a `HashMap` so that replaying an identical construction
    /// and step sequence always visits bullets in the same order — `grid`'s
    /// own pair table is a `BTreeMap` for the same reason.
    pub bullet_targets: BTreeMap<BodyId, Vec<BodyId>>,
    pub contacts: Vec<Contact>,
}

/// Stage 4: walks every candidate pair in `grid.pairs`, in `grid`'s own
/// deterministic iteration order, and classifies each into the sensor,
/// bullet-target, or contact bucket.
pub(crate) fn detect<U>(grid: &Grid, bodies: &SlotMap<BodyId, Body<U>>) -> DetectOutcome {
    let mut out = DetectOutcome::default();

    for key in grid.pair_keys() {
        let (a, b) = key.bodies();
        let (body_a, body_b) = match (bodies.get(a), bodies.get(b)) {
            (Some(a), Some(b)) => (a, b),
            _ => continue,
        };

        let i = intersection(&body_a.bounds, &body_b.bounds);
        if i.width < 0.0 || i.height < 0.0 {
            continue;
        }

        if body_a.is_sensor() || body_b.is_sensor() {
            out.sensor_pairs.push((a, b));
            continue;
        }

        let a_bullet = body_a.tag() == BodyTag::Bullet;
        let b_bullet = body_b.tag() == BodyTag::Bullet;
        if a_bullet != b_bullet {
            let (bullet, target) = if a_bullet { (a, b) } else { (b, a) };
            out.bullet_targets.entry(bullet).or_default().push(target);
            continue;
        }

        let (resolved, other) = if body_a.tag() == BodyTag::Static { (b, a) } else { (a, b) };
        out.contacts.push(Contact { resolved, other, intersection: i });
    }

    out
}

/// A bullet's resolved hit this sub-step, if any of its candidate targets
/// produced an accepted edge probe.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BulletHit {
    pub bullet: BodyId,
    pub target: BodyId,
    pub point: Vector2,
}

fn probe_vertical(k: f64, coefs: LineCoefs, target: &Aabb) -> Option<Vector2> {
    if !coefs.ab.is_finite() || !coefs.cb.is_finite() {
        return None;
    }
    let y = -coefs.ab * k - coefs.cb;
    if y > target.min.y && y < target.max.y {
        Some(Vector2::new(k, y))
    } else {
        None
    }
}

fn probe_horizontal(k: f64, coefs: LineCoefs, target: &Aabb) -> Option<Vector2> {
    if !coefs.ba.is_finite() || !coefs.ca.is_finite() {
        return None;
    }
    let x = -coefs.ba * k - coefs.ca;
    if x > target.min.x && x < target.max.x {
        Some(Vector2::new(x, k))
    } else {
        None
    }
}

/// Resolves every bullet that acquired at least one candidate target this
/// sub-step. A purely axial bullet (`force.x == 0.0` or `force.y == 0.0`)
/// yields non-finite coefficients on two of the four probes and silently
/// never hits anything on the axis it travels along.
pub(crate) fn resolve_bullets<U>(
    bullet_targets: &BTreeMap<BodyId, Vec<BodyId>>,
    bodies: &SlotMap<BodyId, Body<U>>,
) -> Vec<BulletHit> {
    let mut hits = Vec::with_capacity(bullet_targets.len());

    for (&bullet_id, targets) in bullet_targets {
        let bullet_body = match bodies.get(bullet_id) {
            Some(b) => b,
            None => continue,
        };
        let bullet = match bullet_body.kind.as_bullet() {
            Some(b) => b,
            None => continue,
        };
        let prev = bullet.prev_position;
        let coefs = bullet.coefs;

        let mut best: Option<(f64, BodyId, Vector2)> = None;
        for &target_id in targets {
            let bounds = match bodies.get(target_id) {
                Some(t) => t.bounds,
                None => continue,
            };
            let probes = [
                probe_vertical(bounds.min.x, coefs, &bounds),
                probe_vertical(bounds.max.x, coefs, &bounds),
                probe_horizontal(bounds.min.y, coefs, &bounds),
                probe_horizontal(bounds.max.y, coefs, &bounds),
            ];
            for point in probes.into_iter().flatten() {
                let half_summ = (point.x - prev.x).abs() + (point.y - prev.y).abs();
                let better = match best {
                    None => true,
                    Some((best_half, ..)) => half_summ < best_half,
                };
                if better {
                    best = Some((half_summ, target_id, point));
                }
            }
        }

        if let Some((_, target, point)) = best {
            trace!("narrow: bullet {:?} hit {:?} at {:?}", bullet_id, target, point);
            hits.push(BulletHit { bullet: bullet_id, target, point });
        }
    }

    hits
}

/// The contact disambiguation chain: containment on each axis, jump-through
/// for a rising player, landing bias toward the smaller overlap, and a
/// min-axis fallback, in that order. `is_player`, `move_direction_y`, and
/// `is_on_ground` describe the resolved body;
/// `is_on_ground` is meaningless for BOUNCE bodies and always passed as
/// `false` for them, which is harmless since rule 3 only fires for players.
///
/// Rule 4 (landing bias) clears `correction.x` but does not, on its own
/// reading, clear the min-fix flag; taken literally that would let rule 5
/// immediately re-zero the axis rule 4 just picked whenever the Y overlap
/// is the smaller of the two (precisely the case rule 4's guard selects),
/// cancelling the correction outright. That would defeat the rule's own
/// purpose, so the flag is treated as cleared here too.
pub(crate) fn compute_correction(
    resolved_bounds: &Aabb,
    resolved_position: Vector2,
    is_player: bool,
    move_direction_y: i8,
    is_on_ground: bool,
    other_bounds: &Aabb,
    other_position: Vector2,
    intersection: Intersection,
) -> Vector2 {
    let mut correction = Vector2::new(intersection.width, intersection.height);
    let mut need_min_fix = true;
    let resolved_above = resolved_position.y < other_position.y;

    if resolved_bounds.contained_x(other_bounds) {
        correction.x = 0.0;
        need_min_fix = false;
    }
    if resolved_bounds.contained_y(other_bounds) {
        correction.y = 0.0;
        need_min_fix = false;
    }

    if correction.y != 0.0 && resolved_above && is_player && move_direction_y == -1 && !is_on_ground {
        correction.y = 0.0;
        need_min_fix = false;
    }

    if correction.y != 0.0 && resolved_above && move_direction_y == 1 && correction.y < correction.x {
        correction.x = 0.0;
        need_min_fix = false;
    }

    if need_min_fix {
        if correction.x.abs() <= correction.y.abs() {
            correction.y = 0.0;
        } else {
            correction.x = 0.0;
        }
    }

    if resolved_above {
        correction.y = -correction.y;
    }
    if resolved_position.x < other_position.x {
        correction.x = -correction.x;
    }

    correction
}

/// Updates a player's ground/jump state after a correction has been
/// applied: `correction.y < 0` means contact from below (landing on a
/// floor), `correction.y > 0` means contact from above (hitting a ceiling).
pub(crate) fn player_collision_response(player: &mut PlayerBody, correction: Vector2) {
    if correction.x != 0.0 {
        player.jump_init_dir = 0;
    }
    if correction.y < 0.0 {
        player.is_on_ground = true;
        player.jump_init_dir = 0;
        player.jump_timer = None;
        player.fall_timer = None;
    } else if correction.y > 0.0 {
        player.jump_timer = None;
        player.jump_init_dir = 0;
    }
}

/// Damps a bounce body's velocity on collision and counts down its
/// remaining fix-ups per axis. The X and Y fix-count branches are
/// deliberately asymmetric: X increments its counter on both the zeroing
/// and the scaling branch, so it ticks to 4 once before the outer `<= 3`
/// guard pins it there (see `DESIGN.md` for why this off-by-one is kept);
/// Y only increments while scaling, so it settles at exactly 3.
pub(crate) fn bounce_collision_response(bounce: &mut BounceBody, correction: Vector2) {
    if correction.x != 0.0 {
        let c = bounce.count_collisions_fix.x;
        if c <= 3 {
            if c == 3 {
                bounce.force.x = 0.0;
            } else {
                bounce.force.x *= 0.5 - 0.1 * c as f64;
                let correction_dir = correction.x.signum();
                let force_dir = bounce.force.x.signum();
                if correction_dir != 0.0 && force_dir != 0.0 && correction_dir != force_dir {
                    bounce.force.x = -bounce.force.x;
                }
            }
            bounce.count_collisions_fix.x = c.saturating_add(1);
        }
    }

    if correction.y < 0.0 {
        let c = bounce.count_collisions_fix.y;
        if c == 3 {
            bounce.force.y = 0.0;
            bounce.move_direction_y = 0;
        } else {
            bounce.rebound_speed *= 0.5 - 0.15 * c as f64;
            bounce.force.y = bounce.rebound_speed;
            bounce.count_collisions_fix.y = c.saturating_add(1);
        }
    } else if correction.y > 0.0 {
        bounce.force.y = -bounce.force.y;
    }
}

/// Resolves one contact: computes the correction, applies the matching
/// per-type post-collision response, and returns the new position. Returns
/// `None` if either body vanished from the arena since `detect` ran (a
/// sensor/bullet event handled earlier in the same sub-step removed it).
pub(crate) fn resolve_contact<U>(contact: &Contact, bodies: &mut SlotMap<BodyId, Body<U>>) -> Option<(BodyId, Vector2)> {
    let (other_bounds, other_position) = {
        let other = bodies.get(contact.other)?;
        (other.bounds, other.position)
    };

    let resolved = bodies.get(contact.resolved)?;
    let is_player = matches!(resolved.kind, BodyKind::Player(_));
    let (move_direction_y, is_on_ground) = match &resolved.kind {
        BodyKind::Player(p) => (p.move_direction_y, p.is_on_ground),
        BodyKind::Bounce(b) => (b.move_direction_y, false),
        _ => return None,
    };

    let correction = compute_correction(
        &resolved.bounds,
        resolved.position,
        is_player,
        move_direction_y,
        is_on_ground,
        &other_bounds,
        other_position,
        contact.intersection,
    );
    let new_position = resolved.position.add(correction);

    let resolved = bodies.get_mut(contact.resolved)?;
    match &mut resolved.kind {
        BodyKind::Player(p) => player_collision_response(p, correction),
        BodyKind::Bounce(b) => bounce_collision_response(b, correction),
        _ => unreachable!("contacts only ever resolve a PLAYER or BOUNCE body"),
    }
    resolved.position = new_position;
    resolved.is_updated = true;

    Some((contact.resolved, new_position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::CollisionFixCount;

    fn floor_bounds() -> Aabb {
        Aabb::new(Vector2::new(0.0, 100.0), Vector2::new(200.0, 120.0))
    }

    #[test]
    fn player_lands_on_floor_from_above() {
        let player_bounds = Aabb::centered(Vector2::new(50.0, 95.0), Vector2::new(20.0, 10.0));
        let floor = floor_bounds();
        let i = intersection(&player_bounds, &floor);
        assert!(i.width >= 0.0 && i.height >= 0.0);

        let correction = compute_correction(
            &player_bounds,
            Vector2::new(50.0, 95.0),
            true,
            1,
            false,
            &floor,
            Vector2::new(100.0, 110.0),
            i,
        );
        assert!(correction.y < 0.0, "player above the floor must be pushed up, got {correction:?}");
        assert_eq!(correction.x, 0.0);
    }

    #[test]
    fn jump_through_clears_correction_for_rising_player_below_platform() {
        let platform = floor_bounds();
        let player_bounds = Aabb::centered(Vector2::new(50.0, 105.0), Vector2::new(20.0, 30.0));
        let i = intersection(&player_bounds, &platform);

        let correction = compute_correction(
            &player_bounds,
            Vector2::new(50.0, 105.0),
            true,
            -1,
            false,
            &platform,
            Vector2::new(100.0, 110.0),
            i,
        );
        assert_eq!(correction.y, 0.0);
    }

    #[test]
    fn bounce_x_axis_pins_after_reaching_fourth_collision() {
        let mut bounce = BounceBody {
            size: Vector2::new(10.0, 10.0),
            normal_bounds: Aabb::centered(Vector2::ZERO, Vector2::new(10.0, 10.0)),
            force: Vector2::new(0.2, 0.0),
            gravity: 0.001,
            rebound_speed: -0.2,
            move_direction_y: 0,
            count_collisions_fix: CollisionFixCount { x: 3, y: 0 },
        };
        bounce_collision_response(&mut bounce, Vector2::new(1.0, 0.0));
        assert_eq!(bounce.force.x, 0.0);
        assert_eq!(bounce.count_collisions_fix.x, 4);

        bounce_collision_response(&mut bounce, Vector2::new(1.0, 0.0));
        assert_eq!(bounce.count_collisions_fix.x, 4, "pinned once the counter reaches 4");
    }

    #[test]
    fn bounce_y_axis_caps_at_three_and_zeroes_velocity() {
        let mut bounce = BounceBody {
            size: Vector2::new(10.0, 10.0),
            normal_bounds: Aabb::centered(Vector2::ZERO, Vector2::new(10.0, 10.0)),
            force: Vector2::new(0.0, 0.3),
            gravity: 0.001,
            rebound_speed: -0.3,
            move_direction_y: 1,
            count_collisions_fix: CollisionFixCount { x: 0, y: 3 },
        };
        bounce_collision_response(&mut bounce, Vector2::new(0.0, -1.0));
        assert_eq!(bounce.force.y, 0.0);
        assert_eq!(bounce.move_direction_y, 0);
        assert_eq!(bounce.count_collisions_fix.y, 3, "counter never ticks past 3");
    }

    #[test]
    fn axial_bullet_misses_static_ahead() {
        let coefs = LineCoefs::from_origin_and_force(Vector2::new(0.0, 50.0), Vector2::new(0.1, 0.0));
        assert!(!coefs.ab.is_finite());
        assert!(!coefs.cb.is_finite());
        let target = Aabb::new(Vector2::new(90.0, 40.0), Vector2::new(110.0, 60.0));
        assert!(probe_vertical(110.0, coefs, &target).is_none());
        assert!(probe_vertical(90.0, coefs, &target).is_none());
    }
}
