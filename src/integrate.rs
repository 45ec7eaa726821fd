//! Per-kind motion models: bullet ray, damped bounce, and the player's
//! parabolic jump/fall timers, plus the player input methods.

use crate::body::{Body, BodyKind, BounceBody, BulletBody, Direction, PlayerBody};
use crate::ids::BodyId;
use crate::vector::{Aabb, Vector2};

fn sign_i8(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

impl<U> Body<U> {
    /// Advances this body by `delta` milliseconds. No-op for STATIC bodies.
    /// Bullets that exhaust their travel budget enqueue themselves onto
    /// `to_remove` instead of refreshing their bounds.
    pub(crate) fn integrate(&mut self, delta: f64, to_remove: &mut Vec<BodyId>) {
        let Body { id, kind, position, bounds, is_updated, .. } = self;
        match kind {
            BodyKind::Static(_) => {}
            BodyKind::Player(p) => player_step(p, position, bounds, is_updated, delta),
            BodyKind::Bounce(b) => integrate_bounce(b, position, bounds, is_updated, delta),
            BodyKind::Bullet(b) => integrate_bullet(b, position, bounds, is_updated, delta, *id, to_remove),
        }
    }
}

fn player_step(player: &mut PlayerBody, position: &mut Vector2, bounds: &mut Aabb, is_updated: &mut bool, delta: f64) {
    let mut changed = false;

    if player.force_x != 0.0 {
        position.x += player.force_x * delta;
        changed = true;
        if player.is_on_ground {
            position.y += 1.0;
            player.is_on_ground = false;
        }
    }

    player.move_direction_y = 0;

    if let Some(t) = player.jump_timer {
        let t = t + delta;
        player.jump_timer = Some(t);
        let dt = t - player.jump_coef;
        position.y = player.last_ground_position_y + player.gravity * dt * dt - player.jump_distance;
        player.move_direction_y = sign_i8(t - player.jump_coef);
        changed = true;
    } else if !player.is_on_ground {
        if let Some(ft) = player.fall_timer {
            let ft = ft + delta;
            player.fall_timer = Some(ft);
            position.y = player.last_ground_position_y + player.gravity * ft * ft;
            player.move_direction_y = 1;
            changed = true;
        }
    }

    if changed {
        *bounds = Aabb::centered(*position, player.size);
        *is_updated = true;
    }
}

fn integrate_bounce(bounce: &mut BounceBody, position: &mut Vector2, bounds: &mut Aabb, is_updated: &mut bool, delta: f64) {
    let mut changed = false;

    if bounce.count_collisions_fix.x < 3 {
        position.x += bounce.force.x * delta;
        changed = true;
    }
    if bounce.count_collisions_fix.y < 3 {
        bounce.force.y += bounce.gravity * delta;
        position.y += bounce.force.y * delta;
        changed = true;
    }

    bounce.move_direction_y = sign_i8(bounce.force.y);

    if changed {
        *bounds = Aabb::centered(*position, bounce.size);
        *is_updated = true;
    }
}

fn integrate_bullet(
    bullet: &mut BulletBody,
    position: &mut Vector2,
    bounds: &mut Aabb,
    is_updated: &mut bool,
    delta: f64,
    self_id: BodyId,
    to_remove: &mut Vec<BodyId>,
) {
    *is_updated = true;
    bullet.prev_position = *position;
    *position = position.add(bullet.force.scale(delta));

    if let Some(budget) = bullet.long_of_life {
        let step_len = position.sub(bullet.prev_position).magnitude();
        bullet.long += step_len;
        if bullet.long >= budget {
            to_remove.push(self_id);
            return;
        }
    }

    *bounds = Aabb::hull_of_segment(bullet.prev_position, *position);
}

/// Arms the fall timer on a player that is airborne with neither an active
/// jump nor fall timer. Run as a post-pass after the rest of a sub-step, so
/// a player that just lost ground contact without starting a jump still
/// falls under gravity next tick.
pub(crate) fn arm_fall_timer(player: &mut PlayerBody) {
    if !player.is_on_ground && player.jump_timer.is_none() && player.fall_timer.is_none() {
        player.fall_timer = Some(0.0);
    }
}

/// Sets horizontal force from a committed direction. `dir == 0` is
/// unrepresentable by construction; see [`Direction`]'s doc comment.
pub(crate) fn player_move(player: &mut PlayerBody, dir: Direction) {
    player.force_x = player.move_speed * dir.sign();
    if !player.is_on_ground && !dir.matches_sign(player.jump_init_dir) {
        player.force_x *= 0.5;
        player.jump_init_dir = 0;
    }
}

pub(crate) fn player_stop(player: &mut PlayerBody) {
    player.force_x = 0.0;
}

/// No-op unless the player is currently on the ground.
pub(crate) fn player_jump(player: &mut PlayerBody, position_y: f64) {
    if !player.is_on_ground {
        return;
    }
    player.jump_timer = Some(0.0);
    player.last_ground_position_y = position_y;
    player.jump_init_dir = sign_i8(player.force_x);
    player.is_on_ground = false;
}

/// Snaps a non-static body's position. Does not refresh `bounds` — the next
/// sub-step's integrate stage does that.
pub(crate) fn set_position<U>(body: &mut Body<U>, p: Vector2) {
    body.position = p;
    body.is_updated = true;
}
