//! The world: body storage, the five-stage sub-step pipeline, and the
//! public factory/input surface.

use std::collections::HashSet;

use slotmap::SlotMap;

use crate::body::{
    build_bounce, build_bullet, build_player, build_static, Body, BodyKind, BodyTag, BounceSpec, BulletSpec,
    Direction, PlayerSpec, StaticSpec,
};
use crate::config::WorldConfig;
use crate::error::InvariantViolation;
use crate::grid::Grid;
use crate::ids::BodyId;
use crate::integrate::{self, arm_fall_timer};
use crate::narrow;
use crate::sensor::{BodySnapshot, SensorEvent};
use crate::vector::Vector2;

/// Owns every body, the broad-phase grid, and the deferred-removal queue.
/// One `World` belongs to one owner for its lifetime; nothing in this crate
/// spawns threads or performs I/O.
pub struct World<U> {
    bodies: SlotMap<BodyId, Body<U>>,
    /// Insertion order, stable under removals. `slotmap::SlotMap`'s own
    /// iteration order is not guaranteed to match insertion order, and
    /// bodies must be processed in a stable order across a step — this is
    /// that list.
    order: Vec<BodyId>,
    to_remove: Vec<BodyId>,
    grid: Grid,
    config: WorldConfig,
}

impl<U> World<U> {
    pub fn new(config: WorldConfig) -> Self {
        World {
            bodies: SlotMap::with_key(),
            order: Vec::new(),
            to_remove: Vec::new(),
            grid: Grid::new(),
            config,
        }
    }

    pub fn body(&self, id: BodyId) -> Option<&Body<U>> {
        self.bodies.get(id)
    }

    pub fn body_count(&self) -> usize {
        self.order.len()
    }

    pub fn create_static_body(&mut self, spec: StaticSpec, user_data: U) -> BodyId {
        let id = self.bodies.insert_with_key(|id| build_static(id, spec, user_data));
        self.order.push(id);
        id
    }

    pub fn create_player_body(&mut self, spec: PlayerSpec, user_data: U) -> BodyId {
        let id = self
            .bodies
            .insert_with_key(|id| build_player(id, spec, self.config.gravity, user_data));
        self.order.push(id);
        id
    }

    pub fn create_bounce_body(&mut self, spec: BounceSpec, user_data: U) -> BodyId {
        let id = self
            .bodies
            .insert_with_key(|id| build_bounce(id, spec, self.config.gravity, user_data));
        self.order.push(id);
        id
    }

    pub fn create_bullet_body(&mut self, spec: BulletSpec, user_data: U) -> BodyId {
        let id = self.bodies.insert_with_key(|id| build_bullet(id, spec, user_data));
        self.order.push(id);
        id
    }

    /// Schedules `id` for removal at the next Purge stage. A no-op if `id`
    /// is not (or no longer) tracked. Calling this any number of times
    /// before the next step removes the body exactly once: a second enqueue
    /// just becomes a second, harmless no-op pass through Purge.
    pub fn remove_body(&mut self, id: BodyId) {
        if self.bodies.contains_key(id) {
            self.to_remove.push(id);
        }
    }

    pub fn player_move(&mut self, id: BodyId, dir: Direction) {
        if let Some(BodyKind::Player(p)) = self.bodies.get_mut(id).map(|b| &mut b.kind) {
            integrate::player_move(p, dir);
        }
    }

    pub fn player_stop(&mut self, id: BodyId) {
        if let Some(BodyKind::Player(p)) = self.bodies.get_mut(id).map(|b| &mut b.kind) {
            integrate::player_stop(p);
        }
    }

    pub fn player_jump(&mut self, id: BodyId) {
        let position_y = match self.bodies.get(id) {
            Some(b) => b.position.y,
            None => return,
        };
        if let Some(BodyKind::Player(p)) = self.bodies.get_mut(id).map(|b| &mut b.kind) {
            integrate::player_jump(p, position_y);
        }
    }

    pub fn player_set_position(&mut self, id: BodyId, position: Vector2) {
        if let Some(body) = self.bodies.get_mut(id) {
            debug_assert!(matches!(body.kind, BodyKind::Player(_)), "player_set_position on a non-player body");
            integrate::set_position(body, position);
        }
    }

    pub fn bounce_set_position(&mut self, id: BodyId, position: Vector2) {
        if let Some(body) = self.bodies.get_mut(id) {
            debug_assert!(matches!(body.kind, BodyKind::Bounce(_)), "bounce_set_position on a non-bounce body");
            integrate::set_position(body, position);
        }
    }

    /// Walks the broad phase's and bounce bodies' invariants end to end.
    /// Never violated by normal operation; a `World` built only through the
    /// public API upholds these unconditionally. Intended for tests and
    /// host-side debug tooling.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if let Some(&body) = self.to_remove.first() {
            return Err(InvariantViolation::PendingRemovalAfterStep { body });
        }

        for r in self.grid.regions() {
            for &id in self.grid.region_members(r) {
                let body = match self.bodies.get(id) {
                    Some(b) => b,
                    None => continue,
                };
                let in_list = body.regions.as_ref().map(|rs| rs.contains(&r)).unwrap_or(false);
                if !in_list {
                    return Err(InvariantViolation::RegionMembershipMismatch { body: id });
                }
            }
        }

        for key in self.grid.pair_keys() {
            let (a, b) = key.bodies();
            let (body_a, body_b) = match (self.bodies.get(a), self.bodies.get(b)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };

            if body_a.tag() == body_b.tag() {
                return Err(InvariantViolation::IllegalPair { pair: key });
            }
            let one_is_bounce = body_a.tag() == BodyTag::Bounce || body_b.tag() == BodyTag::Bounce;
            let either_static = body_a.tag() == BodyTag::Static || body_b.tag() == BodyTag::Static;
            if one_is_bounce && !either_static {
                return Err(InvariantViolation::IllegalPair { pair: key });
            }
            if let BodyKind::Bullet(bullet) = &body_a.kind {
                if bullet.owner_id == Some(b) {
                    return Err(InvariantViolation::BulletPairedWithOwner { bullet: a, owner: b });
                }
            }
            if let BodyKind::Bullet(bullet) = &body_b.kind {
                if bullet.owner_id == Some(a) {
                    return Err(InvariantViolation::BulletPairedWithOwner { bullet: b, owner: a });
                }
            }

            let regions_a: &[_] = body_a.regions.as_deref().unwrap_or(&[]);
            let regions_b: &[_] = body_b.regions.as_deref().unwrap_or(&[]);
            let actual = regions_a.iter().filter(|r| regions_b.contains(r)).count() as u32;
            let recorded = self.grid.pair_entry_count(key).unwrap_or(0);
            if actual != recorded {
                return Err(InvariantViolation::PairCountMismatch { pair: key, recorded, actual });
            }
        }

        for (id, body) in self.bodies.iter() {
            if let BodyKind::Bounce(bounce) = &body.kind {
                // DESIGN.md: X legitimately reaches 4 (the documented
                // off-by-one) before being pinned; Y is bounded by 3.
                if bounce.count_collisions_fix.x > 4 {
                    return Err(InvariantViolation::BounceFixCountOverflow {
                        body: id,
                        axis: "x",
                        count: bounce.count_collisions_fix.x,
                    });
                }
                if bounce.count_collisions_fix.y > 3 {
                    return Err(InvariantViolation::BounceFixCountOverflow {
                        body: id,
                        axis: "y",
                        count: bounce.count_collisions_fix.y,
                    });
                }
            }
        }

        Ok(())
    }

    fn purge(&mut self) {
        if self.to_remove.is_empty() {
            return;
        }
        let removed: Vec<BodyId> = self.to_remove.drain(..).collect();
        for &id in &removed {
            self.grid.remove_body(id, &mut self.bodies);
            self.bodies.remove(id);
        }
        let removed_set: HashSet<BodyId> = removed.into_iter().collect();
        self.order.retain(|id| !removed_set.contains(id));
    }
}

impl<U: Clone> World<U> {
    /// Decomposes `delta_ms` into sub-steps no larger than
    /// `config.max_substep_ms` and runs the internal pipeline on each,
    /// returning the concatenation of every sub-step's sensor events in
    /// sub-step order.
    pub fn update(&mut self, delta_ms: f64) -> Vec<SensorEvent<U>> {
        let mut events = Vec::new();
        let mut remaining = delta_ms;
        while remaining > 0.0 {
            let sub_delta = remaining.min(self.config.max_substep_ms);
            events.extend(self.step(sub_delta));
            remaining -= sub_delta;
        }
        events
    }

    /// One full Integrate/Purge/Re-index/Detect/Resolve pass plus the
    /// fall-timer arming post-pass.
    ///
    /// Stage 2 (Purge) runs twice: once after Integrate, and once more
    /// after Resolve, right before the fall-timer pass. Stage 4 (bullet
    /// exhaustion, bullet impact) and stage 5 can enqueue removals of their
    /// own after the first Purge has already run. The second call flushes
    /// those before this step returns, rather than leaving them to haunt
    /// one extra sub-step; no sensor event ordering changes, since every
    /// removal here was already reported via its own sensor event earlier
    /// in this same step.
    fn step(&mut self, delta: f64) -> Vec<SensorEvent<U>> {
        let mut events = Vec::new();

        let order_snapshot = self.order.clone();
        for &id in &order_snapshot {
            if let Some(body) = self.bodies.get_mut(id) {
                body.integrate(delta, &mut self.to_remove);
            }
            let body = match self.bodies.get(id) {
                Some(b) => b,
                None => continue,
            };
            let out_of_world = match self.config.bounds {
                Some(bounds) => !bounds.contains_point(body.position),
                None => false,
            };
            if out_of_world {
                events.push(SensorEvent::OutOfWorld { body: snapshot(body) });
                self.to_remove.push(id);
            }
        }

        self.purge();

        self.grid.update(&self.order, &mut self.bodies);

        let outcome = narrow::detect(&self.grid, &self.bodies);

        for &(a, b) in &outcome.sensor_pairs {
            if let (Some(body_a), Some(body_b)) = (self.bodies.get(a), self.bodies.get(b)) {
                events.push(SensorEvent::SensorOverlap {
                    body_a: snapshot(body_a),
                    body_b: snapshot(body_b),
                });
            }
        }

        let hits = narrow::resolve_bullets(&outcome.bullet_targets, &self.bodies);
        for hit in hits {
            let reported = {
                let bullet_body = match self.bodies.get(hit.bullet) {
                    Some(b) => b,
                    None => continue,
                };
                let target_body = match self.bodies.get(hit.target) {
                    Some(b) => b,
                    None => continue,
                };
                let has_budget = bullet_body.kind.as_bullet().map(|b| b.long_of_life.is_some()).unwrap_or(false);
                let target_is_static = target_body.tag() == BodyTag::Static;
                (snapshot(bullet_body), snapshot(target_body), has_budget, target_is_static)
            };
            let (bullet_snapshot, target_snapshot, has_budget, target_is_static) = reported;
            events.push(SensorEvent::BulletHit {
                bullet: bullet_snapshot,
                hit: target_snapshot,
                point: hit.point,
            });
            if !has_budget || target_is_static {
                self.to_remove.push(hit.bullet);
            }
        }

        for contact in &outcome.contacts {
            narrow::resolve_contact(contact, &mut self.bodies);
        }

        self.purge();

        for &id in &self.order {
            if let Some(body) = self.bodies.get_mut(id) {
                if let BodyKind::Player(p) = &mut body.kind {
                    arm_fall_timer(p);
                }
            }
        }

        events
    }
}

fn snapshot<U: Clone>(body: &Body<U>) -> BodySnapshot<U> {
    BodySnapshot {
        id: body.id(),
        tag: body.tag(),
        position: body.position,
        bounds: body.bounds,
        user_data: body.user_data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::vector::Aabb;

    fn floor(world: &mut World<()>) -> BodyId {
        world.create_static_body(
            StaticSpec { x: 0.0, y: 200.0, width: 1000.0, height: 40.0, is_sensor: false },
            (),
        )
    }

    #[test]
    fn player_settles_on_static_floor() {
        let mut world: World<()> = World::new(WorldConfig { bounds: Some(Aabb::new(Vector2::new(-10000.0, -10000.0), Vector2::new(10000.0, 10000.0))), ..WorldConfig::default() });
        floor(&mut world);
        let player = world.create_player_body(PlayerSpec { x: 0.0, y: 0.0, width: 20.0, height: 40.0, move_speed: None, jump_distance: None }, ());

        for _ in 0..400 {
            world.update(16.0);
        }

        let body = world.body(player).unwrap();
        let is_on_ground = matches!(&body.kind, BodyKind::Player(p) if p.is_on_ground);
        assert!(is_on_ground, "player never settled onto the floor");
        assert!((body.position.y - 160.0).abs() < 1e-6, "settled y was {}", body.position.y);
    }

    #[test]
    fn bullet_never_hits_its_own_owner() {
        let mut world: World<()> = World::new(WorldConfig::default());
        let owner = world.create_player_body(PlayerSpec { x: 0.0, y: 0.0, width: 20.0, height: 40.0, move_speed: None, jump_distance: None }, ());
        world.create_bullet_body(
            BulletSpec { x: 0.0, y: 0.0, force: Vector2::new(1000.0, 0.0), owner_id: Some(owner), long_of_life: None },
            (),
        );

        let events = world.update(16.0);
        assert!(events.is_empty());
    }

    #[test]
    fn removing_an_unknown_body_is_a_no_op() {
        let mut world: World<()> = World::new(WorldConfig::default());
        let id = world.create_static_body(StaticSpec { x: 0.0, y: 0.0, width: 10.0, height: 10.0, is_sensor: false }, ());
        world.remove_body(id);
        world.remove_body(id);
        world.update(16.0);
        assert_eq!(world.body_count(), 0);
        assert!(world.check_invariants().is_ok());
    }
}
