//! Integration coverage for the documented scenarios and laws: jump apex,
//! bullet nearest-edge resolution, bounce settling, region migration, and
//! deterministic replay.

use step_physics::{
    Aabb, BodyKind, BodyTag, BounceSpec, BulletSpec, Direction, PlayerSpec, SensorEvent, StaticSpec, Vector2, World,
    WorldConfig,
};

fn bounded_config() -> WorldConfig {
    WorldConfig {
        bounds: Some(Aabb::new(Vector2::new(-10000.0, -10000.0), Vector2::new(10000.0, 10000.0))),
        ..WorldConfig::default()
    }
}

fn settle_on_floor(world: &mut World<()>) -> step_physics::BodyId {
    world.create_static_body(
        StaticSpec { x: 0.0, y: 200.0, width: 1000.0, height: 40.0, is_sensor: false },
        (),
    );
    let player =
        world.create_player_body(PlayerSpec { x: 0.0, y: 0.0, width: 20.0, height: 40.0, move_speed: None, jump_distance: None }, ());
    for _ in 0..400 {
        world.update(16.0);
    }
    player
}

#[test]
fn jump_apex_matches_ground_minus_jump_distance_then_descends() {
    let mut world: World<()> = World::new(bounded_config());
    let player = settle_on_floor(&mut world);
    world.player_jump(player);

    let mut min_y = f64::INFINITY;
    let mut apex_step = 0;
    let mut positions = Vec::new();
    for step in 0..500 {
        world.update(16.0);
        let y = world.body(player).unwrap().position.y;
        positions.push(y);
        if y < min_y {
            min_y = y;
            apex_step = step;
        }
    }

    let ground_y = 160.0;
    let jump_distance = 40.0 * 1.1;
    assert!((min_y - (ground_y - jump_distance)).abs() < 1.0, "apex was {min_y}, expected near {}", ground_y - jump_distance);

    for window in positions[apex_step..].windows(2).take(20) {
        assert!(window[1] >= window[0] - 1e-9, "y must not decrease again right after the apex");
    }
}

#[test]
fn bullet_hits_static_on_nearest_edge_across_sub_steps() {
    let mut world: World<()> = World::new(WorldConfig::default());
    world.create_static_body(StaticSpec { x: 500.0, y: 0.0, width: 100.0, height: 100.0, is_sensor: false }, ());
    let bullet = world.create_bullet_body(
        BulletSpec { x: 0.0, y: 0.0, force: Vector2::new(5000.0, 0.0), owner_id: None, long_of_life: None },
        (),
    );

    let first = world.update(16.0);
    assert!(first.is_empty(), "bullet should not have reached the static yet");
    assert!((world.body(bullet).unwrap().position.x - 80.0).abs() < 1e-6);

    let second = world.update(100.0);
    let hits: Vec<_> = second
        .iter()
        .filter_map(|e| match e {
            SensorEvent::BulletHit { hit, point, .. } => Some((hit.tag, *point)),
            _ => None,
        })
        .collect();
    assert_eq!(hits.len(), 1, "expected exactly one bullet hit, got {second:?}");
    let (tag, point) = hits[0];
    assert_eq!(tag, BodyTag::Static);
    assert!((point.x - 450.0).abs() < 1e-6, "expected the min-X edge, got {point:?}");
    assert!((point.y - 0.0).abs() < 1e-6);

    assert!(world.body(bullet).is_none(), "a bullet with no budget is removed on any hit");
}

#[test]
fn bounce_settles_and_counter_caps() {
    let mut world: World<()> = World::new(WorldConfig::default());
    world.create_static_body(StaticSpec { x: 0.0, y: 200.0, width: 1000.0, height: 40.0, is_sensor: false }, ());
    let bounce = world.create_bounce_body(BounceSpec { x: 0.0, y: 0.0, width: 20.0, height: 20.0, force: Vector2::new(0.0, -300.0) }, ());

    let mut last_rebound_magnitude = f64::INFINITY;
    let mut fix_count_hits = 0;
    for _ in 0..3000 {
        world.update(16.0);
        let body = world.body(bounce).unwrap();
        if let BodyKind::Bounce(b) = &body.kind {
            if b.count_collisions_fix.y > 0 && b.count_collisions_fix.y as usize > fix_count_hits {
                fix_count_hits = b.count_collisions_fix.y as usize;
                let magnitude = b.rebound_speed.abs();
                assert!(magnitude <= last_rebound_magnitude + 1e-9, "rebound speed must not grow between floor contacts");
                last_rebound_magnitude = magnitude;
            }
            if fix_count_hits >= 3 {
                assert_eq!(b.force.y, 0.0);
                break;
            }
        }
    }
    assert!(fix_count_hits >= 3, "bounce body never reached its fix-count cap");
}

#[test]
fn region_migration_preserves_pair_membership() {
    let mut world: World<()> = World::new(WorldConfig::default());
    world.create_static_body(StaticSpec { x: 0.0, y: 0.0, width: 20.0, height: 20.0, is_sensor: false }, ());
    world.create_static_body(StaticSpec { x: 500.0, y: 0.0, width: 20.0, height: 20.0, is_sensor: false }, ());
    let player = world.create_player_body(
        PlayerSpec { x: 520.0, y: -400.0, width: 20.0, height: 20.0, move_speed: None, jump_distance: None },
        (),
    );
    world.player_move(player, Direction::Left);

    world.update(16.0);
    let before = world.body(player).unwrap().position.x;
    assert!(before >= 512.0, "test fixture should start east of the x=512 region boundary");

    for _ in 0..100 {
        world.update(16.0);
    }
    let after = world.body(player).unwrap().position.x;
    assert!(after < 512.0, "player should have drifted across the region boundary at x=512");

    assert!(world.check_invariants().is_ok());
}

#[test]
fn identical_construction_and_deltas_replay_identically() {
    fn build_and_run() -> Vec<(f64, f64)> {
        let mut world: World<()> = World::new(bounded_config());
        world.create_static_body(StaticSpec { x: 0.0, y: 200.0, width: 1000.0, height: 40.0, is_sensor: false }, ());
        let player = world.create_player_body(
            PlayerSpec { x: 0.0, y: 0.0, width: 20.0, height: 40.0, move_speed: None, jump_distance: None },
            (),
        );
        world.player_move(player, Direction::Right);
        let mut trace = Vec::new();
        for i in 0..200 {
            world.update(16.0);
            if i % 10 == 0 {
                world.player_jump(player);
            }
            let p = world.body(player).unwrap().position;
            trace.push((p.x, p.y));
        }
        trace
    }

    assert_eq!(build_and_run(), build_and_run());
}

#[test]
fn sensor_overlap_reports_both_bodies_without_correction() {
    let mut world: World<()> = World::new(WorldConfig::default());
    world.create_static_body(StaticSpec { x: 0.0, y: 200.0, width: 1000.0, height: 40.0, is_sensor: true }, ());
    let player = world.create_player_body(
        PlayerSpec { x: 0.0, y: 190.0, width: 20.0, height: 40.0, move_speed: None, jump_distance: None },
        (),
    );

    let events = world.update(16.0);
    let overlapped = events
        .iter()
        .any(|e| matches!(e, SensorEvent::SensorOverlap { .. }));
    assert!(overlapped, "expected a sensor overlap event, got {events:?}");

    let body = world.body(player).unwrap();
    assert!(matches!(&body.kind, BodyKind::Player(p) if !p.is_on_ground), "a sensor must never apply positional correction");
}
