//! Events a step reports back to the host.
//!
//! [`crate::World::update`] cannot return borrowed body data and still be
//! callable again next tick, so events carry [`BodyId`] handles (cheap,
//! `Copy`) plus a [`BodySnapshot`] wherever the host is likely to want the
//! struck/overlapping body's state without an extra lookup.

use serde::{Deserialize, Serialize};

use crate::body::BodyTag;
use crate::ids::BodyId;
use crate::vector::{Aabb, Vector2};

/// A read-only copy of a body's identity and spatial state at the moment
/// an event was generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySnapshot<U> {
    pub id: BodyId,
    pub tag: BodyTag,
    pub position: Vector2,
    pub bounds: Aabb,
    pub user_data: U,
}

/// The union of sensor record shapes a step can produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorEvent<U> {
    /// `body`'s `position` left `world.bounds` during the integrate stage.
    OutOfWorld { body: BodySnapshot<U> },
    /// At least one side of the pair has `is_sensor == true`; the overlap
    /// began or continues this sub-step.
    SensorOverlap { body_a: BodySnapshot<U>, body_b: BodySnapshot<U> },
    /// A bullet intersected an eligible target. `point` is the nearest
    /// edge crossing, in world space.
    BulletHit {
        bullet: BodySnapshot<U>,
        hit: BodySnapshot<U>,
        point: Vector2,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sensor events are the crate's over-the-wire shape — a host forwards
    /// them to clients with `bincode`, so a round trip has to hold.
    #[test]
    fn bullet_hit_round_trips_through_bincode() {
        let snapshot = BodySnapshot {
            id: BodyId::default(),
            tag: BodyTag::Static,
            position: Vector2::new(450.0, 0.0),
            bounds: Aabb::new(Vector2::new(450.0, -50.0), Vector2::new(550.0, 50.0)),
            user_data: (),
        };
        let event = SensorEvent::BulletHit {
            bullet: snapshot.clone(),
            hit: snapshot,
            point: Vector2::new(450.0, 0.0),
        };

        let encoded = bincode::serialize(&event).expect("sensor events must be bincode-serializable");
        let decoded: SensorEvent<()> = bincode::deserialize(&encoded).expect("round trip must decode");

        match decoded {
            SensorEvent::BulletHit { point, .. } => assert_eq!(point, Vector2::new(450.0, 0.0)),
            other => panic!("expected BulletHit, got {other:?}"),
        }
    }
}
