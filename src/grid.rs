//! The broad-phase region hash and reference-counted pair registry.
//!
//! The grid never stores body data itself — only [`BodyId`] handles — so
//! the caller always supplies the body arena alongside.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use log::trace;
use slotmap::SlotMap;

use crate::body::{Body, BodyTag};
use crate::ids::{BodyId, PairKey, RegionKey};

/// Minimal per-body facts the collision filter needs, copied out of a
/// [`Body`] so the broad phase never has to hold a borrow of the body arena
/// and a mutable borrow of the grid at the same time.
#[derive(Debug, Clone, Copy)]
struct CollideInfo {
    id: BodyId,
    tag: BodyTag,
    owner_id: Option<BodyId>,
}

fn collide_info<U>(body: &Body<U>) -> CollideInfo {
    CollideInfo {
        id: body.id(),
        tag: body.tag(),
        owner_id: body.kind.as_bullet().and_then(|b| b.owner_id),
    }
}

/// The only contact pairs that ever reach narrow phase are PLAYER-STATIC,
/// BOUNCE-STATIC, and BULLET-{PLAYER,STATIC,BOUNCE}.
fn can_collide(a: CollideInfo, b: CollideInfo) -> bool {
    if a.tag == b.tag {
        return false;
    }
    if (a.tag == BodyTag::Bounce || b.tag == BodyTag::Bounce)
        && a.tag != BodyTag::Static
        && b.tag != BodyTag::Static
    {
        return false;
    }
    if a.tag == BodyTag::Bullet && a.owner_id == Some(b.id) {
        return false;
    }
    if b.tag == BodyTag::Bullet && b.owner_id == Some(a.id) {
        return false;
    }
    true
}

#[derive(Debug, Default)]
struct PairEntry {
    count: u32,
}

/// A region-hashed broad phase whose pair reference count survives
/// incremental region migrations without ever losing or double-counting a
/// candidate pair: a pair is born when two bodies first share any region
/// and disappears only once they share none.
///
/// `pairs` is a `BTreeMap` rather than a `HashMap`: stage 4 in
/// [`crate::narrow`] walks candidate pairs in `grid.pairs`'s iteration
/// order and that order is observable (sensor event sequencing, bullet
/// target tie-breaking), so it has to be a pure function of the bodies'
/// ids rather than of `HashMap`'s per-process random seed.
#[derive(Debug, Default)]
pub struct Grid {
    hash: HashMap<RegionKey, Vec<BodyId>>,
    pairs: BTreeMap<PairKey, PairEntry>,
}

impl Grid {
    pub fn new() -> Self {
        Grid::default()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn pair_keys(&self) -> impl Iterator<Item = PairKey> + '_ {
        self.pairs.keys().copied()
    }

    pub fn region_count(&self) -> usize {
        self.hash.len()
    }

    /// Walks `order` (the world's insertion-ordered body list) and
    /// registers, re-indexes, or leaves untouched each body, depending on
    /// whether it has ever been registered and whether it moved this tick.
    pub fn update<U>(&mut self, order: &[BodyId], bodies: &mut SlotMap<BodyId, Body<U>>) {
        for &id in order {
            let had_regions = match bodies.get(id) {
                Some(b) => b.regions.is_some(),
                None => continue,
            };

            if !had_regions {
                self.register(id, bodies);
                continue;
            }

            let (is_updated, is_bullet) = {
                let b = bodies.get(id).expect("body present");
                (b.is_updated, b.tag() == BodyTag::Bullet)
            };
            if !is_updated {
                continue;
            }
            if !is_bullet {
                bodies.get_mut(id).expect("body present").is_updated = false;
            }

            let new_regions = regions_for(&bodies.get(id).expect("body present").bounds);
            let new_key = join_regions(&new_regions);
            let unchanged = bodies
                .get(id)
                .expect("body present")
                .regions_key
                .as_deref()
                == Some(new_key.as_str());
            if !unchanged {
                self.reindex(id, new_regions, new_key, bodies);
            }
        }
    }

    fn register<U>(&mut self, id: BodyId, bodies: &mut SlotMap<BodyId, Body<U>>) {
        let self_info = collide_info(bodies.get(id).expect("body present"));
        let new_regions = regions_for(&bodies.get(id).expect("body present").bounds);

        for &r in &new_regions {
            let existing: Vec<BodyId> = self.hash.entry(r).or_default().clone();
            for other_id in existing {
                let other_info = collide_info(bodies.get(other_id).expect("grid references live body"));
                if can_collide(self_info, other_info) {
                    self.bump_pair(id, other_id);
                }
            }
            self.hash.get_mut(&r).unwrap().push(id);
        }

        let is_static = self_info.tag == BodyTag::Static;
        let body = bodies.get_mut(id).expect("body present");
        let key = if is_static { None } else { Some(join_regions(&new_regions)) };
        trace!("grid: registered {:?} into {} region(s)", id, new_regions.len());
        body.regions = Some(new_regions);
        body.regions_key = key;
    }

    fn reindex<U>(
        &mut self,
        id: BodyId,
        new_regions: Vec<RegionKey>,
        new_key: String,
        bodies: &mut SlotMap<BodyId, Body<U>>,
    ) {
        let old_regions = bodies
            .get(id)
            .expect("body present")
            .regions
            .clone()
            .unwrap_or_default();

        let to_remove: Vec<RegionKey> = old_regions
            .iter()
            .copied()
            .filter(|r| !new_regions.contains(r))
            .collect();
        let to_add: Vec<RegionKey> = new_regions
            .iter()
            .copied()
            .filter(|r| !old_regions.contains(r))
            .collect();

        for r in to_remove {
            if let Some(list) = self.hash.get_mut(&r) {
                list.retain(|&other| other != id);
                let remaining = list.clone();
                for other_id in remaining {
                    self.drop_pair(id, other_id);
                }
                if list.is_empty() {
                    self.hash.remove(&r);
                }
            }
        }

        let self_info = collide_info(bodies.get(id).expect("body present"));
        for r in to_add {
            let list = self.hash.entry(r).or_default();
            list.push(id);
            let list_snapshot = list.clone();
            for other_id in list_snapshot {
                if other_id == id {
                    continue;
                }
                let other_info = collide_info(bodies.get(other_id).expect("grid references live body"));
                if can_collide(self_info, other_info) {
                    self.bump_pair(id, other_id);
                }
            }
        }

        trace!(
            "grid: re-indexed {:?}, now in {} region(s)",
            id,
            new_regions.len()
        );
        let body = bodies.get_mut(id).expect("body present");
        body.regions = Some(new_regions);
        body.regions_key = Some(new_key);
    }

    /// Removes `body_id` from every region it occupies and tears down any
    /// pairs it participated in.
    pub fn remove_body<U>(&mut self, id: BodyId, bodies: &mut SlotMap<BodyId, Body<U>>) {
        let regions = match bodies.get(id).and_then(|b| b.regions.clone()) {
            Some(r) => r,
            None => return,
        };

        for r in regions {
            if let Some(list) = self.hash.get_mut(&r) {
                list.retain(|&other| other != id);
                let remaining = list.clone();
                for other_id in remaining {
                    self.drop_pair(id, other_id);
                }
                if list.is_empty() {
                    self.hash.remove(&r);
                }
            }
        }

        if let Some(body) = bodies.get_mut(id) {
            body.regions = None;
            body.regions_key = None;
        }
        trace!("grid: removed {:?}", id);
    }

    fn bump_pair(&mut self, a: BodyId, b: BodyId) {
        self.pairs.entry(PairKey::new(a, b)).or_default().count += 1;
    }

    fn drop_pair(&mut self, a: BodyId, b: BodyId) {
        let key = PairKey::new(a, b);
        if let Some(entry) = self.pairs.get_mut(&key) {
            if entry.count <= 1 {
                self.pairs.remove(&key);
            } else {
                entry.count -= 1;
            }
        }
    }

    /// Used by [`crate::World::check_invariants`] to cross-check a pair's
    /// recorded count against the bodies' actual region co-residency.
    pub(crate) fn pair_entry_count(&self, key: PairKey) -> Option<u32> {
        self.pairs.get(&key).map(|e| e.count)
    }

    pub(crate) fn region_members(&self, r: RegionKey) -> &[BodyId] {
        self.hash.get(&r).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn regions(&self) -> impl Iterator<Item = RegionKey> + '_ {
        self.hash.keys().copied()
    }
}

/// Every region an AABB overlaps, scanned row-major (y outer, x inner) so
/// the joined string form is bytewise comparable across calls.
fn regions_for(bounds: &crate::vector::Aabb) -> Vec<RegionKey> {
    let min = RegionKey::from_world(bounds.min.x, bounds.min.y);
    let max = RegionKey::from_world(bounds.max.x, bounds.max.y);
    let mut out = Vec::with_capacity(((max.sy - min.sy + 1) * (max.sx - min.sx + 1)).max(1) as usize);
    for sy in min.sy..=max.sy {
        for sx in min.sx..=max.sx {
            out.push(RegionKey { sx, sy });
        }
    }
    out
}

fn join_regions(regions: &[RegionKey]) -> String {
    let mut s = String::new();
    for (i, r) in regions.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        let _ = write!(s, "{r}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector2;

    #[test]
    fn regions_for_single_cell_body() {
        let b = crate::vector::Aabb::centered(Vector2::new(10.0, 10.0), Vector2::new(4.0, 4.0));
        let regions = regions_for(&b);
        assert_eq!(regions, vec![RegionKey { sx: 0, sy: 0 }]);
    }

    #[test]
    fn regions_for_body_spanning_four_cells_is_y_major() {
        // Straddles x=512 and y=512.
        let b = crate::vector::Aabb::new(Vector2::new(500.0, 500.0), Vector2::new(520.0, 520.0));
        let regions = regions_for(&b);
        assert_eq!(
            regions,
            vec![
                RegionKey { sx: 0, sy: 0 },
                RegionKey { sx: 1, sy: 0 },
                RegionKey { sx: 0, sy: 1 },
                RegionKey { sx: 1, sy: 1 },
            ]
        );
    }

    #[test]
    fn can_collide_filters_same_type_and_bounce_rules() {
        let static_a = CollideInfo { id: BodyId::default(), tag: BodyTag::Static, owner_id: None };
        let static_b = CollideInfo { id: BodyId::default(), tag: BodyTag::Static, owner_id: None };
        assert!(!can_collide(static_a, static_b));

        let bounce = CollideInfo { id: BodyId::default(), tag: BodyTag::Bounce, owner_id: None };
        let player = CollideInfo { id: BodyId::default(), tag: BodyTag::Player, owner_id: None };
        assert!(!can_collide(bounce, player));
        assert!(can_collide(bounce, static_a));
    }

    #[test]
    fn can_collide_excludes_bullet_owner() {
        use slotmap::SlotMap;
        let mut arena: SlotMap<BodyId, ()> = SlotMap::with_key();
        let owner = arena.insert(());
        let other = arena.insert(());
        let bullet = CollideInfo { id: BodyId::default(), tag: BodyTag::Bullet, owner_id: Some(owner) };
        let owner_info = CollideInfo { id: owner, tag: BodyTag::Player, owner_id: None };
        let other_info = CollideInfo { id: other, tag: BodyTag::Player, owner_id: None };
        assert!(!can_collide(bullet, owner_info));
        assert!(can_collide(bullet, other_info));
    }
}
