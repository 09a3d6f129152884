//! Narrow-phase contact capture.
//!
//! Rapier reports `CollisionEvent::Started` while computing contacts, before the constraint
//! solver runs, so the body velocities visible here are the approach velocities. The impact
//! speed is the relative velocity projected on the manifold normal.
//!
//! At most `capacity` contacts are handed out per drain. The rest wait, in arrival order, for
//! the following drains; nothing captured is discarded.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rapier3d::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RawContact {
    pub body1: RigidBodyHandle,
    pub body2: RigidBodyHandle,
    pub impact_velocity: Real,
}

#[derive(Default)]
struct CollectorState {
    contacts: VecDeque<RawContact>,
    seen: HashSet<((u32, u32), (u32, u32))>,
}

/// Bounded per-step queue fed by Rapier's event callbacks.
pub(crate) struct ContactCollector {
    capacity: usize,
    state: Mutex<CollectorState>,
}

impl ContactCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CollectorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take up to `capacity` of the oldest pending contacts: (contacts, still_pending).
    pub fn drain(&self) -> (Vec<RawContact>, usize) {
        let mut state = self.lock();
        state.seen.clear();
        let take = state.contacts.len().min(self.capacity);
        let contacts: Vec<RawContact> = state.contacts.drain(..take).collect();
        (contacts, state.contacts.len())
    }

    /// Forget every pending contact (world cleared).
    pub fn clear(&self) {
        let mut state = self.lock();
        state.contacts.clear();
        state.seen.clear();
    }

    fn push(&self, key: ((u32, u32), (u32, u32)), contact: RawContact) {
        let mut state = self.lock();
        if !state.seen.insert(key) {
            return;
        }
        state.contacts.push_back(contact);
    }
}

fn pair_key(a: ColliderHandle, b: ColliderHandle) -> ((u32, u32), (u32, u32)) {
    let (a, b) = (a.into_raw_parts(), b.into_raw_parts());
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn impact_along_normal(
    bodies: &RigidBodySet,
    body1: RigidBodyHandle,
    body2: RigidBodyHandle,
    contact_pair: Option<&ContactPair>,
) -> Real {
    let linvel = |h: RigidBodyHandle| {
        bodies
            .get(h)
            .map(|rb| *rb.linvel())
            .unwrap_or_else(Vector::zeros)
    };
    let relative = linvel(body1) - linvel(body2);
    let normal = contact_pair.and_then(|pair| {
        pair.manifolds
            .iter()
            .find(|m| !m.points.is_empty())
            .or_else(|| pair.manifolds.first())
            .map(|m| m.data.normal)
    });
    match normal {
        Some(n) if n.norm_squared() > 0.0 => relative.dot(&n),
        _ => relative.norm(),
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        contact_pair: Option<&ContactPair>,
    ) {
        let CollisionEvent::Started(c1, c2, _) = event else {
            return;
        };
        let parent = |c: ColliderHandle| colliders.get(c).and_then(|col| col.parent());
        let (Some(body1), Some(body2)) = (parent(c1), parent(c2)) else {
            return;
        };
        let impact_velocity = impact_along_normal(bodies, body1, body2, contact_pair);
        self.push(
            pair_key(c1, c2),
            RawContact {
                body1,
                body2,
                impact_velocity,
            },
        );
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        bodies: RigidBodySet,
        colliders: ColliderSet,
        handles: Vec<ColliderHandle>,
    }

    fn fixture(count: usize) -> Fixture {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let mut handles = Vec::new();
        for i in 0..count {
            let rb = RigidBodyBuilder::dynamic()
                .translation(vector![i as Real, 0.0, 0.0])
                .linvel(vector![0.0, -(i as Real + 1.0), 0.0])
                .build();
            let h = bodies.insert(rb);
            handles.push(colliders.insert_with_parent(ColliderBuilder::ball(0.1).build(), h, &mut bodies));
        }
        Fixture {
            bodies,
            colliders,
            handles,
        }
    }

    fn started(a: ColliderHandle, b: ColliderHandle) -> CollisionEvent {
        CollisionEvent::Started(a, b, CollisionEventFlags::empty())
    }

    #[test]
    fn same_pair_reported_once_per_drain() {
        let f = fixture(2);
        let collector = ContactCollector::new(16);
        let (a, b) = (f.handles[0], f.handles[1]);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(a, b), None);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(b, a), None);
        let (contacts, pending) = collector.drain();
        assert_eq!(contacts.len(), 1);
        assert_eq!(pending, 0);

        // A new step may report the same pair again.
        collector.handle_collision_event(&f.bodies, &f.colliders, started(a, b), None);
        assert_eq!(collector.drain().0.len(), 1);
    }

    #[test]
    fn stopped_events_ignored() {
        let f = fixture(2);
        let collector = ContactCollector::new(16);
        let stopped = CollisionEvent::Stopped(f.handles[0], f.handles[1], CollisionEventFlags::empty());
        collector.handle_collision_event(&f.bodies, &f.colliders, stopped, None);
        assert!(collector.drain().0.is_empty());
    }

    #[test]
    fn overflow_waits_for_later_drains() {
        let f = fixture(4);
        let collector = ContactCollector::new(1);
        let (a, b, c) = (f.handles[0], f.handles[1], f.handles[2]);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(a, b), None);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(b, c), None);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(a, c), None);

        let (first, pending) = collector.drain();
        assert_eq!(first.len(), 1);
        assert_eq!(pending, 2);
        let (second, pending) = collector.drain();
        assert_eq!(second.len(), 1);
        assert_eq!(pending, 1);
        let (third, pending) = collector.drain();
        assert_eq!(third.len(), 1);
        assert_eq!(pending, 0);

        let pairs: HashSet<_> = [first, second, third]
            .concat()
            .into_iter()
            .map(|c| (c.body1, c.body2))
            .collect();
        assert_eq!(pairs.len(), 3, "every contact delivered exactly once");
        assert!(collector.drain().0.is_empty());
    }

    #[test]
    fn clear_forgets_pending() {
        let f = fixture(3);
        let collector = ContactCollector::new(1);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(f.handles[0], f.handles[1]), None);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(f.handles[1], f.handles[2]), None);
        collector.clear();
        let (contacts, pending) = collector.drain();
        assert!(contacts.is_empty());
        assert_eq!(pending, 0);
    }

    #[test]
    fn without_manifold_uses_relative_speed() {
        let f = fixture(2);
        let collector = ContactCollector::new(4);
        collector.handle_collision_event(&f.bodies, &f.colliders, started(f.handles[0], f.handles[1]), None);
        let (contacts, _) = collector.drain();
        // Velocities are -1 and -2 on Y: relative speed 1.
        assert!((contacts[0].impact_velocity - 1.0).abs() < 1e-6);
    }
}
