//! Persistent contact manifolds
//!
//! A manifold holds up to [`MAX_CONTACTS`] points for one body pair. Points
//! keep their identity across steps while new candidates land close to
//! them, which is what carries the solver's warm-start impulses from one
//! step to the next.

use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::arena::{Arena, Handle};
use crate::body::{BodyHandle, RigidBody};
use crate::config::{ContactConfig, MAX_CONTACTS};
use crate::error::{DynamicsError, Result};
use crate::events::{ContactData, ContactEvent, ContactEventHandler, ContactEventType};
use crate::math::to_world_space;
use crate::narrow::{
    collide, in_detection_range, replacement_index, CollisionContext, CollisionPoint, CollisionResult,
    NormalAttachment,
};

/// Handle to a contact manifold
pub type ManifoldHandle = Handle<ContactManifold>;

/// Stable identity of a contact point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContactId(pub u64);

/// A persisted contact point
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactPoint {
    pub id: ContactId,
    /// Pivot in A's object space
    pub pivot_a: Vec3,
    /// Pivot in B's object space
    pub pivot_b: Vec3,
    /// World-space normal, from B towards A
    pub normal: Vec3,
    /// Normal in the object space of the body it is attached to
    pub local_normal: Vec3,
    pub attachment: NormalAttachment,
    pub friction: f32,
    pub restitution: f32,
    pub stiffness: f32,
    pub damping: f32,
    /// Signed separation along the normal
    pub distance: f32,
    /// Steps survived since creation
    pub lifetime: u32,
    /// Accumulated normal impulse, used for warm starting
    pub normal_impulse: f32,
    /// Accumulated impulse along both tangents
    pub friction_impulse: [f32; 2],
}

impl ContactPoint {
    /// World-space normal regenerated from the attachment
    ///
    /// Unattached normals are returned unchanged.
    pub fn attached_normal(&self, orn_a: Quat, orn_b: Quat) -> Vec3 {
        match self.attachment {
            NormalAttachment::NormalOnA => orn_a * self.local_normal,
            NormalAttachment::NormalOnB => orn_b * self.local_normal,
            NormalAttachment::None => self.normal,
        }
    }

    fn set_geometry(&mut self, cp: &CollisionPoint, orn_a: Quat, orn_b: Quat) {
        self.pivot_a = cp.pivot_a;
        self.pivot_b = cp.pivot_b;
        self.normal = cp.normal;
        self.distance = cp.distance;
        self.attachment = cp.attachment;
        self.local_normal = match cp.attachment {
            NormalAttachment::NormalOnA => orn_a.conjugate() * cp.normal,
            NormalAttachment::NormalOnB => orn_b.conjugate() * cp.normal,
            NormalAttachment::None => Vec3::ZERO,
        };
    }
}

/// Contact points shared by a body pair
#[derive(Debug, Clone)]
pub struct ContactManifold {
    /// Bodies A and B, in the order the points' pivots refer to
    pub body: [BodyHandle; 2],
    points: [ContactPoint; MAX_CONTACTS],
    len: usize,
}

impl ContactManifold {
    fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body: [body_a, body_b],
            points: [ContactPoint::default(); MAX_CONTACTS],
            len: 0,
        }
    }

    pub fn body_a(&self) -> BodyHandle {
        self.body[0]
    }

    pub fn body_b(&self) -> BodyHandle {
        self.body[1]
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live points
    pub fn points(&self) -> &[ContactPoint] {
        &self.points[..self.len]
    }

    /// Live points, mutable
    pub fn points_mut(&mut self) -> &mut [ContactPoint] {
        &mut self.points[..self.len]
    }

    /// Look up a point by id
    pub fn point(&self, id: ContactId) -> Option<&ContactPoint> {
        self.points().iter().find(|p| p.id == id)
    }

    fn push(&mut self, point: ContactPoint) {
        debug_assert!(self.len < MAX_CONTACTS, "manifold overflow");
        self.points[self.len] = point;
        self.len += 1;
    }

    /// Remove point `index` by moving the last point into its slot
    fn swap_remove(&mut self, index: usize) -> ContactPoint {
        debug_assert!(index < self.len);
        let removed = self.points[index];
        self.len -= 1;
        self.points[index] = self.points[self.len];
        removed
    }
}

/// Counts reported by [`ManifoldStore::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionStats {
    /// Manifolds whose bodies were close enough for the narrow phase to run,
    /// whether or not it found contacts
    pub narrow_phase_runs: usize,
    pub points_created: usize,
    pub points_merged: usize,
    pub points_destroyed: usize,
}

/// All manifolds of an island, keyed by body pair
#[derive(Debug, Default)]
pub struct ManifoldStore {
    manifolds: Arena<ContactManifold>,
    pairs: HashMap<(BodyHandle, BodyHandle), ManifoldHandle>,
    next_contact_id: u64,
}

fn pair_key(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn contact_data(point: &ContactPoint) -> ContactData {
    ContactData {
        id: point.id,
        pivot_a: point.pivot_a,
        normal: point.normal,
        distance: point.distance,
        impulse: point.normal_impulse,
    }
}

fn body(bodies: &Arena<RigidBody>, handle: BodyHandle) -> Result<&RigidBody> {
    bodies.get(handle).ok_or(DynamicsError::BodyNotFound(handle))
}

impl ManifoldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of manifolds
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    pub fn get(&self, handle: ManifoldHandle) -> Option<&ContactManifold> {
        self.manifolds.get(handle)
    }

    pub fn get_mut(&mut self, handle: ManifoldHandle) -> Option<&mut ContactManifold> {
        self.manifolds.get_mut(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ManifoldHandle, &ContactManifold)> {
        self.manifolds.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ManifoldHandle, &mut ContactManifold)> {
        self.manifolds.iter_mut()
    }

    /// Manifold tracking a body pair, in either order
    pub fn find(&self, a: BodyHandle, b: BodyHandle) -> Option<ManifoldHandle> {
        self.pairs.get(&pair_key(a, b)).copied()
    }

    /// Manifolds involving `body`
    pub fn manifolds_of(&self, body: BodyHandle) -> Vec<ManifoldHandle> {
        self.manifolds
            .iter()
            .filter(|(_, m)| m.body.contains(&body))
            .map(|(h, _)| h)
            .collect()
    }

    /// Start tracking a body pair
    pub fn create(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        events: &mut dyn ContactEventHandler,
    ) -> Result<ManifoldHandle> {
        if body_a == body_b {
            return Err(DynamicsError::SelfPair(body_a));
        }

        let key = pair_key(body_a, body_b);
        if self.pairs.contains_key(&key) {
            return Err(DynamicsError::PairAlreadyTracked(body_a, body_b));
        }

        let handle = self.manifolds.insert(ContactManifold::new(body_a, body_b));
        self.pairs.insert(key, handle);

        log::debug!("Created manifold {:?} for {:?} / {:?}", handle, body_a, body_b);
        events.on_contact_event(&ContactEvent {
            manifold: handle,
            body_a,
            body_b,
            event_type: ContactEventType::ManifoldCreated,
            contact: None,
        });

        Ok(handle)
    }

    /// Stop tracking a body pair, destroying its points with it
    pub fn destroy(
        &mut self,
        handle: ManifoldHandle,
        events: &mut dyn ContactEventHandler,
    ) -> Result<ContactManifold> {
        let manifold = self
            .manifolds
            .remove(handle)
            .ok_or(DynamicsError::ManifoldNotFound(handle))?;
        self.pairs.remove(&pair_key(manifold.body_a(), manifold.body_b()));

        for point in manifold.points() {
            events.on_contact_event(&ContactEvent {
                manifold: handle,
                body_a: manifold.body_a(),
                body_b: manifold.body_b(),
                event_type: ContactEventType::PointDestroyed,
                contact: Some(contact_data(point)),
            });
        }

        log::debug!(
            "Destroyed manifold {:?} with {} points",
            handle,
            manifold.len()
        );
        events.on_contact_event(&ContactEvent {
            manifold: handle,
            body_a: manifold.body_a(),
            body_b: manifold.body_b(),
            event_type: ContactEventType::ManifoldDestroyed,
            contact: None,
        });

        Ok(manifold)
    }

    /// Refresh every point's normal and signed distance from the current
    /// body transforms, without running the narrow phase
    pub fn update_contact_distances(&mut self, bodies: &Arena<RigidBody>) {
        for (_, manifold) in self.manifolds.iter_mut() {
            let (Some(a), Some(b)) = (bodies.get(manifold.body_a()), bodies.get(manifold.body_b()))
            else {
                continue;
            };

            let (origin_a, origin_b) = (a.origin(), b.origin());
            for point in manifold.points_mut() {
                point.normal = point.attached_normal(a.orientation, b.orientation);
                let pivot_a = to_world_space(point.pivot_a, origin_a, a.orientation);
                let pivot_b = to_world_space(point.pivot_b, origin_b, b.orientation);
                point.distance = point.normal.dot(pivot_a - pivot_b);
            }
        }
    }

    /// Run detection for every manifold: narrow phase where the bodies are
    /// close, merge of the candidates, then eviction of stale points
    pub fn update(
        &mut self,
        bodies: &Arena<RigidBody>,
        config: &ContactConfig,
        events: &mut dyn ContactEventHandler,
    ) -> Result<DetectionStats> {
        let mut stats = DetectionStats::default();
        let handles: Vec<ManifoldHandle> = self.manifolds.handles().collect();

        for handle in handles {
            let Some(manifold) = self.manifolds.get(handle) else {
                continue;
            };
            let a = body(bodies, manifold.body_a())?;
            let b = body(bodies, manifold.body_b())?;

            let result = if in_detection_range(a, b, config) {
                stats.narrow_phase_runs += 1;
                collide(&a.shape, &b.shape, &CollisionContext::new(a, b, config))
            } else {
                CollisionResult::new()
            };

            let merged = self.process_result(handle, &result, bodies, config, events)?;
            stats.points_merged += merged.0;
            stats.points_created += merged.1;
            stats.points_destroyed += merged.2;
            stats.points_destroyed += self.prune(handle, bodies, config, events)?;
        }

        if stats.points_created > 0 || stats.points_destroyed > 0 {
            log::debug!(
                "Contact points: {} created, {} destroyed, {} merged",
                stats.points_created,
                stats.points_destroyed,
                stats.points_merged
            );
        }

        Ok(stats)
    }

    /// Merge fresh candidates into a manifold
    ///
    /// Each candidate overwrites the closest unrefreshed point within the
    /// caching threshold (compared in either body's object space), keeping
    /// that point's id and impulses. Other candidates become new points, or
    /// replace a point when the manifold is full. The manifold is reported
    /// as changed whenever a point was merged or created. Returns the number
    /// of merged, created and replaced points.
    pub fn process_result(
        &mut self,
        handle: ManifoldHandle,
        result: &CollisionResult,
        bodies: &Arena<RigidBody>,
        config: &ContactConfig,
        events: &mut dyn ContactEventHandler,
    ) -> Result<(usize, usize, usize)> {
        let manifold = self
            .manifolds
            .get_mut(handle)
            .ok_or(DynamicsError::ManifoldNotFound(handle))?;
        let a = body(bodies, manifold.body_a())?;
        let b = body(bodies, manifold.body_b())?;

        for point in manifold.points_mut() {
            point.lifetime += 1;
        }

        let caching_sqr = config.caching_threshold * config.caching_threshold;
        let mut refreshed = [false; MAX_CONTACTS];
        let (mut merged, mut created, mut replaced) = (0, 0, 0);

        for candidate in result.points() {
            let nearest = manifold
                .points()
                .iter()
                .enumerate()
                .filter(|(i, _)| !refreshed[*i])
                .map(|(i, p)| {
                    let dist_sqr = p
                        .pivot_a
                        .distance_squared(candidate.pivot_a)
                        .min(p.pivot_b.distance_squared(candidate.pivot_b));
                    (i, dist_sqr)
                })
                .filter(|(_, dist_sqr)| *dist_sqr < caching_sqr)
                .min_by(|x, y| x.1.total_cmp(&y.1))
                .map(|(i, _)| i);

            if let Some(index) = nearest {
                manifold.points[index].set_geometry(candidate, a.orientation, b.orientation);
                refreshed[index] = true;
                merged += 1;
                continue;
            }

            let mut point = ContactPoint {
                id: ContactId(self.next_contact_id),
                friction: a.material.combine_friction(&b.material),
                restitution: a.material.combine_restitution(&b.material),
                ..Default::default()
            };
            (point.stiffness, point.damping) = a.material.combine_spring(&b.material);
            point.set_geometry(candidate, a.orientation, b.orientation);
            self.next_contact_id += 1;

            let index = if manifold.len() < MAX_CONTACTS {
                manifold.push(point);
                manifold.len() - 1
            } else {
                let pivots = manifold.points.map(|p| p.pivot_a);
                let distances = manifold.points.map(|p| p.distance);
                let Some(index) =
                    replacement_index(&pivots, &distances, point.pivot_a, point.distance)
                else {
                    continue;
                };

                let old = manifold.points[index];
                events.on_contact_event(&ContactEvent {
                    manifold: handle,
                    body_a: manifold.body_a(),
                    body_b: manifold.body_b(),
                    event_type: ContactEventType::PointDestroyed,
                    contact: Some(contact_data(&old)),
                });
                manifold.points[index] = point;
                replaced += 1;
                index
            };

            refreshed[index] = true;
            created += 1;
            events.on_contact_event(&ContactEvent {
                manifold: handle,
                body_a: manifold.body_a(),
                body_b: manifold.body_b(),
                event_type: ContactEventType::PointCreated,
                contact: Some(contact_data(&point)),
            });
        }

        if created > 0 || merged > 0 {
            events.on_manifold_changed(handle);
        }

        Ok((merged, created, replaced))
    }

    /// Evict points that separated past the breaking threshold along the
    /// normal or drifted past it within the contact plane
    ///
    /// Returns the number of evicted points.
    pub fn prune(
        &mut self,
        handle: ManifoldHandle,
        bodies: &Arena<RigidBody>,
        config: &ContactConfig,
        events: &mut dyn ContactEventHandler,
    ) -> Result<usize> {
        let manifold = self
            .manifolds
            .get_mut(handle)
            .ok_or(DynamicsError::ManifoldNotFound(handle))?;
        let a = body(bodies, manifold.body_a())?;
        let b = body(bodies, manifold.body_b())?;

        let (origin_a, origin_b) = (a.origin(), b.origin());
        let threshold = config.breaking_threshold;
        let mut evicted = 0;

        // Backwards, so the point swapped into a freed slot was already checked.
        for index in (0..manifold.len()).rev() {
            let point = &manifold.points[index];
            let pivot_a = to_world_space(point.pivot_a, origin_a, a.orientation);
            let pivot_b = to_world_space(point.pivot_b, origin_b, b.orientation);
            let delta = pivot_a - pivot_b;
            let normal_dist = delta.dot(point.normal);
            let tangential = delta - point.normal * normal_dist;

            if normal_dist > threshold || tangential.length_squared() > threshold * threshold {
                let removed = manifold.swap_remove(index);
                evicted += 1;
                events.on_contact_event(&ContactEvent {
                    manifold: handle,
                    body_a: manifold.body_a(),
                    body_b: manifold.body_b(),
                    event_type: ContactEventType::PointDestroyed,
                    contact: Some(contact_data(&removed)),
                });
            }
        }

        if evicted > 0 {
            events.on_manifold_changed(handle);
        }

        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyDesc;
    use crate::events::EventCollector;
    use crate::material::Material;
    use crate::shapes::Shape;
    use approx::assert_abs_diff_eq;

    struct Fixture {
        bodies: Arena<RigidBody>,
        store: ManifoldStore,
        events: EventCollector,
        config: ContactConfig,
        ball: BodyHandle,
        ground: BodyHandle,
        manifold: ManifoldHandle,
    }

    fn fixture() -> Fixture {
        let mut bodies = Arena::new();
        let ball = bodies.insert(
            RigidBody::new(
                RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0)
                    .with_position(0.0, 0.49, 0.0)
                    .with_material(Material::new(0.6, 0.5)),
            )
            .unwrap(),
        );
        let ground = bodies.insert(
            RigidBody::new(
                RigidBodyDesc::fixed(Shape::plane(Vec3::Y, 0.0))
                    .with_material(Material::new(0.5, 0.4)),
            )
            .unwrap(),
        );

        let mut store = ManifoldStore::new();
        let mut events = EventCollector::new();
        let manifold = store.create(ball, ground, &mut events).unwrap();

        Fixture {
            bodies,
            store,
            events,
            config: ContactConfig::default(),
            ball,
            ground,
            manifold,
        }
    }

    fn candidate(x: f32, z: f32, distance: f32) -> CollisionPoint {
        CollisionPoint {
            pivot_a: Vec3::new(x, -0.5, z),
            pivot_b: Vec3::new(x, 0.0, z),
            normal: Vec3::Y,
            distance,
            attachment: NormalAttachment::NormalOnB,
        }
    }

    fn result(points: &[CollisionPoint]) -> CollisionResult {
        let mut result = CollisionResult::new();
        for p in points {
            result.add(*p);
        }
        result
    }

    impl Fixture {
        fn process(&mut self, points: &[CollisionPoint]) -> (usize, usize, usize) {
            self.store
                .process_result(
                    self.manifold,
                    &result(points),
                    &self.bodies,
                    &self.config,
                    &mut self.events,
                )
                .unwrap()
        }

        fn prune(&mut self) -> usize {
            self.store
                .prune(self.manifold, &self.bodies, &self.config, &mut self.events)
                .unwrap()
        }

        fn manifold(&self) -> &ContactManifold {
            self.store.get(self.manifold).unwrap()
        }
    }

    #[test]
    fn test_narrow_phase_runs_count_gated_pairs_only() {
        let mut f = fixture();
        let stats = f.store.update(&f.bodies, &f.config, &mut f.events).unwrap();
        assert_eq!(stats.narrow_phase_runs, 1);
        assert_eq!(stats.points_created, 1);

        let ball = f.bodies.get_mut(f.ball).unwrap();
        ball.position.y = 5.0;
        ball.update_aabb();
        f.store.update_contact_distances(&f.bodies);
        let stats = f.store.update(&f.bodies, &f.config, &mut f.events).unwrap();
        assert_eq!(stats.narrow_phase_runs, 0);
        assert_eq!(stats.points_destroyed, 1);
    }

    #[test]
    fn test_create_rejects_bad_pairs() {
        let mut f = fixture();
        assert!(matches!(
            f.store.create(f.ball, f.ball, &mut f.events),
            Err(DynamicsError::SelfPair(_))
        ));
        assert!(matches!(
            f.store.create(f.ground, f.ball, &mut f.events),
            Err(DynamicsError::PairAlreadyTracked(_, _))
        ));
        assert_eq!(f.store.find(f.ground, f.ball), Some(f.manifold));
    }

    #[test]
    fn test_new_point_combines_materials() {
        let mut f = fixture();
        assert_eq!(f.process(&[candidate(0.0, 0.0, -0.01)]), (0, 1, 0));

        let point = f.manifold().points()[0];
        assert_abs_diff_eq!(point.friction, 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(point.restitution, 0.2, epsilon = 1e-6);
        assert_eq!(point.lifetime, 0);
        assert_abs_diff_eq!(point.local_normal, Vec3::Y, epsilon = 1e-6);
        assert_eq!(f.events.points_created().count(), 1);
        assert!(f.events.is_changed(f.manifold));
    }

    #[test]
    fn test_merge_preserves_identity_and_impulse() {
        let mut f = fixture();
        f.process(&[candidate(0.0, 0.0, -0.01)]);
        let id = f.manifold().points()[0].id;
        f.store.get_mut(f.manifold).unwrap().points_mut()[0].normal_impulse = 0.25;

        f.events.clear();
        assert_eq!(f.process(&[candidate(0.01, 0.0, -0.02)]), (1, 0, 0));
        assert!(f.events.is_changed(f.manifold));
        assert_eq!(f.events.points_created().count(), 0);

        let point = f.manifold().points()[0];
        assert_eq!(f.manifold().len(), 1);
        assert_eq!(point.id, id);
        assert_eq!(point.normal_impulse, 0.25);
        assert_eq!(point.distance, -0.02);
        assert_eq!(point.lifetime, 1);
    }

    #[test]
    fn test_distant_candidate_adds_point() {
        let mut f = fixture();
        f.process(&[candidate(0.0, 0.0, -0.01)]);
        assert_eq!(f.process(&[candidate(0.2, 0.0, -0.01)]), (0, 1, 0));
        assert_eq!(f.manifold().len(), 2);
    }

    #[test]
    fn test_full_manifold_replaces_point() {
        let mut f = fixture();
        f.process(&[
            candidate(-0.1, -0.1, -0.01),
            candidate(0.1, -0.1, -0.02),
            candidate(0.1, 0.1, -0.01),
            candidate(-0.1, 0.1, -0.01),
        ]);
        let deepest = f.manifold().points()[1].id;
        f.events.clear();

        assert_eq!(f.process(&[candidate(0.3, 0.0, -0.01)]), (0, 1, 1));
        assert_eq!(f.manifold().len(), MAX_CONTACTS);
        assert!(f.manifold().point(deepest).is_some());
        assert_eq!(f.events.points_created().count(), 1);
        assert_eq!(f.events.points_destroyed().count(), 1);
    }

    #[test]
    fn test_separation_evicts_point() {
        let mut f = fixture();
        f.process(&[candidate(0.0, 0.0, -0.01)]);

        f.store.update_contact_distances(&f.bodies);
        assert_abs_diff_eq!(f.manifold().points()[0].distance, -0.01, epsilon = 1e-5);
        assert_eq!(f.prune(), 0);

        f.bodies.get_mut(f.ball).unwrap().position.y += 0.1;
        f.store.update_contact_distances(&f.bodies);
        assert_abs_diff_eq!(f.manifold().points()[0].distance, 0.09, epsilon = 1e-5);

        assert_eq!(f.prune(), 1);
        assert!(f.manifold().is_empty());
        assert_eq!(f.events.points_destroyed().count(), 1);
    }

    #[test]
    fn test_tangential_drift_evicts_point() {
        let mut f = fixture();
        f.process(&[candidate(0.0, 0.0, -0.01), candidate(0.2, 0.0, -0.01)]);

        f.bodies.get_mut(f.ball).unwrap().position.x += 0.05;
        assert_eq!(f.prune(), 2);
    }

    #[test]
    fn test_destroy_releases_pair() {
        let mut f = fixture();
        f.process(&[candidate(0.0, 0.0, -0.01)]);
        f.events.clear();

        let manifold = f.store.destroy(f.manifold, &mut f.events).unwrap();
        assert_eq!(manifold.len(), 1);
        assert!(f.store.find(f.ball, f.ground).is_none());
        assert_eq!(f.events.points_destroyed().count(), 1);
        assert!(matches!(
            f.store.destroy(f.manifold, &mut f.events),
            Err(DynamicsError::ManifoldNotFound(_))
        ));
    }

    #[test]
    fn test_update_detects_resting_sphere() {
        let mut f = fixture();
        let stats = f.store.update(&f.bodies, &f.config, &mut f.events).unwrap();
        assert_eq!(stats.points_created, 1);

        let point = f.manifold().points()[0];
        assert_abs_diff_eq!(point.distance, -0.01, epsilon = 1e-5);
        assert_abs_diff_eq!(point.normal, Vec3::Y, epsilon = 1e-5);

        let stats = f.store.update(&f.bodies, &f.config, &mut f.events).unwrap();
        assert_eq!((stats.points_created, stats.points_merged), (0, 1));
        assert_eq!(f.manifold().points()[0].id, point.id);
    }
}
