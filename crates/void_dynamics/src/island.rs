//! Simulation island - bodies, broad phase, manifolds and solver of one
//! connected group, stepped as a unit

use crate::arena::Arena;
use crate::body::{BodyHandle, RigidBody, RigidBodyDesc};
use crate::broad_phase::BroadPhase;
use crate::config::ContactConfig;
use crate::error::{DynamicsError, Result};
use crate::events::{ContactEvent, EventCollector};
use crate::manifold::{ContactManifold, DetectionStats, ManifoldHandle, ManifoldStore};
use crate::solver::{Solver, SolverStats};

/// Summary of one island step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    /// Bodies whose broad-phase leaf was reinserted
    pub proxies_moved: usize,
    pub detection: DetectionStats,
    pub solver: SolverStats,
}

/// An island owns everything the contact pipeline touches
///
/// Nothing is shared between islands, so separate islands may be stepped
/// on separate threads.
#[derive(Debug)]
pub struct Island {
    /// Configuration
    config: ContactConfig,

    /// Rigid bodies
    bodies: Arena<RigidBody>,

    /// Broad phase over body AABBs
    broad_phase: BroadPhase,

    /// Persistent contact manifolds
    manifolds: ManifoldStore,

    /// Solver scratch storage
    solver: Solver,

    /// Event collector
    events: EventCollector,
}

impl Island {
    /// Create an empty island
    pub fn new(config: ContactConfig) -> Result<Self> {
        if let Err(err) = config.validate() {
            log::warn!("Rejected contact configuration: {}", err);
            return Err(err);
        }

        Ok(Self {
            broad_phase: BroadPhase::new(&config),
            config,
            bodies: Arena::new(),
            manifolds: ManifoldStore::new(),
            solver: Solver::new(),
            events: EventCollector::new(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &ContactConfig {
        &self.config
    }

    // ==================== Rigid Bodies ====================

    /// Add a rigid body
    pub fn add_body(&mut self, desc: RigidBodyDesc) -> Result<BodyHandle> {
        let body = RigidBody::new(desc)?;
        let aabb = body.aabb;
        let handle = self.bodies.insert(body);
        let proxy = self.broad_phase.insert(handle, &aabb);

        if let Some(body) = self.bodies.get_mut(handle) {
            body.proxy = proxy;
        }

        Ok(handle)
    }

    /// Remove a rigid body together with every manifold it takes part in
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        if !self.bodies.contains(handle) {
            return Err(DynamicsError::BodyNotFound(handle));
        }

        for manifold in self.manifolds.manifolds_of(handle) {
            self.manifolds.destroy(manifold, &mut self.events)?;
        }

        let body = self
            .bodies
            .remove(handle)
            .ok_or(DynamicsError::BodyNotFound(handle))?;
        self.broad_phase.remove(body.proxy);

        Ok(body)
    }

    /// Get a rigid body
    pub fn body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get(handle).ok_or(DynamicsError::BodyNotFound(handle))
    }

    /// Get a rigid body mutably
    ///
    /// Call [`Island::refresh_body`] after teleporting a body so the broad
    /// phase sees its new bounds.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies
            .get_mut(handle)
            .ok_or(DynamicsError::BodyNotFound(handle))
    }

    /// Recompute a body's AABB and inertia from its transform and update its
    /// broad-phase leaf
    pub fn refresh_body(&mut self, handle: BodyHandle) -> Result<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(DynamicsError::BodyNotFound(handle))?;
        body.update_aabb();
        body.update_inertia();
        self.broad_phase.update(body.proxy, &body.aabb, glam::Vec3::ZERO);
        Ok(())
    }

    /// All bodies
    pub fn bodies(&self) -> &Arena<RigidBody> {
        &self.bodies
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Broad phase over all bodies
    pub fn broad_phase(&self) -> &BroadPhase {
        &self.broad_phase
    }

    // ==================== Manifolds ====================

    /// Start tracking contacts between two bodies
    pub fn create_manifold(&mut self, a: BodyHandle, b: BodyHandle) -> Result<ManifoldHandle> {
        for handle in [a, b] {
            if !self.bodies.contains(handle) {
                return Err(DynamicsError::BodyNotFound(handle));
            }
        }

        self.manifolds.create(a, b, &mut self.events)
    }

    /// Stop tracking contacts between two bodies
    pub fn destroy_manifold(&mut self, handle: ManifoldHandle) -> Result<ContactManifold> {
        self.manifolds.destroy(handle, &mut self.events)
    }

    /// Get a manifold
    pub fn manifold(&self, handle: ManifoldHandle) -> Result<&ContactManifold> {
        self.manifolds
            .get(handle)
            .ok_or(DynamicsError::ManifoldNotFound(handle))
    }

    /// Manifold tracking a body pair
    pub fn find_manifold(&self, a: BodyHandle, b: BodyHandle) -> Option<ManifoldHandle> {
        self.manifolds.find(a, b)
    }

    /// All manifolds
    pub fn manifolds(&self) -> &ManifoldStore {
        &self.manifolds
    }

    /// Create manifolds for broad-phase pairs and destroy manifolds whose
    /// bodies drifted apart
    ///
    /// A pair is tracked while the fat AABBs overlap and at least one body is
    /// dynamic. It is dropped once the tight AABBs are further apart than
    /// `manifold_separation_threshold`. Returns the number of created and
    /// destroyed manifolds.
    pub fn track_overlapping_pairs(&mut self) -> Result<(usize, usize)> {
        let mut created = 0;
        for (a, b) in self.broad_phase.candidate_pairs() {
            let (Some(body_a), Some(body_b)) = (self.bodies.get(a), self.bodies.get(b)) else {
                continue;
            };
            if !body_a.is_dynamic() && !body_b.is_dynamic() {
                continue;
            }
            if self.manifolds.find(a, b).is_none() {
                self.manifolds.create(a, b, &mut self.events)?;
                created += 1;
            }
        }

        let threshold = self.config.manifold_separation_threshold;
        let separated: Vec<ManifoldHandle> = self
            .manifolds
            .iter()
            .filter(|(_, m)| match (self.bodies.get(m.body_a()), self.bodies.get(m.body_b())) {
                (Some(a), Some(b)) => !a.aabb.outset(threshold).intersects(&b.aabb),
                _ => true,
            })
            .map(|(h, _)| h)
            .collect();

        for handle in &separated {
            self.manifolds.destroy(*handle, &mut self.events)?;
        }

        Ok((created, separated.len()))
    }

    // ==================== Events ====================

    /// Get the event collector
    pub fn events(&self) -> &EventCollector {
        &self.events
    }

    /// Take all events collected since the last drain
    pub fn drain_events(&mut self) -> Vec<ContactEvent> {
        self.events.drain()
    }

    // ==================== Simulation ====================

    /// Run one step: broad phase, detection, solver, bounds refresh
    pub fn step(&mut self, dt: f32) -> Result<StepStats> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(DynamicsError::InvalidConfig(format!(
                "time step must be positive, got {dt}"
            )));
        }

        let mut stats = StepStats::default();

        for body in self.bodies.values() {
            let displacement = body.linear_velocity * dt;
            if self.broad_phase.update(body.proxy, &body.aabb, displacement) {
                stats.proxies_moved += 1;
            }
        }

        self.manifolds.update_contact_distances(&self.bodies);
        stats.detection = self
            .manifolds
            .update(&self.bodies, &self.config, &mut self.events)?;

        stats.solver = self
            .solver
            .step(&mut self.bodies, &mut self.manifolds, &self.config, dt);

        for body in self.bodies.values_mut() {
            body.update_aabb();
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Shape;
    use glam::Vec3;

    fn island() -> Island {
        Island::new(ContactConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ContactConfig {
            max_contacts: 8,
            ..Default::default()
        };
        assert!(matches!(Island::new(config), Err(DynamicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_remove_body_destroys_manifolds() {
        let mut island = island();
        let ground = island
            .add_body(RigidBodyDesc::fixed(Shape::plane(Vec3::Y, 0.0)))
            .unwrap();
        let ball = island
            .add_body(RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0).with_position(0.0, 0.5, 0.0))
            .unwrap();

        let manifold = island.create_manifold(ball, ground).unwrap();
        island.remove_body(ball).unwrap();

        assert!(island.manifold(manifold).is_err());
        assert!(island.find_manifold(ball, ground).is_none());
        assert_eq!(island.body_count(), 1);
        assert_eq!(island.broad_phase.tree().len(), 1);
        assert!(matches!(island.remove_body(ball), Err(DynamicsError::BodyNotFound(_))));
    }

    #[test]
    fn test_manifold_needs_live_bodies() {
        let mut island = island();
        let ball = island
            .add_body(RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0))
            .unwrap();
        let other = island
            .add_body(RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0))
            .unwrap();
        island.remove_body(other).unwrap();

        assert!(matches!(
            island.create_manifold(ball, other),
            Err(DynamicsError::BodyNotFound(_))
        ));
    }

    #[test]
    fn test_pair_tracker_creates_and_drops() {
        let mut island = island();
        let ground = island
            .add_body(RigidBodyDesc::fixed(Shape::cuboid(5.0, 0.5, 5.0)).with_position(0.0, -0.5, 0.0))
            .unwrap();
        let wall = island
            .add_body(RigidBodyDesc::fixed(Shape::cuboid(0.5, 5.0, 5.0)).with_position(5.5, 5.0, 0.0))
            .unwrap();
        let ball = island
            .add_body(RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0).with_position(0.0, 0.5, 0.0))
            .unwrap();

        assert_eq!(island.track_overlapping_pairs().unwrap(), (1, 0));
        assert!(island.find_manifold(ball, ground).is_some());
        assert!(island.find_manifold(ground, wall).is_none());

        island.body_mut(ball).unwrap().position.y = 3.0;
        island.refresh_body(ball).unwrap();
        assert_eq!(island.track_overlapping_pairs().unwrap(), (0, 1));
        assert!(island.find_manifold(ball, ground).is_none());
    }

    #[test]
    fn test_step_rejects_bad_dt() {
        let mut island = island();
        assert!(island.step(0.0).is_err());
        assert!(island.step(f32::NAN).is_err());
    }
}
