//! Sequential-impulse solver
//!
//! A step runs in strict order:
//! - gravity is added to dynamic bodies
//! - contact rows are prepared and warm started
//! - velocity passes solve normal rows, then friction pairs against the
//!   updated normal impulses
//! - accumulated velocity changes are applied and bodies integrated
//! - position passes run until penetration is within tolerance
//!
//! All rows are scratch state rebuilt every step. Only the impulses written
//! back into the manifolds survive.

pub mod contact;
pub mod row;

pub use contact::{solve_position, ContactConstraints, FrictionRowPair};
pub use row::{ConstraintRow, DeltaVelocities, DeltaVelocity, RowBody, RowCache, RowOptions};

use crate::arena::Arena;
use crate::body::RigidBody;
use crate::config::ContactConfig;
use crate::manifold::ManifoldStore;

/// Summary of one solver step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverStats {
    /// Rows in the row cache
    pub rows: usize,
    /// Position passes run
    pub position_passes: usize,
    /// Smallest contact distance seen by the last position pass
    pub min_distance: f32,
}

/// Solver with scratch storage reused across steps
#[derive(Debug, Default)]
pub struct Solver {
    cache: RowCache,
    contacts: ContactConstraints,
    deltas: DeltaVelocities,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of the last step
    pub fn row_cache(&self) -> &RowCache {
        &self.cache
    }

    /// Contact rows of the last step
    pub fn contacts(&self) -> &ContactConstraints {
        &self.contacts
    }

    /// Advance velocities and transforms by `dt`
    pub fn step(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        manifolds: &mut ManifoldStore,
        config: &ContactConfig,
        dt: f32,
    ) -> SolverStats {
        for body in bodies.values_mut().filter(|b| b.is_dynamic()) {
            body.linear_velocity += config.gravity * dt;
        }

        self.cache.clear();
        self.deltas.reset(bodies.slot_count());
        self.contacts
            .prepare(&mut self.cache, &mut self.deltas, manifolds, bodies, dt);

        for _ in 0..config.velocity_iterations {
            self.cache.solve(&mut self.deltas);
            self.contacts.iterate(&self.cache, &mut self.deltas);
        }

        for (handle, body) in bodies.iter_mut() {
            if body.is_dynamic() {
                let delta = self.deltas.get(handle.index());
                body.linear_velocity += delta.linear;
                body.angular_velocity += delta.angular;
            }
        }

        for body in bodies.values_mut() {
            body.integrate(dt);
        }

        let mut stats = SolverStats {
            rows: self.cache.rows.len(),
            ..Default::default()
        };

        for _ in 0..config.position_iterations {
            stats.min_distance = solve_position(manifolds, bodies, config);
            stats.position_passes += 1;
            if stats.min_distance >= config.position_min_error {
                break;
            }
        }

        self.contacts.store_impulses(&self.cache, manifolds);

        log::trace!(
            "Solved {} rows, {} position passes, min distance {:.5}",
            stats.rows,
            stats.position_passes,
            stats.min_distance
        );

        stats
    }
}
