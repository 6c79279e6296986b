//! Constraint rows and the step-scoped row cache

use glam::{Mat3, Vec3};

use crate::config::LARGE_SCALAR;

/// Velocity change accumulated by one body during a step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeltaVelocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// Per-body accumulators for a step, indexed by body slot
#[derive(Debug, Clone, Default)]
pub struct DeltaVelocities {
    deltas: Vec<DeltaVelocity>,
}

impl DeltaVelocities {
    /// Zero `count` accumulators
    pub fn reset(&mut self, count: usize) {
        self.deltas.clear();
        self.deltas.resize(count, DeltaVelocity::default());
    }

    pub fn get(&self, slot: usize) -> DeltaVelocity {
        self.deltas.get(slot).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    #[inline]
    fn apply(&mut self, slot: usize, inv_mass: f32, inv_inertia: Mat3, linear: Vec3, angular: Vec3, impulse: f32) {
        let delta = &mut self.deltas[slot];
        delta.linear += linear * (inv_mass * impulse);
        delta.angular += inv_inertia * angular * impulse;
    }
}

/// Mass properties of one side of a row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBody {
    /// Accumulator slot
    pub slot: usize,
    pub inv_mass: f32,
    pub inv_inertia: Mat3,
}

/// Per-row inputs of [`ConstraintRow::prepare`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RowOptions {
    /// Position error folded into the target velocity
    pub error: f32,
    pub restitution: f32,
}

/// One scalar velocity constraint between two bodies
///
/// The Jacobian is `{linear A, angular A, linear B, angular B}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintRow {
    pub jacobian: [Vec3; 4],
    pub body: [RowBody; 2],
    pub lower_limit: f32,
    pub upper_limit: f32,
    /// Accumulated impulse
    pub impulse: f32,
    pub eff_mass: f32,
    /// Target relative velocity
    pub rhs: f32,
}

impl ConstraintRow {
    /// Row with unbounded limits and no accumulated impulse
    pub fn new(jacobian: [Vec3; 4], body_a: RowBody, body_b: RowBody) -> Self {
        Self {
            jacobian,
            body: [body_a, body_b],
            lower_limit: -LARGE_SCALAR,
            upper_limit: LARGE_SCALAR,
            impulse: 0.0,
            eff_mass: 0.0,
            rhs: 0.0,
        }
    }

    /// `J M^-1 J^T`
    pub fn inverse_effective_mass(&self) -> f32 {
        let [a, b] = &self.body;
        let j = &self.jacobian;
        j[0].length_squared() * a.inv_mass
            + (a.inv_inertia * j[1]).dot(j[1])
            + j[2].length_squared() * b.inv_mass
            + (b.inv_inertia * j[3]).dot(j[3])
    }

    /// Relative velocity along the row
    pub fn relative_velocity(&self, linvel_a: Vec3, angvel_a: Vec3, linvel_b: Vec3, angvel_b: Vec3) -> f32 {
        let j = &self.jacobian;
        j[0].dot(linvel_a) + j[1].dot(angvel_a) + j[2].dot(linvel_b) + j[3].dot(angvel_b)
    }

    /// Compute effective mass and target velocity from the bodies'
    /// velocities at the start of the step
    pub fn prepare(&mut self, options: RowOptions, linvel_a: Vec3, angvel_a: Vec3, linvel_b: Vec3, angvel_b: Vec3) {
        let inv_k = self.inverse_effective_mass();
        self.eff_mass = if inv_k > 0.0 { 1.0 / inv_k } else { 0.0 };

        let relvel = self.relative_velocity(linvel_a, angvel_a, linvel_b, angvel_b);
        self.rhs = -(options.error + relvel * (1.0 + options.restitution));
    }

    /// Apply an impulse along the row to both accumulators
    pub fn apply_impulse(&self, deltas: &mut DeltaVelocities, impulse: f32) {
        let [a, b] = &self.body;
        let j = &self.jacobian;
        deltas.apply(a.slot, a.inv_mass, a.inv_inertia, j[0], j[1], impulse);
        deltas.apply(b.slot, b.inv_mass, b.inv_inertia, j[2], j[3], impulse);
    }

    /// Apply the impulse carried over from the previous step
    pub fn warm_start(&self, deltas: &mut DeltaVelocities) {
        self.apply_impulse(deltas, self.impulse);
    }

    /// Relative velocity change accumulated so far along the row
    pub fn delta_relative_velocity(&self, deltas: &DeltaVelocities) -> f32 {
        let (da, db) = (deltas.get(self.body[0].slot), deltas.get(self.body[1].slot));
        self.relative_velocity(da.linear, da.angular, db.linear, db.angular)
    }

    /// One Gauss-Seidel update, clamping the accumulated impulse to the limits
    pub fn solve(&mut self, deltas: &mut DeltaVelocities) {
        let delta_impulse = (self.rhs - self.delta_relative_velocity(deltas)) * self.eff_mass;
        let impulse = (self.impulse + delta_impulse).clamp(self.lower_limit, self.upper_limit);
        let applied = impulse - self.impulse;
        self.impulse = impulse;
        self.apply_impulse(deltas, applied);
    }
}

/// Rows of all constraints for one step, rebuilt from scratch every step
#[derive(Debug, Clone, Default)]
pub struct RowCache {
    pub rows: Vec<ConstraintRow>,
    /// Number of rows of each constraint, in insertion order
    pub con_num_rows: Vec<usize>,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.con_num_rows.clear();
    }

    /// Solve every row once
    pub fn solve(&mut self, deltas: &mut DeltaVelocities) {
        for row in &mut self.rows {
            row.solve(deltas);
        }
    }
}
