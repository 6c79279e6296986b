//! Contact constraint: normal rows, coupled friction and position solving

use glam::Vec3;

use crate::arena::Arena;
use crate::body::{BodyHandle, RigidBody};
use crate::config::{ContactConfig, LARGE_SCALAR};
use crate::manifold::{ManifoldHandle, ManifoldStore};
use crate::math::{integrate_orientation, plane_space, to_world_space, EPSILON};

use super::row::{ConstraintRow, DeltaVelocities, RowBody, RowCache, RowOptions};

/// The two tangential rows of a contact
///
/// Kept apart from the row cache since their limit depends on the normal
/// row's impulse, which changes every iteration.
#[derive(Debug, Clone, Copy)]
pub struct FrictionRowPair {
    pub rows: [ConstraintRow; 2],
    pub friction_coefficient: f32,
}

fn row_body(handle: BodyHandle, body: &RigidBody) -> RowBody {
    RowBody {
        slot: handle.index(),
        inv_mass: body.inv_mass,
        inv_inertia: body.inv_inertia_world,
    }
}

/// Rows built from all manifold points for one step
#[derive(Debug, Default)]
pub struct ContactConstraints {
    start_row: usize,
    friction_rows: Vec<FrictionRowPair>,
    /// Point of each normal row, in row order
    contacts: Vec<(ManifoldHandle, usize)>,
}

impl ContactConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contact points turned into rows
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Friction rows of the current step
    pub fn friction_rows(&self) -> &[FrictionRowPair] {
        &self.friction_rows
    }

    /// Build one normal row per point into `cache` and a friction pair into
    /// the side table, warm starting all of them
    pub fn prepare(
        &mut self,
        cache: &mut RowCache,
        deltas: &mut DeltaVelocities,
        manifolds: &ManifoldStore,
        bodies: &Arena<RigidBody>,
        dt: f32,
    ) {
        self.start_row = cache.rows.len();
        self.friction_rows.clear();
        self.contacts.clear();

        for (handle, manifold) in manifolds.iter() {
            let (handle_a, handle_b) = (manifold.body_a(), manifold.body_b());
            let (Some(a), Some(b)) = (bodies.get(handle_a), bodies.get(handle_b)) else {
                continue;
            };
            let (origin_a, origin_b) = (a.origin(), b.origin());
            let (body_a, body_b) = (row_body(handle_a, a), row_body(handle_b, b));

            for (index, cp) in manifold.points().iter().enumerate() {
                let normal = cp.normal;
                let pivot_a = to_world_space(cp.pivot_a, origin_a, a.orientation);
                let pivot_b = to_world_space(cp.pivot_b, origin_b, b.orientation);
                let r_a = pivot_a - a.position;
                let r_b = pivot_b - b.position;
                let normal_relvel = (a.velocity_at(pivot_a) - b.velocity_at(pivot_b)).dot(normal);

                let mut normal_row =
                    ConstraintRow::new([normal, r_a.cross(normal), -normal, -r_b.cross(normal)], body_a, body_b);
                normal_row.impulse = cp.normal_impulse;
                normal_row.lower_limit = 0.0;

                let mut options = RowOptions {
                    error: 0.0,
                    restitution: cp.restitution,
                };

                if cp.distance < 0.0 {
                    if cp.stiffness < LARGE_SCALAR {
                        let spring_force = cp.distance * cp.stiffness;
                        let damper_force = normal_relvel * cp.damping;
                        normal_row.upper_limit = (spring_force + damper_force).abs() * dt;
                    }
                } else if cp.stiffness >= LARGE_SCALAR {
                    // Only remove the velocity that would close the gap in one step.
                    options.error = cp.distance / dt;
                }

                normal_row.prepare(options, a.linear_velocity, a.angular_velocity, b.linear_velocity, b.angular_velocity);
                normal_row.warm_start(deltas);
                cache.rows.push(normal_row);
                cache.con_num_rows.push(1);

                let (t0, t1) = plane_space(normal);
                let rows = [(t0, cp.friction_impulse[0]), (t1, cp.friction_impulse[1])].map(|(t, impulse)| {
                    let mut row = ConstraintRow::new([t, r_a.cross(t), -t, -r_b.cross(t)], body_a, body_b);
                    row.impulse = impulse;
                    row.prepare(
                        RowOptions::default(),
                        a.linear_velocity,
                        a.angular_velocity,
                        b.linear_velocity,
                        b.angular_velocity,
                    );
                    row.warm_start(deltas);
                    row
                });

                self.friction_rows.push(FrictionRowPair {
                    rows,
                    friction_coefficient: cp.friction,
                });
                self.contacts.push((handle, index));
            }
        }
    }

    /// Solve every friction pair once, limiting the impulse to the friction
    /// circle of the current normal impulse
    pub fn iterate(&mut self, cache: &RowCache, deltas: &mut DeltaVelocities) {
        for (offset, pair) in self.friction_rows.iter_mut().enumerate() {
            let normal_impulse = cache.rows[self.start_row + offset].impulse;

            let mut delta_impulse = [0.0; 2];
            let mut impulse = [0.0; 2];
            for (i, row) in pair.rows.iter().enumerate() {
                delta_impulse[i] = (row.rhs - row.delta_relative_velocity(deltas)) * row.eff_mass;
                impulse[i] = row.impulse + delta_impulse[i];
            }

            let impulse_len_sqr = impulse[0] * impulse[0] + impulse[1] * impulse[1];
            let max_impulse_len = pair.friction_coefficient * normal_impulse;

            if impulse_len_sqr > max_impulse_len * max_impulse_len && impulse_len_sqr > EPSILON * EPSILON {
                let scale = max_impulse_len / impulse_len_sqr.sqrt();
                for i in 0..2 {
                    impulse[i] *= scale;
                    delta_impulse[i] = impulse[i] - pair.rows[i].impulse;
                }
            }

            for (i, row) in pair.rows.iter_mut().enumerate() {
                row.impulse = impulse[i];
                row.apply_impulse(deltas, delta_impulse[i]);
            }
        }
    }

    /// Write accumulated impulses back into the manifold points for the
    /// next step's warm start
    pub fn store_impulses(&self, cache: &RowCache, manifolds: &mut ManifoldStore) {
        for (offset, &(handle, index)) in self.contacts.iter().enumerate() {
            let Some(point) = manifolds
                .get_mut(handle)
                .and_then(|m| m.points_mut().get_mut(index))
            else {
                continue;
            };

            point.normal_impulse = cache.rows[self.start_row + offset].impulse;
            let pair = &self.friction_rows[offset];
            point.friction_impulse = [pair.rows[0].impulse, pair.rows[1].impulse];
        }
    }
}

/// One position-correction pass over every contact point
///
/// Distances are recomputed from the current transforms with normals
/// regenerated from their attachment. Each penetrating contact nudges both
/// bodies apart by a fraction of its depth. Returns the smallest distance
/// seen, never above zero.
pub fn solve_position(manifolds: &mut ManifoldStore, bodies: &mut Arena<RigidBody>, config: &ContactConfig) -> f32 {
    let mut min_dist = 0.0f32;

    for (_, manifold) in manifolds.iter_mut() {
        let [handle_a, handle_b] = manifold.body;
        let Some((a, b)) = bodies.get2_mut(handle_a, handle_b) else {
            continue;
        };

        for cp in manifold.points_mut() {
            let pivot_a = to_world_space(cp.pivot_a, a.origin(), a.orientation);
            let pivot_b = to_world_space(cp.pivot_b, b.origin(), b.orientation);

            cp.normal = cp.attached_normal(a.orientation, b.orientation);
            let normal = cp.normal;
            cp.distance = normal.dot(pivot_a - pivot_b);
            min_dist = min_dist.min(cp.distance);

            let r_a = pivot_a - a.position;
            let r_b = pivot_b - b.position;
            let row = ConstraintRow::new(
                [normal, r_a.cross(normal), -normal, -r_b.cross(normal)],
                row_body(handle_a, a),
                row_body(handle_b, b),
            );
            let inv_k = row.inverse_effective_mass();
            if inv_k <= 0.0 {
                continue;
            }

            let correction = -cp.distance.min(0.0) * config.position_correction_rate / inv_k;
            if correction <= 0.0 {
                continue;
            }

            let j = row.jacobian;
            nudge(a, j[0], j[1], correction);
            nudge(b, j[2], j[3], correction);
        }
    }

    min_dist
}

fn nudge(body: &mut RigidBody, linear: Vec3, angular: Vec3, correction: f32) {
    if body.inv_mass == 0.0 {
        return;
    }

    body.position += linear * (body.inv_mass * correction);
    let rotation = body.inv_inertia_world * angular * correction;
    body.orientation = integrate_orientation(body.orientation, rotation);
    body.update_inertia();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyDesc;
    use crate::events::EventCollector;
    use crate::material::Material;
    use crate::narrow::{CollisionPoint, CollisionResult, NormalAttachment};
    use crate::shapes::Shape;
    use approx::assert_abs_diff_eq;

    fn sphere_on_ground(y: f32, material: Material) -> (Arena<RigidBody>, ManifoldStore, BodyHandle) {
        let mut bodies = Arena::new();
        let ball = bodies.insert(
            RigidBody::new(
                RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0)
                    .with_position(0.0, y, 0.0)
                    .with_material(material),
            )
            .unwrap(),
        );
        let ground = bodies.insert(RigidBody::new(RigidBodyDesc::fixed(Shape::plane(Vec3::Y, 0.0))).unwrap());

        let mut store = ManifoldStore::new();
        let mut events = EventCollector::new();
        let manifold = store.create(ball, ground, &mut events).unwrap();

        let mut result = CollisionResult::new();
        result.add(CollisionPoint {
            pivot_a: Vec3::new(0.0, -0.5, 0.0),
            pivot_b: Vec3::new(0.0, 0.0, 0.0),
            normal: Vec3::Y,
            distance: y - 0.5,
            attachment: NormalAttachment::NormalOnB,
        });
        store
            .process_result(manifold, &result, &bodies, &ContactConfig::default(), &mut events)
            .unwrap();

        (bodies, store, ball)
    }

    #[test]
    fn test_normal_row_case_selection() {
        let dt = 0.1;

        // Separated and rigid: the gap becomes the error term.
        let (bodies, store, _) = sphere_on_ground(0.52, Material::default());
        let mut cache = RowCache::new();
        let mut deltas = DeltaVelocities::default();
        deltas.reset(bodies.slot_count());
        let mut contacts = ContactConstraints::new();
        contacts.prepare(&mut cache, &mut deltas, &store, &bodies, dt);
        assert_eq!(cache.rows.len(), 1);
        assert_abs_diff_eq!(cache.rows[0].rhs, -0.2, epsilon = 1e-5);
        assert_eq!(cache.rows[0].upper_limit, LARGE_SCALAR);

        // Penetrating and soft: bounded by the spring force.
        let soft = Material::default().with_spring(100.0, 10.0);
        let (bodies, store, _) = sphere_on_ground(0.45, soft);
        cache.clear();
        contacts.prepare(&mut cache, &mut deltas, &store, &bodies, dt);
        assert_abs_diff_eq!(cache.rows[0].upper_limit, 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(cache.rows[0].rhs, 0.0);
    }

    #[test]
    fn test_friction_limited_by_circle() {
        let (mut bodies, store, ball) = sphere_on_ground(0.5, Material::default().with_friction(0.5));
        let body = bodies.get_mut(ball).unwrap();
        body.linear_velocity = Vec3::new(3.0, -1.0, 4.0);

        let mut cache = RowCache::new();
        let mut deltas = DeltaVelocities::default();
        deltas.reset(bodies.slot_count());
        let mut contacts = ContactConstraints::new();
        contacts.prepare(&mut cache, &mut deltas, &store, &bodies, 1.0 / 60.0);

        for _ in 0..10 {
            cache.solve(&mut deltas);
            contacts.iterate(&cache, &mut deltas);
        }

        let normal_impulse = cache.rows[0].impulse;
        let pair = &contacts.friction_rows()[0];
        let friction = Vec3::new(pair.rows[0].impulse, pair.rows[1].impulse, 0.0).length();
        assert!(normal_impulse > 0.0);
        assert!(friction <= pair.friction_coefficient * normal_impulse + 1e-5);
    }

    #[test]
    fn test_store_impulses_round_trip() {
        let (bodies, mut store, ball) = sphere_on_ground(0.5, Material::default());
        let mut bodies = bodies;
        bodies.get_mut(ball).unwrap().linear_velocity = Vec3::new(0.0, -1.0, 0.0);

        let mut cache = RowCache::new();
        let mut deltas = DeltaVelocities::default();
        deltas.reset(bodies.slot_count());
        let mut contacts = ContactConstraints::new();
        contacts.prepare(&mut cache, &mut deltas, &store, &bodies, 1.0 / 60.0);
        cache.solve(&mut deltas);
        contacts.store_impulses(&cache, &mut store);

        let (_, manifold) = store.iter().next().unwrap();
        assert_abs_diff_eq!(manifold.points()[0].normal_impulse, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_position_pass_lifts_body() {
        let (mut bodies, mut store, ball) = sphere_on_ground(0.45, Material::default());
        let config = ContactConfig::default();

        let min = solve_position(&mut store, &mut bodies, &config);
        assert_abs_diff_eq!(min, -0.05, epsilon = 1e-5);
        assert_abs_diff_eq!(bodies.get(ball).unwrap().position.y, 0.46, epsilon = 1e-5);

        let min = solve_position(&mut store, &mut bodies, &config);
        assert_abs_diff_eq!(min, -0.04, epsilon = 1e-5);
    }
}
