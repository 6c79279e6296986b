//! Sphere against sphere

use glam::Vec3;

use super::{CollisionContext, CollisionPoint, CollisionResult, NormalAttachment};
use crate::math::{to_object_space, try_normalize};

pub(crate) fn collide_spheres(radius_a: f32, radius_b: f32, ctx: &CollisionContext, result: &mut CollisionResult) {
    let delta = ctx.pos_a - ctx.pos_b;
    let center_dist = delta.length();
    let distance = center_dist - radius_a - radius_b;

    if distance > ctx.threshold {
        return;
    }

    // Concentric spheres push apart along an arbitrary axis.
    let normal = try_normalize(delta).unwrap_or(Vec3::Y);
    let pivot_a = ctx.pos_a - normal * radius_a;
    let pivot_b = ctx.pos_b + normal * radius_b;

    result.add(CollisionPoint {
        pivot_a: to_object_space(pivot_a, ctx.pos_a, ctx.orn_a),
        pivot_b: to_object_space(pivot_b, ctx.pos_b, ctx.orn_b),
        normal,
        distance,
        attachment: NormalAttachment::None,
    });
}
