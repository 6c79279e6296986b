//! Convex shapes against a plane

use glam::Vec3;

use super::convex::{Convex, Feature};
use super::{CollisionContext, CollisionPoint, CollisionResult, NormalAttachment};
use crate::math::to_object_space;

/// Collide convex `a` with the plane of body B
///
/// Every point of A's support feature along the plane normal within the
/// breaking threshold becomes a candidate. A cylinder cap contributes four
/// body-fixed rim points. The normal is attached to the plane.
pub(crate) fn collide_plane(
    a: &Convex,
    normal: Vec3,
    constant: f32,
    ctx: &CollisionContext,
    result: &mut CollisionResult,
) {
    let n = ctx.orn_b * normal;
    let origin = ctx.pos_b + n * constant;
    let radius = a.radius();

    let feature = a.support_feature(-n, ctx.tolerance);
    let cap = if feature.is_face() { a.cap_points(-n) } else { None };
    let points: &[Vec3] = match (&feature, &cap) {
        (_, Some(cap)) => cap,
        (Feature::Vertex { point, .. }, None) => std::slice::from_ref(point),
        (Feature::Edge { points, .. }, None) => points,
        (Feature::Face(poly), None) => poly.as_slice(),
    };

    for &p in points {
        let pivot_a = p - n * radius;
        let distance = (pivot_a - origin).dot(n);

        if distance > ctx.threshold {
            continue;
        }

        let pivot_b = pivot_a - n * distance;
        result.add(CollisionPoint {
            pivot_a: to_object_space(pivot_a, ctx.pos_a, ctx.orn_a),
            pivot_b: to_object_space(pivot_b, ctx.pos_b, ctx.orn_b),
            normal: n,
            distance,
            attachment: NormalAttachment::NormalOnB,
        });
    }
}
