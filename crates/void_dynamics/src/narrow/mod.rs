//! Narrow phase
//!
//! Turns a pair of shapes and their transforms into at most
//! [`MAX_CONTACTS`] contact candidates. Normals always point from body B
//! towards body A; a positive distance means the shapes are apart.
//!
//! Dispatch matches on the pair of shape kinds. Pairs only implemented in
//! one order are run with the bodies swapped and the result mirrored.

mod convex;
mod mesh;
mod plane;
mod sat;
mod sphere;

use glam::{Quat, Vec3};

use crate::aabb::Aabb;
use crate::body::RigidBody;
use crate::config::{ContactConfig, MAX_CONTACTS};
use crate::math::to_object_space;
use crate::shapes::Shape;

use convex::Convex;

/// Body whose orientation carries a contact normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalAttachment {
    /// Normal rotates with body A
    NormalOnA,
    /// Normal rotates with body B
    NormalOnB,
    /// Normal is recomputed from geometry each step
    #[default]
    None,
}

impl NormalAttachment {
    /// Same attachment seen with the bodies swapped
    pub fn swapped(self) -> Self {
        match self {
            Self::NormalOnA => Self::NormalOnB,
            Self::NormalOnB => Self::NormalOnA,
            Self::None => Self::None,
        }
    }
}

/// Per-call inputs of a collision routine
#[derive(Debug, Clone, Copy)]
pub struct CollisionContext {
    /// Shape origin of body A
    pub pos_a: Vec3,
    pub orn_a: Quat,
    pub aabb_a: Aabb,
    /// Shape origin of body B
    pub pos_b: Vec3,
    pub orn_b: Quat,
    pub aabb_b: Aabb,
    /// Contact breaking distance
    pub threshold: f32,
    /// Candidates closer than this are considered the same point
    pub merge_distance: f32,
    /// Support feature classification tolerance
    pub tolerance: f32,
}

impl CollisionContext {
    /// Context for two bodies at their current transforms
    pub fn new(a: &RigidBody, b: &RigidBody, config: &ContactConfig) -> Self {
        Self {
            pos_a: a.origin(),
            orn_a: a.orientation,
            aabb_a: a.aabb,
            pos_b: b.origin(),
            orn_b: b.orientation,
            aabb_b: b.aabb,
            threshold: config.breaking_threshold,
            merge_distance: config.caching_threshold,
            tolerance: config.support_feature_tolerance,
        }
    }

    /// The same context with A and B exchanged
    pub fn swapped(&self) -> Self {
        Self {
            pos_a: self.pos_b,
            orn_a: self.orn_b,
            aabb_a: self.aabb_b,
            pos_b: self.pos_a,
            orn_b: self.orn_a,
            aabb_b: self.aabb_a,
            ..*self
        }
    }
}

/// A contact candidate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionPoint {
    /// Pivot in A's object space
    pub pivot_a: Vec3,
    /// Pivot in B's object space
    pub pivot_b: Vec3,
    /// World-space normal, from B towards A
    pub normal: Vec3,
    /// Signed separation along the normal
    pub distance: f32,
    pub attachment: NormalAttachment,
}

/// Up to [`MAX_CONTACTS`] candidates produced by one collision call
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionResult {
    points: [CollisionPoint; MAX_CONTACTS],
    len: usize,
}

impl CollisionResult {
    /// Empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no contact was found
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The candidates
    pub fn points(&self) -> &[CollisionPoint] {
        &self.points[..self.len]
    }

    /// Drop all candidates
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Add a candidate, replacing an existing one when full
    ///
    /// A full result keeps the deepest point and replaces the one whose
    /// removal leaves the largest contact area.
    pub fn add(&mut self, point: CollisionPoint) {
        if self.len < MAX_CONTACTS {
            self.points[self.len] = point;
            self.len += 1;
            return;
        }

        let pivots = self.points.map(|p| p.pivot_a);
        let distances = self.points.map(|p| p.distance);
        if let Some(idx) = replacement_index(&pivots, &distances, point.pivot_a, point.distance) {
            self.points[idx] = point;
        }
    }

    /// Add a candidate unless one already sits within `merge_distance`
    ///
    /// A coincident candidate is overwritten when the new one is deeper.
    pub fn maybe_add(&mut self, point: CollisionPoint, merge_distance: f32) {
        let merge_sqr = merge_distance * merge_distance;

        for existing in &mut self.points[..self.len] {
            if existing.pivot_a.distance_squared(point.pivot_a) < merge_sqr
                || existing.pivot_b.distance_squared(point.pivot_b) < merge_sqr
            {
                if point.distance < existing.distance {
                    *existing = point;
                }
                return;
            }
        }

        self.add(point);
    }

    /// Mirror every candidate as if A and B were exchanged
    pub fn swap(&mut self) {
        for p in &mut self.points[..self.len] {
            std::mem::swap(&mut p.pivot_a, &mut p.pivot_b);
            p.normal = -p.normal;
            p.attachment = p.attachment.swapped();
        }
    }
}

/// Slot to overwrite when adding to a full set of four points
///
/// The deepest point is never replaced. Among the others, the slot whose
/// replacement by the new point spans the largest quadrilateral wins. Returns
/// `None` when the new point is both the deepest and every slot is locked,
/// which cannot happen with four slots.
pub(crate) fn replacement_index(
    pivots: &[Vec3; MAX_CONTACTS],
    distances: &[f32; MAX_CONTACTS],
    new_pivot: Vec3,
    new_distance: f32,
) -> Option<usize> {
    let mut deepest = None;
    let mut min_distance = new_distance;
    for (i, &d) in distances.iter().enumerate() {
        if d < min_distance {
            min_distance = d;
            deepest = Some(i);
        }
    }

    let [p0, p1, p2, p3] = *pivots;
    let areas = [
        (new_pivot - p1).cross(p3 - p2).length_squared(),
        (new_pivot - p0).cross(p3 - p2).length_squared(),
        (new_pivot - p0).cross(p3 - p1).length_squared(),
        (new_pivot - p0).cross(p2 - p1).length_squared(),
    ];

    areas
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != deepest)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

/// Run the narrow phase for two shapes
pub fn collide(shape_a: &Shape, shape_b: &Shape, ctx: &CollisionContext) -> CollisionResult {
    let mut result = CollisionResult::new();

    match (shape_a, shape_b) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere::collide_spheres(*ra, *rb, ctx, &mut result);
        }

        // Static against static.
        (Shape::Plane { .. } | Shape::Mesh(_), Shape::Plane { .. } | Shape::Mesh(_)) => {}

        (_, Shape::Plane { normal, constant }) => {
            if let Some(a) = Convex::new(shape_a, ctx.pos_a, ctx.orn_a) {
                plane::collide_plane(&a, *normal, *constant, ctx, &mut result);
            }
        }

        (_, Shape::Mesh(mesh)) => mesh::collide_mesh(shape_a, mesh, ctx, &mut result),

        (Shape::Plane { .. } | Shape::Mesh(_), _) => {
            result = collide(shape_b, shape_a, &ctx.swapped());
            result.swap();
        }

        _ => {
            if let (Some(a), Some(b)) = (
                Convex::new(shape_a, ctx.pos_a, ctx.orn_a),
                Convex::new(shape_b, ctx.pos_b, ctx.orn_b),
            ) {
                let mut contacts = Vec::new();
                sat::collide_convex(&a, &b, ctx.threshold, ctx.tolerance, |_| true, &mut contacts);
                push_frame_contacts(
                    &contacts,
                    Placement { pos: ctx.pos_a, orn: ctx.orn_a },
                    Placement { pos: ctx.pos_b, orn: ctx.orn_b },
                    Quat::IDENTITY,
                    ctx.merge_distance,
                    false,
                    &mut result,
                );
            }
        }
    }

    result
}

/// Detect contacts between two bodies
///
/// The shapes are only tested when A's AABB, grown by the breaking
/// threshold, overlaps B's.
pub fn detect_collision(a: &RigidBody, b: &RigidBody, config: &ContactConfig) -> CollisionResult {
    if !in_detection_range(a, b, config) {
        return CollisionResult::new();
    }

    let ctx = CollisionContext::new(a, b, config);
    collide(&a.shape, &b.shape, &ctx)
}

/// Whether A's AABB, grown by the breaking threshold, overlaps B's
pub fn in_detection_range(a: &RigidBody, b: &RigidBody, config: &ContactConfig) -> bool {
    a.aabb.outset(config.breaking_threshold).intersects(&b.aabb)
}

/// Placement of a body in the frame contacts were computed in
#[derive(Debug, Clone, Copy)]
struct Placement {
    pos: Vec3,
    orn: Quat,
}

/// Convert contacts computed in some frame into object-space candidates
///
/// `frame_orn` rotates the frame into world space. With `always_merge`
/// even exactly determined points are deduplicated, as neighbouring
/// triangles of a mesh report the same point.
fn push_frame_contacts(
    contacts: &[sat::FrameContact],
    a: Placement,
    b: Placement,
    frame_orn: Quat,
    merge_distance: f32,
    always_merge: bool,
    result: &mut CollisionResult,
) {
    for c in contacts {
        let point = CollisionPoint {
            pivot_a: to_object_space(c.pivot_a, a.pos, a.orn),
            pivot_b: to_object_space(c.pivot_b, b.pos, b.orn),
            normal: frame_orn * c.normal,
            distance: c.distance,
            attachment: c.attachment,
        };

        if c.exact && !always_merge {
            result.add(point);
        } else {
            result.maybe_add(point, merge_distance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ctx(pos_a: Vec3, pos_b: Vec3) -> CollisionContext {
        CollisionContext {
            pos_a,
            orn_a: Quat::IDENTITY,
            aabb_a: Aabb::EMPTY,
            pos_b,
            orn_b: Quat::IDENTITY,
            aabb_b: Aabb::EMPTY,
            threshold: 0.02,
            merge_distance: 0.04,
            tolerance: 0.01,
        }
    }

    fn point(x: f32, z: f32, distance: f32) -> CollisionPoint {
        CollisionPoint {
            pivot_a: Vec3::new(x, 0.0, z),
            pivot_b: Vec3::new(x, 0.0, z),
            normal: Vec3::Y,
            distance,
            attachment: NormalAttachment::None,
        }
    }

    #[test]
    fn test_full_result_keeps_deepest() {
        let mut result = CollisionResult::new();
        result.add(point(0.0, 0.0, -0.5));
        result.add(point(0.1, 0.0, -0.1));
        result.add(point(0.0, 0.1, -0.1));
        result.add(point(0.1, 0.1, -0.1));
        result.add(point(5.0, 5.0, -0.1));

        assert_eq!(result.len(), MAX_CONTACTS);
        assert!(result.points().iter().any(|p| p.distance == -0.5));
        assert!(result.points().iter().any(|p| p.pivot_a.x == 5.0));
    }

    #[test]
    fn test_maybe_add_merges_coincident_points() {
        let mut result = CollisionResult::new();
        result.maybe_add(point(0.0, 0.0, -0.1), 0.04);
        result.maybe_add(point(0.01, 0.0, -0.2), 0.04);
        assert_eq!(result.len(), 1);
        assert_eq!(result.points()[0].distance, -0.2);
        result.maybe_add(point(1.0, 0.0, -0.2), 0.04);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_swap_mirrors_points() {
        let mut result = CollisionResult::new();
        result.add(CollisionPoint {
            pivot_a: Vec3::X,
            pivot_b: Vec3::Y,
            normal: Vec3::Z,
            distance: -0.1,
            attachment: NormalAttachment::NormalOnB,
        });
        result.swap();
        let p = result.points()[0];
        assert_eq!(p.pivot_a, Vec3::Y);
        assert_eq!(p.pivot_b, Vec3::X);
        assert_eq!(p.normal, -Vec3::Z);
        assert_eq!(p.attachment, NormalAttachment::NormalOnA);
    }

    #[test]
    fn test_plane_first_is_mirrored() {
        let sphere = Shape::Sphere { radius: 0.5 };
        let ground = Shape::plane(Vec3::Y, 0.0);

        let result = collide(&ground, &sphere, &ctx(Vec3::ZERO, Vec3::new(0.0, 0.4, 0.0)));
        assert_eq!(result.len(), 1);
        let p = result.points()[0];
        assert_abs_diff_eq!(p.normal.y, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.distance, -0.1, epsilon = 1e-5);
        assert_eq!(p.attachment, NormalAttachment::NormalOnA);
        // Pivot on the sphere is at its bottom.
        assert_abs_diff_eq!(p.pivot_b.y, -0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_static_pairs_produce_nothing() {
        let ground = Shape::plane(Vec3::Y, 0.0);
        let result = collide(&ground, &ground, &ctx(Vec3::ZERO, Vec3::ZERO));
        assert!(result.is_empty());
    }

    #[test]
    fn test_detection_gated_by_aabb() {
        let config = ContactConfig::default();
        let a = RigidBody::new(
            crate::body::RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0).with_position(0.0, 0.0, 0.0),
        )
        .unwrap();
        let b = RigidBody::new(
            crate::body::RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0).with_position(3.0, 0.0, 0.0),
        )
        .unwrap();
        assert!(detect_collision(&a, &b, &config).is_empty());
    }
}
