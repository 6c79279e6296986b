//! Convex shapes against triangle meshes
//!
//! Runs in the mesh's object space: A is brought into that frame, the
//! mesh's triangle tree is queried with A's bounds grown by the breaking
//! threshold and every candidate triangle goes through the separating axis
//! search. Contacts on concave edges are dropped.

use glam::{Quat, Vec3};

use super::convex::{Convex, Feature};
use super::sat::{self, FrameContact};
use super::{push_frame_contacts, CollisionContext, CollisionResult, Placement};
use crate::math::to_object_space;
use crate::shapes::{Shape, TriangleMesh};

pub(crate) fn collide_mesh(shape_a: &Shape, mesh: &TriangleMesh, ctx: &CollisionContext, result: &mut CollisionResult) {
    // A's placement in the mesh frame.
    let pos_a = to_object_space(ctx.pos_a, ctx.pos_b, ctx.orn_b);
    let orn_a = ctx.orn_b.conjugate() * ctx.orn_a;

    let Some(a) = Convex::new(shape_a, pos_a, orn_a) else {
        return;
    };

    let query = shape_a.aabb(pos_a, orn_a).outset(ctx.threshold);
    let mut contacts: Vec<FrameContact> = Vec::new();

    mesh.visit_triangles(&query, |tri| {
        let normal = mesh.normal(tri);
        if normal == Vec3::ZERO {
            return;
        }

        let triangle = Convex::Triangle {
            vertices: mesh.triangle(tri),
            normal,
        };

        let accept = |feature: &Feature| match feature {
            Feature::Face(_) => true,
            Feature::Edge { index, .. } => !mesh.is_concave_edge(tri, *index),
            Feature::Vertex { index, .. } => {
                // Both edges sharing the vertex.
                !(mesh.is_concave_edge(tri, *index) && mesh.is_concave_edge(tri, (*index + 2) % 3))
            }
        };

        sat::collide_convex(&a, &triangle, ctx.threshold, ctx.tolerance, accept, &mut contacts);
    });

    push_frame_contacts(
        &contacts,
        Placement { pos: pos_a, orn: orn_a },
        Placement {
            pos: Vec3::ZERO,
            orn: Quat::IDENTITY,
        },
        ctx.orn_b,
        ctx.merge_distance,
        true,
        result,
    );
}
