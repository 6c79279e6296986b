//! Collision shapes
//!
//! The set of shapes is closed: narrow-phase dispatch matches on
//! [`ShapeKind`] pairs and every routine is known at compile time. Capsules
//! and cylinders are aligned with their local X axis.

mod mesh;

pub use mesh::TriangleMesh;

use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::aabb::Aabb;

/// Half-extent used for the unbounded directions of a plane's AABB.
pub const PLANE_EXTENT: f32 = 1.0e6;

/// Collision shape
#[derive(Debug, Clone)]
pub enum Shape {
    /// Sphere centered at the origin
    Sphere { radius: f32 },
    /// Half-space below `dot(normal, p) = constant`
    Plane { normal: Vec3, constant: f32 },
    /// Box
    Cuboid { half_extents: Vec3 },
    /// Segment along X swept by a sphere
    Capsule { radius: f32, half_length: f32 },
    /// Cylinder along X
    Cylinder { radius: f32, half_length: f32 },
    /// Static triangle mesh
    Mesh(Arc<TriangleMesh>),
}

/// Discriminant of [`Shape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    Plane,
    Cuboid,
    Capsule,
    Cylinder,
    Mesh,
}

impl Shape {
    /// Plane with a normalized normal
    pub fn plane(normal: Vec3, constant: f32) -> Self {
        Self::Plane {
            normal: normal.try_normalize().unwrap_or(Vec3::Y),
            constant,
        }
    }

    /// Box from half extents
    pub fn cuboid(x: f32, y: f32, z: f32) -> Self {
        Self::Cuboid {
            half_extents: Vec3::new(x, y, z),
        }
    }

    /// Shape kind
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Plane { .. } => ShapeKind::Plane,
            Self::Cuboid { .. } => ShapeKind::Cuboid,
            Self::Capsule { .. } => ShapeKind::Capsule,
            Self::Cylinder { .. } => ShapeKind::Cylinder,
            Self::Mesh(_) => ShapeKind::Mesh,
        }
    }

    /// Whether the shape is a bounded convex volume
    pub fn is_convex(&self) -> bool {
        !matches!(self, Self::Plane { .. } | Self::Mesh(_))
    }

    /// World-space bounds of the shape placed at `pos` with `orn`
    pub fn aabb(&self, pos: Vec3, orn: Quat) -> Aabb {
        match self {
            Self::Sphere { radius } => Aabb::from_center_half_extents(pos, Vec3::splat(*radius)),
            Self::Cuboid { half_extents } => {
                Aabb::from_center_half_extents(Vec3::ZERO, *half_extents).transformed(pos, orn)
            }
            Self::Capsule { radius, half_length } => {
                let axis = orn * Vec3::X * *half_length;
                Aabb::from_points(&[pos - axis, pos + axis]).outset(*radius)
            }
            Self::Cylinder { radius, half_length } => {
                let axis = orn * Vec3::X;
                let disc = (Vec3::ONE - axis * axis).max(Vec3::ZERO);
                let extent = axis.abs() * *half_length + Vec3::new(disc.x.sqrt(), disc.y.sqrt(), disc.z.sqrt()) * *radius;
                Aabb::from_center_half_extents(pos, extent)
            }
            Self::Plane { normal, constant } => plane_aabb(pos, orn, *normal, *constant),
            Self::Mesh(mesh) => mesh.aabb().transformed(pos, orn),
        }
    }

    /// Diagonal of the local inertia tensor for the given mass
    ///
    /// Planes report infinite inertia.
    pub fn inertia(&self, mass: f32) -> Vec3 {
        match self {
            Self::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            Self::Cuboid { half_extents } => cuboid_inertia(mass, *half_extents),
            Self::Cylinder { radius, half_length } => {
                let r2 = radius * radius;
                let l = 2.0 * half_length;
                let perp = mass * (3.0 * r2 + l * l) / 12.0;
                Vec3::new(0.5 * mass * r2, perp, perp)
            }
            Self::Capsule { radius, half_length } => {
                let r = *radius;
                let l = 2.0 * half_length;
                let cyl_volume = PI * r * r * l;
                let sphere_volume = 4.0 / 3.0 * PI * r * r * r;
                let mc = mass * cyl_volume / (cyl_volume + sphere_volume);
                let ms = mass - mc;
                let axial = mc * r * r * 0.5 + ms * 0.4 * r * r;
                let perp = mc * (l * l / 12.0 + r * r * 0.25)
                    + ms * (0.4 * r * r + l * l * 0.25 + 3.0 * l * r / 8.0);
                Vec3::new(axial, perp, perp)
            }
            Self::Plane { .. } => Vec3::splat(f32::INFINITY),
            Self::Mesh(mesh) => cuboid_inertia(mass, mesh.aabb().half_extents()),
        }
    }
}

fn cuboid_inertia(mass: f32, he: Vec3) -> Vec3 {
    let s = he * he;
    Vec3::new(s.y + s.z, s.x + s.z, s.x + s.y) * (mass / 3.0)
}

fn plane_aabb(pos: Vec3, orn: Quat, normal: Vec3, constant: f32) -> Aabb {
    let n = orn * normal;
    let point = pos + n * constant;
    let mut aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(PLANE_EXTENT));

    // Axis-aligned planes bound one side exactly.
    for i in 0..3 {
        if n[i] >= 1.0 - 1e-6 {
            aabb.max[i] = point[i];
        } else if n[i] <= -1.0 + 1e-6 {
            aabb.min[i] = point[i];
        }
    }

    aabb
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_kind_dispatch() {
        assert_eq!(Shape::Sphere { radius: 1.0 }.kind(), ShapeKind::Sphere);
        assert_eq!(Shape::plane(Vec3::Y, 0.0).kind(), ShapeKind::Plane);
        assert!(!Shape::plane(Vec3::Y, 0.0).is_convex());
        assert!(Shape::cuboid(1.0, 1.0, 1.0).is_convex());
    }

    #[test]
    fn test_rotated_capsule_aabb() {
        let shape = Shape::Capsule {
            radius: 0.5,
            half_length: 1.0,
        };
        let aabb = shape.aabb(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        assert_abs_diff_eq!(aabb.max.y, 1.5, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.max.x, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_cylinder_aabb() {
        let shape = Shape::Cylinder {
            radius: 0.5,
            half_length: 2.0,
        };
        let aabb = shape.aabb(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        assert_abs_diff_eq!(aabb.min.x, -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.max.y, 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.max.z, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_ground_plane_aabb() {
        let aabb = Shape::plane(Vec3::Y, 0.0).aabb(Vec3::new(0.0, -1.0, 0.0), Quat::IDENTITY);
        assert_abs_diff_eq!(aabb.max.y, -1.0, epsilon = 1e-6);
        assert!(aabb.max.x >= PLANE_EXTENT);
        assert!(aabb.min.y <= -PLANE_EXTENT);
    }

    #[test]
    fn test_cuboid_inertia() {
        let inertia = Shape::cuboid(0.5, 0.5, 0.5).inertia(6.0);
        // m (w^2 + h^2) / 12 with unit sides.
        assert_abs_diff_eq!(inertia.x, 1.0, epsilon = 1e-6);
    }
}
