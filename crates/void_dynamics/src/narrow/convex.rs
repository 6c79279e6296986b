//! World-space convex shapes for the separating axis search
//!
//! Every convex is a core (point, segment or polytope) optionally swept by a
//! radius. Support queries and features describe the core; callers offset
//! the resulting points by the radius along the contact normal.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use crate::math::{closest_point_segment, closest_point_triangle};
use crate::shapes::Shape;

/// Segments used to approximate a cylinder cap.
pub(crate) const CYLINDER_SEGMENTS: usize = 16;

/// Largest face polygon
pub(crate) const MAX_POLYGON: usize = CYLINDER_SEGMENTS;

/// Convex polygon with a fixed capacity, vertices in winding order
#[derive(Debug, Clone, Copy)]
pub(crate) struct Polygon {
    vertices: [Vec3; MAX_POLYGON],
    len: usize,
}

impl Polygon {
    pub(crate) fn from_slice(points: &[Vec3]) -> Self {
        debug_assert!(points.len() <= MAX_POLYGON);
        let mut vertices = [Vec3::ZERO; MAX_POLYGON];
        let len = points.len().min(MAX_POLYGON);
        vertices[..len].copy_from_slice(&points[..len]);
        Self { vertices, len }
    }

    pub(crate) fn as_slice(&self) -> &[Vec3] {
        &self.vertices[..self.len]
    }
}

/// Support feature of a core along some direction
///
/// `index` identifies the vertex or edge (vertex `index` to `index + 1`) of a
/// triangle and is zero for other shapes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Feature {
    Vertex { point: Vec3, index: usize },
    Edge { points: [Vec3; 2], index: usize },
    Face(Polygon),
}

impl Feature {
    pub(crate) fn is_face(&self) -> bool {
        matches!(self, Feature::Face(_))
    }

    /// Any point of the feature
    pub(crate) fn anchor(&self) -> Vec3 {
        match self {
            Feature::Vertex { point, .. } => *point,
            Feature::Edge { points, .. } => points[0],
            Feature::Face(poly) => poly.as_slice().first().copied().unwrap_or(Vec3::ZERO),
        }
    }
}

/// A convex shape placed in some frame
#[derive(Debug, Clone, Copy)]
pub(crate) enum Convex {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Cuboid {
        center: Vec3,
        axes: [Vec3; 3],
        half_extents: Vec3,
    },
    Capsule {
        ends: [Vec3; 2],
        radius: f32,
    },
    Cylinder {
        center: Vec3,
        axis: Vec3,
        /// Body-fixed directions spanning the caps
        radial: [Vec3; 2],
        half_length: f32,
        radius: f32,
    },
    /// One-sided triangle, `normal` is its outer face
    Triangle {
        vertices: [Vec3; 3],
        normal: Vec3,
    },
}

impl Convex {
    /// Place a convex shape; planes and meshes have no convex form
    pub(crate) fn new(shape: &Shape, pos: Vec3, orn: Quat) -> Option<Self> {
        let convex = match shape {
            Shape::Sphere { radius } => Self::Sphere {
                center: pos,
                radius: *radius,
            },
            Shape::Cuboid { half_extents } => Self::Cuboid {
                center: pos,
                axes: [orn * Vec3::X, orn * Vec3::Y, orn * Vec3::Z],
                half_extents: *half_extents,
            },
            Shape::Capsule { radius, half_length } => {
                let axis = orn * Vec3::X * *half_length;
                Self::Capsule {
                    ends: [pos - axis, pos + axis],
                    radius: *radius,
                }
            }
            Shape::Cylinder { radius, half_length } => Self::Cylinder {
                center: pos,
                axis: orn * Vec3::X,
                radial: [orn * Vec3::Y, orn * Vec3::Z],
                half_length: *half_length,
                radius: *radius,
            },
            Shape::Plane { .. } | Shape::Mesh(_) => return None,
        };
        Some(convex)
    }

    /// Radius swept around the core
    pub(crate) fn radius(&self) -> f32 {
        match self {
            Self::Sphere { radius, .. } | Self::Capsule { radius, .. } => *radius,
            _ => 0.0,
        }
    }

    /// Point used to orient candidate axes
    pub(crate) fn center(&self) -> Vec3 {
        match self {
            Self::Sphere { center, .. } | Self::Cuboid { center, .. } | Self::Cylinder { center, .. } => *center,
            Self::Capsule { ends, .. } => (ends[0] + ends[1]) * 0.5,
            Self::Triangle { vertices, .. } => (vertices[0] + vertices[1] + vertices[2]) / 3.0,
        }
    }

    /// Largest projection of the core onto unit `dir`
    pub(crate) fn core_support(&self, dir: Vec3) -> f32 {
        match self {
            Self::Sphere { center, .. } => center.dot(dir),
            Self::Capsule { ends, .. } => ends[0].dot(dir).max(ends[1].dot(dir)),
            Self::Cuboid {
                center,
                axes,
                half_extents,
            } => {
                center.dot(dir)
                    + axes[0].dot(dir).abs() * half_extents.x
                    + axes[1].dot(dir).abs() * half_extents.y
                    + axes[2].dot(dir).abs() * half_extents.z
            }
            Self::Cylinder {
                center,
                axis,
                half_length,
                radius,
                ..
            } => {
                let along = axis.dot(dir);
                let perp = (dir.length_squared() - along * along).max(0.0).sqrt();
                center.dot(dir) + along.abs() * half_length + perp * radius
            }
            Self::Triangle { vertices, .. } => vertices
                .iter()
                .map(|v| v.dot(dir))
                .fold(f32::MIN, f32::max),
        }
    }

    /// Largest projection of the full shape onto unit `dir`
    pub(crate) fn support_projection(&self, dir: Vec3) -> f32 {
        self.core_support(dir) + self.radius()
    }

    /// Support feature of the core along unit `dir`
    ///
    /// Points whose projections lie within `tolerance` of the maximum belong
    /// to the feature.
    pub(crate) fn support_feature(&self, dir: Vec3, tolerance: f32) -> Feature {
        match self {
            Self::Sphere { center, .. } => Feature::Vertex {
                point: *center,
                index: 0,
            },

            Self::Capsule { ends, .. } => {
                let p0 = ends[0].dot(dir);
                let p1 = ends[1].dot(dir);
                if (p0 - p1).abs() < tolerance {
                    Feature::Edge {
                        points: *ends,
                        index: 0,
                    }
                } else {
                    Feature::Vertex {
                        point: if p0 > p1 { ends[0] } else { ends[1] },
                        index: 0,
                    }
                }
            }

            Self::Cuboid {
                center,
                axes,
                half_extents,
            } => cuboid_feature(*center, axes, *half_extents, dir, tolerance),

            Self::Cylinder {
                center,
                axis,
                radial,
                half_length,
                radius,
            } => {
                let along = axis.dot(dir);
                let perp = dir - *axis * along;
                let perp_len = perp.length();
                let cap_sign = if along >= 0.0 { 1.0 } else { -1.0 };

                if 2.0 * radius * perp_len < tolerance {
                    let cap_center = *center + *axis * (half_length * cap_sign);
                    Feature::Face(cylinder_cap(cap_center, radial, *radius))
                } else {
                    let rim = perp / perp_len * *radius;
                    if 2.0 * along.abs() * half_length < tolerance {
                        Feature::Edge {
                            points: [
                                *center - *axis * *half_length + rim,
                                *center + *axis * *half_length + rim,
                            ],
                            index: 0,
                        }
                    } else {
                        Feature::Vertex {
                            point: *center + *axis * (half_length * cap_sign) + rim,
                            index: 0,
                        }
                    }
                }
            }

            Self::Triangle { vertices, .. } => {
                let proj = vertices.map(|v| v.dot(dir));
                let max = proj[0].max(proj[1]).max(proj[2]);
                let near = proj.map(|p| max - p < tolerance);

                match near {
                    [true, true, true] => Feature::Face(Polygon::from_slice(vertices)),
                    [true, true, false] => Feature::Edge {
                        points: [vertices[0], vertices[1]],
                        index: 0,
                    },
                    [false, true, true] => Feature::Edge {
                        points: [vertices[1], vertices[2]],
                        index: 1,
                    },
                    [true, false, true] => Feature::Edge {
                        points: [vertices[2], vertices[0]],
                        index: 2,
                    },
                    _ => {
                        let index = near.iter().position(|&n| n).unwrap_or(0);
                        Feature::Vertex {
                            point: vertices[index],
                            index,
                        }
                    }
                }
            }
        }
    }

    /// Face normals; `true` in the second slot marks a one-sided face that
    /// must not be flipped
    pub(crate) fn face_normals(&self, out: &mut Vec<(Vec3, bool)>) {
        match self {
            Self::Cuboid { axes, .. } => out.extend(axes.iter().map(|a| (*a, false))),
            Self::Cylinder { axis, .. } => out.push((*axis, false)),
            Self::Triangle { normal, .. } => out.push((*normal, true)),
            Self::Sphere { .. } | Self::Capsule { .. } => {}
        }
    }

    /// Directions of straight edges
    pub(crate) fn edge_directions(&self, out: &mut Vec<Vec3>) {
        match self {
            Self::Cuboid { axes, .. } => out.extend_from_slice(axes),
            Self::Capsule { ends, .. } => out.push(ends[1] - ends[0]),
            Self::Cylinder { axis, .. } => out.push(*axis),
            Self::Triangle { vertices, .. } => {
                out.extend((0..3).map(|i| vertices[(i + 1) % 3] - vertices[i]));
            }
            Self::Sphere { .. } => {}
        }
    }

    /// Points on the core used to build point-to-shape axes
    pub(crate) fn sample_points(&self, out: &mut Vec<Vec3>) {
        match self {
            Self::Sphere { center, .. } => out.push(*center),
            Self::Capsule { ends, .. } => out.extend_from_slice(ends),
            Self::Cuboid {
                center,
                axes,
                half_extents,
            } => {
                for i in 0..8 {
                    let sign = |bit: usize| if i & (1 << bit) == 0 { -1.0 } else { 1.0 };
                    out.push(
                        *center
                            + axes[0] * half_extents.x * sign(0)
                            + axes[1] * half_extents.y * sign(1)
                            + axes[2] * half_extents.z * sign(2),
                    );
                }
            }
            Self::Cylinder {
                center,
                axis,
                radial,
                half_length,
                radius,
            } => {
                for sign in [-1.0, 1.0] {
                    let cap = cylinder_cap(*center + *axis * (half_length * sign), radial, *radius);
                    out.extend_from_slice(cap.as_slice());
                }
            }
            Self::Triangle { vertices, .. } => out.extend_from_slice(vertices),
        }
    }

    /// Four rim points of the cylinder cap facing `dir`, at fixed directions
    /// in the body frame
    ///
    /// A cap resting on a face is represented by these points instead of
    /// its full polygon so the same points come back every step.
    pub(crate) fn cap_points(&self, dir: Vec3) -> Option<[Vec3; 4]> {
        let Self::Cylinder {
            center,
            axis,
            radial,
            half_length,
            radius,
        } = self
        else {
            return None;
        };

        let cap_sign = if axis.dot(dir) >= 0.0 { 1.0 } else { -1.0 };
        let cap_center = *center + *axis * (half_length * cap_sign);
        let [u, v] = *radial;
        Some([
            cap_center + u * *radius,
            cap_center + v * *radius,
            cap_center - u * *radius,
            cap_center - v * *radius,
        ])
    }

    /// Closest point of the core to `p`
    pub(crate) fn closest_point(&self, p: Vec3) -> Vec3 {
        match self {
            Self::Sphere { center, .. } => *center,
            Self::Capsule { ends, .. } => closest_point_segment(ends[0], ends[1], p).1,
            Self::Cuboid {
                center,
                axes,
                half_extents,
            } => {
                let d = p - *center;
                *center
                    + axes[0] * d.dot(axes[0]).clamp(-half_extents.x, half_extents.x)
                    + axes[1] * d.dot(axes[1]).clamp(-half_extents.y, half_extents.y)
                    + axes[2] * d.dot(axes[2]).clamp(-half_extents.z, half_extents.z)
            }
            Self::Cylinder {
                center,
                axis,
                half_length,
                radius,
                ..
            } => {
                let d = p - *center;
                let along = d.dot(*axis);
                let radial = d - *axis * along;
                let radial_len = radial.length();
                let radial = if radial_len > *radius {
                    radial * (*radius / radial_len)
                } else {
                    radial
                };
                *center + *axis * along.clamp(-half_length, *half_length) + radial
            }
            Self::Triangle { vertices, .. } => closest_point_triangle(p, vertices),
        }
    }
}

fn cuboid_feature(center: Vec3, axes: &[Vec3; 3], half_extents: Vec3, dir: Vec3, tolerance: f32) -> Feature {
    let he = half_extents.to_array();
    let proj = axes.map(|a| a.dot(dir));
    let sign = proj.map(|p| if p >= 0.0 { 1.0 } else { -1.0 });
    // An axis is free when the feature spans it.
    let free: [bool; 3] = std::array::from_fn(|i| proj[i].abs() * 2.0 * he[i] < tolerance);
    let num_free = free.iter().filter(|&&f| f).count();

    let corner = |skip: Option<usize>| {
        (0..3)
            .filter(|&i| Some(i) != skip)
            .fold(center, |acc, i| acc + axes[i] * (he[i] * sign[i]))
    };

    match num_free {
        0 => Feature::Vertex {
            point: corner(None),
            index: 0,
        },
        1 => {
            let j = free.iter().position(|&f| f).unwrap_or(0);
            let base = corner(Some(j));
            let half = axes[j] * he[j];
            Feature::Edge {
                points: [base - half, base + half],
                index: 0,
            }
        }
        _ => {
            // Face normal is the most aligned axis.
            let k = (0..3)
                .max_by(|&a, &b| proj[a].abs().total_cmp(&proj[b].abs()))
                .unwrap_or(0);
            let u = (k + 1) % 3;
            let v = (k + 2) % 3;
            let c = center + axes[k] * (he[k] * sign[k]);
            let du = axes[u] * he[u];
            let dv = axes[v] * he[v];
            Feature::Face(Polygon::from_slice(&[c + du + dv, c - du + dv, c - du - dv, c + du - dv]))
        }
    }
}

fn cylinder_cap(cap_center: Vec3, radial: &[Vec3; 2], radius: f32) -> Polygon {
    let [u, v] = *radial;
    let mut points = [Vec3::ZERO; CYLINDER_SEGMENTS];
    for (i, p) in points.iter_mut().enumerate() {
        let (s, c) = (TAU * i as f32 / CYLINDER_SEGMENTS as f32).sin_cos();
        *p = cap_center + (u * c + v * s) * radius;
    }
    Polygon::from_slice(&points)
}
