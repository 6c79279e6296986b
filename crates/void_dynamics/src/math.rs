//! Geometric helpers on top of glam
//!
//! Small free functions shared by the narrow phase, the manifold store and
//! the solver. Everything is `f32`, matching the rest of the engine.

use glam::{Mat3, Quat, Vec2, Vec3};

/// Lengths below this are treated as zero when normalizing.
pub const EPSILON: f32 = 1e-6;

/// Transform a point from object space into world space.
#[inline]
pub fn to_world_space(p: Vec3, pos: Vec3, orn: Quat) -> Vec3 {
    pos + orn * p
}

/// Transform a point from world space into object space.
#[inline]
pub fn to_object_space(p: Vec3, pos: Vec3, orn: Quat) -> Vec3 {
    orn.conjugate() * (p - pos)
}

/// Normalize `v`, or `None` when it is too short to have a direction.
#[inline]
pub fn try_normalize(v: Vec3) -> Option<Vec3> {
    let len_sqr = v.length_squared();
    if len_sqr > EPSILON * EPSILON {
        Some(v / len_sqr.sqrt())
    } else {
        None
    }
}

/// Two unit vectors orthogonal to `n` and to each other.
pub fn plane_space(n: Vec3) -> (Vec3, Vec3) {
    if n.z.abs() > core::f32::consts::FRAC_1_SQRT_2 {
        // Choose p in y-z plane.
        let a = n.y * n.y + n.z * n.z;
        let k = 1.0 / a.sqrt();
        let p = Vec3::new(0.0, -n.z * k, n.y * k);
        let q = Vec3::new(a * k, -n.x * p.z, n.x * p.y);
        (p, q)
    } else {
        // Choose p in x-y plane.
        let a = n.x * n.x + n.y * n.y;
        let k = 1.0 / a.sqrt();
        let p = Vec3::new(-n.y * k, n.x * k, 0.0);
        let q = Vec3::new(-n.z * p.y, n.z * p.x, a * k);
        (p, q)
    }
}

/// Project `p` onto the plane through `origin` with unit `normal`.
#[inline]
pub fn project_plane(p: Vec3, origin: Vec3, normal: Vec3) -> Vec3 {
    p - normal * (p - origin).dot(normal)
}

/// Closest point to `p` on the infinite line `origin + t * dir`.
///
/// Returns the line parameter and the point. A zero `dir` yields `origin`.
pub fn closest_point_line(origin: Vec3, dir: Vec3, p: Vec3) -> (f32, Vec3) {
    let len_sqr = dir.length_squared();
    if len_sqr <= EPSILON * EPSILON {
        return (0.0, origin);
    }
    let t = (p - origin).dot(dir) / len_sqr;
    (t, origin + dir * t)
}

/// Closest point to `p` on segment `a`-`b`, with its parameter in `[0, 1]`.
pub fn closest_point_segment(a: Vec3, b: Vec3, p: Vec3) -> (f32, Vec3) {
    let (t, _) = closest_point_line(a, b - a, p);
    let t = t.clamp(0.0, 1.0);
    (t, a.lerp(b, t))
}

/// Result of [`closest_points_segment_segment`].
#[derive(Debug, Clone, Copy)]
pub struct SegmentClosest {
    /// 1 in the general case, 2 when the segments are parallel and overlap
    pub num_points: usize,
    /// Parameters along the first segment
    pub s: [f32; 2],
    /// Parameters along the second segment
    pub t: [f32; 2],
    /// Points on the first segment
    pub on_first: [Vec3; 2],
    /// Points on the second segment
    pub on_second: [Vec3; 2],
}

/// Closest points between segments `p1`-`q1` and `p2`-`q2`.
pub fn closest_points_segment_segment(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> SegmentClosest {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    let single = |s: f32, t: f32| SegmentClosest {
        num_points: 1,
        s: [s, 0.0],
        t: [t, 0.0],
        on_first: [p1 + d1 * s, Vec3::ZERO],
        on_second: [p2 + d2 * t, Vec3::ZERO],
    };

    let eps = EPSILON * EPSILON;

    if a <= eps && e <= eps {
        return single(0.0, 0.0);
    }

    if a <= eps {
        return single(0.0, (f / e).clamp(0.0, 1.0));
    }

    let c = d1.dot(r);

    if e <= eps {
        return single((-c / a).clamp(0.0, 1.0), 0.0);
    }

    let b = d1.dot(d2);
    let denom = a * e - b * b;

    if denom <= EPSILON * a * e {
        // Parallel: report the ends of the overlapping range, if any.
        let s0 = (p2 - p1).dot(d1) / a;
        let s1 = (q2 - p1).dot(d1) / a;
        let lo = s0.min(s1).max(0.0);
        let hi = s0.max(s1).min(1.0);

        if hi - lo > EPSILON {
            let mut out = SegmentClosest {
                num_points: 2,
                s: [lo, hi],
                t: [0.0; 2],
                on_first: [Vec3::ZERO; 2],
                on_second: [Vec3::ZERO; 2],
            };
            for i in 0..2 {
                let point = p1 + d1 * out.s[i];
                let (t, on_second) = closest_point_segment(p2, q2, point);
                out.t[i] = t;
                out.on_first[i] = point;
                out.on_second[i] = on_second;
            }
            return out;
        }

        // Disjoint along the common direction: nearest endpoints.
        let s = if s0.max(s1) < 0.0 { 0.0 } else { 1.0 };
        let point = p1 + d1 * s;
        let (t, _) = closest_point_segment(p2, q2, point);
        let (s, _) = closest_point_segment(p1, q1, p2 + d2 * t);
        return single(s, t);
    }

    let mut s = ((b * f - c * e) / denom).clamp(0.0, 1.0);
    let mut t = (b * s + f) / e;

    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }

    single(s, t)
}

/// Closest point to `p` on triangle `tri`.
pub fn closest_point_triangle(p: Vec3, tri: &[Vec3; 3]) -> Vec3 {
    let [a, b, c] = *tri;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// 2D cross product (z component of the 3D cross).
#[inline]
pub fn perp_dot(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Intersection parameters of 2D segments `p0`-`p1` and `q0`-`q1`.
///
/// Parallel segments never intersect here; callers pick up their overlap
/// through endpoint containment instead.
pub fn intersect_segments_2d(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<(f32, f32)> {
    let r = p1 - p0;
    let d = q1 - q0;
    let denom = perp_dot(r, d);

    if denom.abs() <= EPSILON {
        return None;
    }

    let w = q0 - p0;
    let s = perp_dot(w, d) / denom;
    let t = perp_dot(w, r) / denom;

    if (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t) {
        Some((s, t))
    } else {
        None
    }
}

/// Whether `p` lies inside the convex polygon `poly` (either winding).
pub fn point_in_convex_polygon(poly: &[Vec2], p: Vec2) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0.0f32;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = perp_dot(b - a, p - a);

        if c.abs() <= EPSILON {
            continue;
        }

        if sign == 0.0 {
            sign = c.signum();
        } else if c.signum() != sign {
            return false;
        }
    }

    true
}

/// Apply a small rotation vector to `orn` using the linearized quaternion
/// derivative, then renormalize.
pub fn integrate_orientation(orn: Quat, rotation: Vec3) -> Quat {
    let q = Quat::from_xyzw(rotation.x, rotation.y, rotation.z, 0.0);
    (orn + q * orn * 0.5).normalize()
}

/// Rotate a body-space inverse inertia tensor into world space.
#[inline]
pub fn rotate_inertia(inv_inertia_local: Mat3, orn: Quat) -> Mat3 {
    let basis = Mat3::from_quat(orn);
    basis * inv_inertia_local * basis.transpose()
}
