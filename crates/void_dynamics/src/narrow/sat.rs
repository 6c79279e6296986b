//! Separating axis search and feature clipping between two convexes

use glam::{Vec2, Vec3};

use super::convex::{Convex, Feature, MAX_POLYGON};
use super::NormalAttachment;
use crate::math::{
    closest_point_line, closest_points_segment_segment, intersect_segments_2d, plane_space, point_in_convex_polygon,
    project_plane, try_normalize,
};

/// Axis of least penetration / greatest separation, from B towards A
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeparatingAxis {
    pub normal: Vec3,
    pub distance: f32,
}

/// Contact in the frame the convexes live in
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameContact {
    pub pivot_a: Vec3,
    pub pivot_b: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub attachment: NormalAttachment,
    /// Exactly determined point, added without deduplication
    pub exact: bool,
}

/// Find the axis of maximum separation between `a` and `b`
///
/// Candidates are face normals, edge-edge cross products and directions
/// from sample points of one core to the closest point on the other.
/// Degenerate candidates are skipped. Returns `None` when no candidate
/// could be normalized.
pub(crate) fn find_separating_axis(a: &Convex, b: &Convex) -> Option<SeparatingAxis> {
    let center_dir = a.center() - b.center();
    let mut best: Option<SeparatingAxis> = None;

    let mut test = |axis: Vec3| {
        let distance = -a.support_projection(-axis) - b.support_projection(axis);
        if best.map_or(true, |current| distance > current.distance) {
            best = Some(SeparatingAxis { normal: axis, distance });
        }
    };

    let orient = |axis: Vec3| if center_dir.dot(axis) < 0.0 { -axis } else { axis };

    let mut faces = Vec::new();
    a.face_normals(&mut faces);
    for (normal, one_sided) in faces.drain(..) {
        let Some(n) = try_normalize(normal) else { continue };
        // A one-sided face of A faces away from B.
        test(if one_sided { -n } else { orient(n) });
    }

    b.face_normals(&mut faces);
    for (normal, one_sided) in faces.drain(..) {
        let Some(n) = try_normalize(normal) else { continue };
        test(if one_sided { n } else { orient(n) });
    }

    let mut edges_a = Vec::new();
    let mut edges_b = Vec::new();
    a.edge_directions(&mut edges_a);
    b.edge_directions(&mut edges_b);
    for ea in &edges_a {
        for eb in &edges_b {
            if let Some(n) = try_normalize(ea.cross(*eb)) {
                test(orient(n));
            }
        }
    }

    let mut samples = Vec::new();
    a.sample_points(&mut samples);
    for p in samples.drain(..) {
        if let Some(n) = try_normalize(p - b.closest_point(p)) {
            test(n);
        }
    }

    b.sample_points(&mut samples);
    for p in samples.drain(..) {
        if let Some(n) = try_normalize(a.closest_point(p) - p) {
            test(n);
        }
    }

    best
}

/// Full convex-convex collision
///
/// `accept_b` may veto B's support feature, in which case no contacts are
/// produced.
pub(crate) fn collide_convex<F>(
    a: &Convex,
    b: &Convex,
    threshold: f32,
    tolerance: f32,
    accept_b: F,
    out: &mut Vec<FrameContact>,
) where
    F: Fn(&Feature) -> bool,
{
    let Some(axis) = find_separating_axis(a, b) else {
        return;
    };

    if axis.distance > threshold {
        return;
    }

    let n = axis.normal;
    let feature_a = a.support_feature(-n, tolerance);
    let feature_b = b.support_feature(n, tolerance);

    if !accept_b(&feature_b) {
        return;
    }

    let attachment = if feature_b.is_face() {
        NormalAttachment::NormalOnB
    } else if feature_a.is_face() {
        NormalAttachment::NormalOnA
    } else {
        NormalAttachment::None
    };

    let (ra, rb) = (a.radius(), b.radius());
    let start = out.len();

    let mut emit = |pa: Vec3, pb: Vec3, exact: bool| {
        let pivot_a = pa - n * ra;
        let pivot_b = pb + n * rb;
        let distance = (pivot_a - pivot_b).dot(n);
        if distance <= threshold {
            out.push(FrameContact {
                pivot_a,
                pivot_b,
                normal: n,
                distance,
                attachment,
                exact,
            });
        }
    };

    if !resting_cap(a, b, &feature_a, &feature_b, n, &mut emit) {
        clip_features(&feature_a, &feature_b, n, &mut emit);
    }

    if out.len() == start {
        // Clipping found nothing within range; fall back to the support points.
        let pa = feature_a.anchor() - n * ra;
        let pb = project_plane(feature_a.anchor(), feature_b.anchor(), n) + n * rb;
        out.push(FrameContact {
            pivot_a: pa,
            pivot_b: pb,
            normal: n,
            distance: axis.distance,
            attachment,
            exact: true,
        });
    }
}

/// A cylinder cap lying entirely on the opposing face
///
/// Emits the cap's four body-fixed rim points projected onto the face and
/// returns `true`. Partial overlaps return `false` and go through regular
/// clipping.
fn resting_cap<E>(a: &Convex, b: &Convex, fa: &Feature, fb: &Feature, n: Vec3, emit: &mut E) -> bool
where
    E: FnMut(Vec3, Vec3, bool),
{
    let (Feature::Face(pa), Feature::Face(pb)) = (fa, fb) else {
        return false;
    };
    let (pa, pb) = (pa.as_slice(), pb.as_slice());

    let (t1, t2) = plane_space(n);
    let to_2d = |p: Vec3| Vec2::new(p.dot(t1), p.dot(t2));
    let (pa_2d, na) = project_polygon(pa, &to_2d);
    let (pb_2d, nb) = project_polygon(pb, &to_2d);
    let (pa_2d, pb_2d) = (&pa_2d[..na], &pb_2d[..nb]);

    if let Some(cap) = a.cap_points(-n) {
        if pa_2d.iter().all(|&v| point_in_convex_polygon(pb_2d, v)) {
            for p in cap {
                emit(p, project_plane(p, pb[0], n), false);
            }
            return true;
        }
    }

    if let Some(cap) = b.cap_points(n) {
        if pb_2d.iter().all(|&v| point_in_convex_polygon(pa_2d, v)) {
            for p in cap {
                emit(project_plane(p, pa[0], n), p, false);
            }
            return true;
        }
    }

    false
}

/// Resolve contact point pairs between two support features
///
/// `emit` receives a point on A's core, a point on B's core and whether the
/// pair is exactly determined.
fn clip_features<E>(fa: &Feature, fb: &Feature, n: Vec3, emit: &mut E)
where
    E: FnMut(Vec3, Vec3, bool),
{
    let (t1, t2) = plane_space(n);
    let to_2d = |p: Vec3| Vec2::new(p.dot(t1), p.dot(t2));

    match (fa, fb) {
        (Feature::Face(pa), Feature::Face(pb)) => {
            let (pa, pb) = (pa.as_slice(), pb.as_slice());
            let (pa_2d, na) = project_polygon(pa, &to_2d);
            let (pb_2d, nb) = project_polygon(pb, &to_2d);
            let (pa_2d, pb_2d) = (&pa_2d[..na], &pb_2d[..nb]);

            for (v, v2) in pa.iter().zip(pa_2d) {
                if point_in_convex_polygon(pb_2d, *v2) {
                    emit(*v, project_plane(*v, pb[0], n), false);
                }
            }

            for (v, v2) in pb.iter().zip(pb_2d) {
                if point_in_convex_polygon(pa_2d, *v2) {
                    emit(project_plane(*v, pa[0], n), *v, false);
                }
            }

            for i in 0..pa.len() {
                let i1 = (i + 1) % pa.len();
                for j in 0..pb.len() {
                    let j1 = (j + 1) % pb.len();
                    if let Some((s, t)) = intersect_segments_2d(pa_2d[i], pa_2d[i1], pb_2d[j], pb_2d[j1]) {
                        emit(pa[i].lerp(pa[i1], s), pb[j].lerp(pb[j1], t), false);
                    }
                }
            }
        }

        (Feature::Face(poly), Feature::Edge { points, .. }) => {
            clip_edge_face(points, poly.as_slice(), n, &to_2d, &mut |edge_point, face_point| {
                emit(face_point, edge_point, false)
            });
        }

        (Feature::Edge { points, .. }, Feature::Face(poly)) => {
            clip_edge_face(points, poly.as_slice(), n, &to_2d, &mut |edge_point, face_point| {
                emit(edge_point, face_point, false)
            });
        }

        (Feature::Edge { points: ea, .. }, Feature::Edge { points: eb, .. }) => {
            let closest = closest_points_segment_segment(ea[0], ea[1], eb[0], eb[1]);
            for i in 0..closest.num_points {
                emit(closest.on_first[i], closest.on_second[i], true);
            }
        }

        (Feature::Vertex { point, .. }, Feature::Face(poly)) => {
            emit(*point, project_plane(*point, poly.as_slice()[0], n), true);
        }

        (Feature::Face(poly), Feature::Vertex { point, .. }) => {
            emit(project_plane(*point, poly.as_slice()[0], n), *point, true);
        }

        (Feature::Vertex { point, .. }, Feature::Edge { points, .. }) => {
            let (_, on_edge) = closest_point_line(points[0], points[1] - points[0], *point);
            emit(*point, on_edge, true);
        }

        (Feature::Edge { points, .. }, Feature::Vertex { point, .. }) => {
            let (_, on_edge) = closest_point_line(points[0], points[1] - points[0], *point);
            emit(on_edge, *point, true);
        }

        (Feature::Vertex { point: va, .. }, Feature::Vertex { point: vb, .. }) => {
            emit(*va, *vb, true);
        }
    }
}

fn project_polygon<P: Fn(Vec3) -> Vec2>(poly: &[Vec3], to_2d: &P) -> ([Vec2; MAX_POLYGON], usize) {
    let mut out = [Vec2::ZERO; MAX_POLYGON];
    for (o, p) in out.iter_mut().zip(poly) {
        *o = to_2d(*p);
    }
    (out, poly.len().min(MAX_POLYGON))
}

/// Clip segment `edge` against the prism of `face` along `n`
///
/// `emit` receives the point on the edge and the matching point on the face.
fn clip_edge_face<P, E>(edge: &[Vec3; 2], face: &[Vec3], n: Vec3, to_2d: &P, emit: &mut E)
where
    P: Fn(Vec3) -> Vec2,
    E: FnMut(Vec3, Vec3),
{
    if face.is_empty() {
        return;
    }

    let (face_2d, len) = project_polygon(face, to_2d);
    let face_2d = &face_2d[..len];
    let e0 = to_2d(edge[0]);
    let e1 = to_2d(edge[1]);

    for (p, p2) in [(edge[0], e0), (edge[1], e1)] {
        if point_in_convex_polygon(face_2d, p2) {
            emit(p, project_plane(p, face[0], n));
        }
    }

    for i in 0..len {
        let i1 = (i + 1) % len;
        if let Some((s, t)) = intersect_segments_2d(e0, e1, face_2d[i], face_2d[i1]) {
            emit(edge[0].lerp(edge[1], s), face[i].lerp(face[i1], t));
        }
    }
}
