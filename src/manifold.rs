//! Contact Manifold Extraction
//!
//! Turns one EPA result into a set of contact points.
//!
//! For face-face contact (a box resting on a plane, stacked boxes) the faces of
//! both shapes nearly parallel to the contact normal are clipped against each
//! other in a 2D plane perpendicular to the normal:
//!
//! 1. Pick A's face most aligned with `n`, B's face most aligned with `−n`
//! 2. Project both polygons onto the plane `⟂ n` and take their 2D hulls
//! 3. Clip A's polygon by B's (Sutherland–Hodgman)
//! 4. Lift every clipped point back onto both face planes
//!
//! Everything else (spheres, edge contact, tilted faces) uses a single point
//! interpolated from the closest EPA face.

use crate::collider::{Collider, FacePolygon, Support};
use crate::gjk::EpaResult;
use crate::math::Vec3;

/// Minimum `|n_face · n|` for a face to take part in clipping
pub const FACE_PARALLEL_COS: f64 = 0.98;
/// Below this the barycentric system of the EPA face is treated as singular
pub const BARYCENTRIC_EPSILON: f64 = 1e-12;
/// Clipped points closer than this in the contact plane are merged
pub const CLIP_WELD_EPSILON: f64 = 1e-9;

/// A point of contact between two shapes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPoint {
    /// World point on the surface of A
    pub on_a: Vec3,
    /// World point on the surface of B
    pub on_b: Vec3,
    /// `(on_a − on_b) · normal`
    pub depth: f64,
}

/// All contact points of a colliding pair sharing one normal
#[derive(Clone, Debug, PartialEq)]
pub struct Manifold {
    /// Unit normal pointing from A to B
    pub normal: Vec3,
    pub points: Vec<ContactPoint>,
}

/// Build the contact manifold for two colliders at their cached poses
pub fn build_manifold(a: &Collider, b: &Collider, hit: &EpaResult) -> Manifold {
    let normal = hit.normal;
    let clipped = match (a.best_face(normal), b.best_face(-normal)) {
        (Some((face_a, align_a)), Some((face_b, align_b)))
            if align_a >= FACE_PARALLEL_COS && align_b >= FACE_PARALLEL_COS =>
        {
            clip_faces(&face_a, &face_b, normal)
        }
        _ => Vec::new(),
    };

    let points = if clipped.is_empty() {
        vec![single_point(a, b, hit)]
    } else {
        clipped
    };
    Manifold { normal, points }
}

/// Clip two face polygons and return the contact pairs with positive depth
fn clip_faces(face_a: &FacePolygon, face_b: &FacePolygon, normal: Vec3) -> Vec<ContactPoint> {
    let (u, v) = normal.orthonormal_basis();
    let project = |p: &Vec3| (p.dot(u), p.dot(v));

    let raw_a: Vec<(f64, f64)> = face_a.vertices.iter().map(project).collect();
    let raw_b: Vec<(f64, f64)> = face_b.vertices.iter().map(project).collect();
    let poly_a: Vec<(f64, f64)> = convex_hull_2d(&raw_a).into_iter().map(|i| raw_a[i]).collect();
    let poly_b: Vec<(f64, f64)> = convex_hull_2d(&raw_b).into_iter().map(|i| raw_b[i]).collect();
    if poly_a.len() < 3 || poly_b.len() < 3 {
        return Vec::new();
    }

    let plane_a = face_a.normal.dot(face_a.vertices[0]);
    let plane_b = face_b.normal.dot(face_b.vertices[0]);
    let denom_a = face_a.normal.dot(normal);
    let denom_b = face_b.normal.dot(normal);

    weld_2d(clip_polygon(&poly_a, &poly_b))
        .into_iter()
        .filter_map(|(x, y)| {
            let base = u * x + v * y;
            let on_a = base + normal * ((plane_a - face_a.normal.dot(base)) / denom_a);
            let on_b = base + normal * ((plane_b - face_b.normal.dot(base)) / denom_b);
            let depth = (on_a - on_b).dot(normal);
            (depth > 0.0).then_some(ContactPoint { on_a, on_b, depth })
        })
        .collect()
}

/// Single contact interpolated from the closest EPA face
fn single_point(a: &Collider, b: &Collider, hit: &EpaResult) -> ContactPoint {
    let [s0, s1, s2] = hit.face;
    let closest = hit.normal * hit.depth;

    match barycentric(closest, s0.point, s1.point, s2.point) {
        Some((l0, l1, l2)) => {
            let on_a = s0.on_a * l0 + s1.on_a * l1 + s2.on_a * l2;
            let on_b = s0.on_b * l0 + s1.on_b * l1 + s2.on_b * l2;
            ContactPoint {
                on_a,
                on_b,
                depth: hit.depth,
            }
        }
        None => ContactPoint {
            on_a: a.support(hit.normal),
            on_b: b.support(-hit.normal),
            depth: hit.depth,
        },
    }
}

/// Barycentric coordinates of `p` in triangle `(a, b, c)`
///
/// `None` when the triangle is degenerate.
pub fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<(f64, f64, f64)> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < BARYCENTRIC_EPSILON {
        return None;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some((1.0 - v - w, v, w))
}

// ============================================================================
// 2D polygon helpers
// ============================================================================

#[inline]
fn cross_2d(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Convex hull of 2D points (Andrew's monotone chain)
///
/// Returns indices into `points`, counter-clockwise, without collinear points.
pub fn convex_hull_2d(points: &[(f64, f64)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&i, &j| {
        points[i]
            .0
            .total_cmp(&points[j].0)
            .then(points[i].1.total_cmp(&points[j].1))
    });
    order.dedup_by(|i, j| points[*i] == points[*j]);
    if order.len() < 3 {
        return order;
    }

    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);
    // Lower hull
    for &i in &order {
        while hull.len() >= 2
            && cross_2d(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0.0
        {
            hull.pop();
        }
        hull.push(i);
    }
    // Upper hull
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross_2d(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0.0
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();
    hull
}

/// Clip `subject` by the convex counter-clockwise polygon `clip`
/// (Sutherland–Hodgman)
pub fn clip_polygon(subject: &[(f64, f64)], clip: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut output = subject.to_vec();
    for k in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let edge_start = clip[k];
        let edge_end = clip[(k + 1) % clip.len()];
        let inside = |p: (f64, f64)| cross_2d(edge_start, edge_end, p) >= 0.0;

        let input = core::mem::take(&mut output);
        for i in 0..input.len() {
            let current = input[i];
            let previous = input[(i + input.len() - 1) % input.len()];
            match (inside(current), inside(previous)) {
                (true, true) => output.push(current),
                (true, false) => {
                    output.push(intersect(previous, current, edge_start, edge_end));
                    output.push(current);
                }
                (false, true) => output.push(intersect(previous, current, edge_start, edge_end)),
                (false, false) => {}
            }
        }
    }
    output
}

/// Merge points within [`CLIP_WELD_EPSILON`] of an earlier one
///
/// Coincident edges (equal boxes stacked exactly) clip into pairs of nearly
/// equal points around each corner.
fn weld_2d(points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let mut kept: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for p in points {
        if !kept
            .iter()
            .any(|q| (p.0 - q.0).hypot(p.1 - q.1) <= CLIP_WELD_EPSILON)
        {
            kept.push(p);
        }
    }
    kept
}

/// Intersection of segment `p→q` with the infinite line through `a→b`
fn intersect(p: (f64, f64), q: (f64, f64), a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    let dp = cross_2d(a, b, p);
    let dq = cross_2d(a, b, q);
    let denom = dp - dq;
    if denom.abs() < f64::EPSILON {
        return p;
    }
    let t = dp / denom;
    (p.0 + (q.0 - p.0) * t, p.1 + (q.1 - p.1) * t)
}
