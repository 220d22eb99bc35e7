//! Collision Detection using GJK and EPA
//!
//! # Algorithms
//!
//! - **GJK (Gilbert-Johnson-Keerthi)**: Determines if two convex shapes intersect
//! - **EPA (Expanding Polytope Algorithm)**: Computes penetration depth and normal
//!
//! Both work on the Minkowski difference `A − B` through the [`Support`] trait.
//! Every support point remembers the two witness points it was built from, so
//! the closest EPA face can be mapped back onto the shapes.
//!
//! The simplex update is a pure function: each GJK iteration hands the current
//! simplex and search direction in and gets either the next pair or a terminal
//! result back.

use crate::collider::Support;
use crate::math::Vec3;

/// GJK iteration bound; exhaustion is reported as "no collision"
pub const GJK_MAX_ITERATIONS: usize = 64;
/// EPA iteration bound; exhaustion returns the best face found
pub const EPA_MAX_ITERATIONS: usize = 64;
/// EPA stops once the new support point is this close to the closest face
pub const EPA_TOLERANCE: f64 = 1e-6;

/// Search directions below this squared length mean the origin touches the simplex
const DIRECTION_EPSILON: f64 = 1e-20;
/// Minimum extent used when completing a degenerate simplex
const COMPLETION_EPSILON: f64 = 1e-9;

const SEARCH_DIRECTIONS: [Vec3; 6] = [
    Vec3::UNIT_X,
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::UNIT_Y,
    Vec3::new(0.0, -1.0, 0.0),
    Vec3::UNIT_Z,
    Vec3::new(0.0, 0.0, -1.0),
];

// ============================================================================
// Support points
// ============================================================================

/// Point of the Minkowski difference with its witnesses on both shapes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SupportPoint {
    /// `on_a − on_b`
    pub point: Vec3,
    /// Support point of A along the query direction
    pub on_a: Vec3,
    /// Support point of B against the query direction
    pub on_b: Vec3,
}

/// Support point of `A − B` along `direction`
#[inline]
pub fn minkowski_support<A: Support + ?Sized, B: Support + ?Sized>(
    a: &A,
    b: &B,
    direction: Vec3,
) -> SupportPoint {
    let on_a = a.support(direction);
    let on_b = b.support(-direction);
    SupportPoint {
        point: on_a - on_b,
        on_a,
        on_b,
    }
}

// ============================================================================
// GJK
// ============================================================================

/// GJK simplex, newest point first
#[derive(Clone, Copy, Debug, Default)]
pub struct Simplex {
    points: [SupportPoint; 4],
    len: usize,
}

impl Simplex {
    /// One-point simplex
    pub fn single(point: SupportPoint) -> Self {
        let mut s = Self::default();
        s.points[0] = point;
        s.len = 1;
        s
    }

    fn from_slice(points: &[SupportPoint]) -> Self {
        let mut s = Self::default();
        for (slot, p) in s.points.iter_mut().zip(points) {
            *slot = *p;
        }
        s.len = points.len().min(4);
        s
    }

    /// Copy with `point` prepended (the oldest point drops off a full simplex)
    #[must_use]
    pub fn pushed(&self, point: SupportPoint) -> Self {
        let mut s = *self;
        for i in (1..4).rev() {
            s.points[i] = s.points[i - 1];
        }
        s.points[0] = point;
        s.len = (s.len + 1).min(4);
        s
    }

    /// Points, newest first
    #[inline]
    pub fn points(&self) -> &[SupportPoint] {
        &self.points[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Outcome of one simplex evolution step
#[derive(Clone, Copy, Debug)]
pub enum SimplexStep {
    /// Keep searching with the reduced simplex along the new direction
    Continue(Simplex, Vec3),
    /// The simplex encloses the origin
    ContainsOrigin(Simplex),
}

/// Terminal GJK result
#[derive(Clone, Copy, Debug)]
pub enum GjkResult {
    /// Shapes do not overlap (or the iteration bound was hit)
    Separated,
    /// Shapes overlap; the terminal simplex seeds EPA
    Intersecting(Simplex),
}

impl GjkResult {
    #[inline]
    pub fn is_intersecting(&self) -> bool {
        matches!(self, GjkResult::Intersecting(_))
    }
}

/// GJK algorithm for collision detection
///
/// Touching shapes (new support point exactly at the origin plane) count as
/// separated.
pub fn gjk<A: Support + ?Sized, B: Support + ?Sized>(a: &A, b: &B) -> GjkResult {
    let first = minkowski_support(a, b, Vec3::UNIT_X);
    let mut simplex = Simplex::single(first);
    let mut direction = -first.point;

    for _ in 0..GJK_MAX_ITERATIONS {
        if direction.length_squared() < DIRECTION_EPSILON {
            // Origin lies on the simplex
            return GjkResult::Intersecting(simplex);
        }

        let support = minkowski_support(a, b, direction);
        if support.point.dot(direction) <= 0.0 {
            return GjkResult::Separated;
        }

        match evolve_simplex(&simplex.pushed(support)) {
            SimplexStep::Continue(next, dir) => {
                simplex = next;
                direction = dir;
            }
            SimplexStep::ContainsOrigin(terminal) => return GjkResult::Intersecting(terminal),
        }
    }

    log::trace!("gjk: iteration bound reached, reporting no collision");
    GjkResult::Separated
}

/// Reduce the simplex to the feature nearest the origin and pick the next
/// search direction
pub fn evolve_simplex(simplex: &Simplex) -> SimplexStep {
    let p = simplex.points();
    match p.len() {
        2 => line_case(p[0], p[1]),
        3 => triangle_case(p[0], p[1], p[2]),
        4 => tetrahedron_case(p[0], p[1], p[2], p[3]),
        _ => SimplexStep::Continue(*simplex, -p[0].point),
    }
}

fn line_case(a: SupportPoint, b: SupportPoint) -> SimplexStep {
    let ab = b.point - a.point;
    let ao = -a.point;

    if ab.dot(ao) > 0.0 {
        // Origin is between A and B
        SimplexStep::Continue(Simplex::from_slice(&[a, b]), ab.cross(ao).cross(ab))
    } else {
        // Origin is beyond A
        SimplexStep::Continue(Simplex::single(a), ao)
    }
}

fn triangle_case(a: SupportPoint, b: SupportPoint, c: SupportPoint) -> SimplexStep {
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ao = -a.point;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            SimplexStep::Continue(Simplex::from_slice(&[a, c]), ac.cross(ao).cross(ac))
        } else {
            line_case(a, b)
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        line_case(a, b)
    } else if abc.dot(ao) > 0.0 {
        SimplexStep::Continue(Simplex::from_slice(&[a, b, c]), abc)
    } else {
        SimplexStep::Continue(Simplex::from_slice(&[a, c, b]), -abc)
    }
}

fn tetrahedron_case(
    a: SupportPoint,
    b: SupportPoint,
    c: SupportPoint,
    d: SupportPoint,
) -> SimplexStep {
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ad = d.point - a.point;
    let ao = -a.point;

    if ab.cross(ac).dot(ao) > 0.0 {
        return triangle_case(a, b, c);
    }
    if ac.cross(ad).dot(ao) > 0.0 {
        return triangle_case(a, c, d);
    }
    if ad.cross(ab).dot(ao) > 0.0 {
        return triangle_case(a, d, b);
    }

    // Origin is inside the tetrahedron
    SimplexStep::ContainsOrigin(Simplex::from_slice(&[a, b, c, d]))
}

// ============================================================================
// EPA
// ============================================================================

/// Penetration information from EPA
#[derive(Clone, Copy, Debug)]
pub struct EpaResult {
    /// Unit contact normal, pointing from A to B
    pub normal: Vec3,
    /// Penetration depth along `normal`
    pub depth: f64,
    /// Vertices of the closest polytope face
    pub face: [SupportPoint; 3],
}

#[derive(Clone, Copy, Debug)]
struct EpaFace {
    indices: [usize; 3],
    normal: Vec3,
    distance: f64,
}

impl EpaFace {
    /// Face wound as given; a zero-area face is never picked as closest
    fn new(vertices: &[SupportPoint], indices: [usize; 3]) -> Self {
        let [i, j, k] = indices;
        let a = vertices[i].point;
        let n = (vertices[j].point - a).cross(vertices[k].point - a);
        match n.try_normalize(f64::EPSILON) {
            Some(normal) => Self {
                indices,
                normal,
                distance: normal.dot(a),
            },
            None => Self {
                indices,
                normal: Vec3::ZERO,
                distance: f64::MAX,
            },
        }
    }

    /// Face wound so its normal points away from `interior`
    fn oriented(vertices: &[SupportPoint], indices: [usize; 3], interior: Vec3) -> Self {
        let face = Self::new(vertices, indices);
        if face.normal.dot(vertices[indices[0]].point - interior) < 0.0 {
            let [i, j, k] = indices;
            Self::new(vertices, [i, k, j])
        } else {
            face
        }
    }

    fn sees(&self, vertices: &[SupportPoint], p: Vec3) -> bool {
        self.normal.dot(p - vertices[self.indices[0]].point) > 0.0
    }
}

/// Expanding Polytope Algorithm seeded by a GJK terminal simplex
///
/// Returns `None` when the simplex cannot be completed into a tetrahedron (the
/// shapes only touch along a degenerate feature).
pub fn epa<A: Support + ?Sized, B: Support + ?Sized>(
    simplex: &Simplex,
    a: &A,
    b: &B,
) -> Option<EpaResult> {
    let mut vertices = complete_tetrahedron(simplex.points().to_vec(), a, b)?;

    let interior = vertices.iter().fold(Vec3::ZERO, |acc, v| acc + v.point) * 0.25;
    let mut faces: Vec<EpaFace> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .iter()
        .map(|&idx| EpaFace::oriented(&vertices, idx, interior))
        .collect();

    let mut best = closest_face(&faces)?;

    for _ in 0..EPA_MAX_ITERATIONS {
        let support = minkowski_support(a, b, best.normal);
        let distance = support.point.dot(best.normal);

        if distance - best.distance < EPA_TOLERANCE {
            return Some(result_from(&vertices, &best));
        }

        // Remove visible faces; unmatched edges form the horizon
        let mut horizon: Vec<(usize, usize)> = Vec::new();
        faces.retain(|face| {
            if !face.sees(&vertices, support.point) {
                return true;
            }
            for e in 0..3 {
                let edge = (face.indices[e], face.indices[(e + 1) % 3]);
                if let Some(pos) = horizon.iter().position(|&h| h == (edge.1, edge.0)) {
                    horizon.swap_remove(pos);
                } else {
                    horizon.push(edge);
                }
            }
            false
        });

        if horizon.is_empty() {
            // Numerically stuck: nothing sees the new point
            return Some(result_from(&vertices, &best));
        }

        let new_idx = vertices.len();
        vertices.push(support);
        for (i, j) in horizon {
            faces.push(EpaFace::new(&vertices, [i, j, new_idx]));
        }

        best = closest_face(&faces)?;
    }

    log::trace!("epa: iteration bound reached, using best face");
    Some(result_from(&vertices, &best))
}

/// GJK followed by EPA
pub fn penetration<A: Support + ?Sized, B: Support + ?Sized>(a: &A, b: &B) -> Option<EpaResult> {
    match gjk(a, b) {
        GjkResult::Separated => None,
        GjkResult::Intersecting(simplex) => epa(&simplex, a, b),
    }
}

fn closest_face(faces: &[EpaFace]) -> Option<EpaFace> {
    faces
        .iter()
        .filter(|f| f.distance < f64::MAX)
        .min_by(|x, y| x.distance.total_cmp(&y.distance))
        .copied()
}

fn result_from(vertices: &[SupportPoint], face: &EpaFace) -> EpaResult {
    EpaResult {
        normal: face.normal,
        depth: face.distance.max(0.0),
        face: face.indices.map(|i| vertices[i]),
    }
}

/// Grow a 1-3 point simplex into a tetrahedron of non-zero volume
fn complete_tetrahedron<A: Support + ?Sized, B: Support + ?Sized>(
    mut points: Vec<SupportPoint>,
    a: &A,
    b: &B,
) -> Option<Vec<SupportPoint>> {
    if points.is_empty() {
        return None;
    }

    if points.len() == 1 {
        let p0 = points[0].point;
        let extra = SEARCH_DIRECTIONS
            .iter()
            .map(|&dir| minkowski_support(a, b, dir))
            .find(|s| s.point.distance(p0) > COMPLETION_EPSILON)?;
        points.push(extra);
    }

    if points.len() == 2 {
        let p0 = points[0].point;
        let line = points[1].point - p0;
        let extra = SEARCH_DIRECTIONS
            .iter()
            .filter_map(|&axis| line.cross(axis).try_normalize(COMPLETION_EPSILON))
            .flat_map(|perp| [perp, -perp])
            .map(|dir| minkowski_support(a, b, dir))
            .find(|s| line.cross(s.point - p0).length() > COMPLETION_EPSILON)?;
        points.push(extra);
    }

    if points.len() == 3 {
        let p0 = points[0].point;
        let normal = (points[1].point - p0)
            .cross(points[2].point - p0)
            .try_normalize(COMPLETION_EPSILON)?;
        let extra = [normal, -normal]
            .into_iter()
            .map(|dir| minkowski_support(a, b, dir))
            .find(|s| (s.point - p0).dot(normal).abs() > COMPLETION_EPSILON)?;
        points.push(extra);
    }

    let [p0, p1, p2, p3] = [points[0].point, points[1].point, points[2].point, points[3].point];
    let volume = (p1 - p0).cross(p2 - p0).dot(p3 - p0).abs();
    if volume <= COMPLETION_EPSILON * COMPLETION_EPSILON {
        return None;
    }
    Some(points)
}
