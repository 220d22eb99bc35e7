//! Convex Mesh Geometry
//!
//! Builds the collision representation of a convex polyhedron from render-style
//! buffers (vertex buffer + triangle index buffer) or from a bare point cloud.
//!
//! # Derived data
//!
//! - **Unique vertices**: duplicated buffer vertices are welded together
//! - **Polygon faces**: coplanar triangles are merged into one planar face whose
//!   vertices are ordered counter-clockwise around the outward normal
//!
//! Faces are what the contact manifold clips against; the vertex set is what the
//! support function scans.
//!
//! # Point clouds
//!
//! [`ConvexMesh::from_points`] runs an incremental hull first:
//! 1. Find an initial tetrahedron from 4 non-coplanar points
//! 2. For each remaining point, remove the faces it can see and patch the hole
//!    with a fan of triangles from the horizon edges to the point

use crate::collider::Support;
use crate::error::PhysicsError;
use crate::manifold::convex_hull_2d;
use crate::math::Vec3;

/// Vertices closer than this are welded
const WELD_EPSILON: f64 = 1e-9;
/// Normals closer than this (1 - cos) belong to the same face
const COPLANAR_NORMAL_EPSILON: f64 = 1e-6;
/// Plane offsets closer than this belong to the same face
const COPLANAR_OFFSET_EPSILON: f64 = 1e-6;

/// Planar polygon face of a convex mesh
#[derive(Clone, Debug, PartialEq)]
pub struct MeshFace {
    /// Outward unit normal (mesh-local)
    pub normal: Vec3,
    /// Vertex indices, counter-clockwise around `normal`
    pub vertices: Vec<usize>,
}

/// Convex polyhedron in mesh-local coordinates
///
/// The local origin is the center of mass of the solid (uniform density), so a
/// body's position is where the mesh rotates about.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexMesh {
    vertices: Vec<Vec3>,
    faces: Vec<MeshFace>,
    /// Center of mass in the input coordinates
    offset: Vec3,
}

/// Compute the centroid (average) of a set of points
///
/// Returns the zero vector if the input slice is empty.
#[must_use]
pub fn compute_centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    let sum = points.iter().fold(Vec3::ZERO, |acc, p| acc + *p);
    sum / points.len() as f64
}

impl ConvexMesh {
    /// Build from a vertex buffer and a triangle index buffer
    ///
    /// The triangles must describe a closed convex surface; winding does not
    /// matter, normals are oriented away from the centroid. Vertices are
    /// shifted so the center of mass is the local origin (see [`offset`]).
    ///
    /// [`offset`]: ConvexMesh::offset
    pub fn from_triangles(vertices: &[Vec3], indices: &[u32]) -> Result<Self, PhysicsError> {
        if indices.is_empty() || indices.len() % 3 != 0 {
            return Err(PhysicsError::InvalidMesh {
                reason: "index count must be a non-zero multiple of 3",
            });
        }
        if indices.iter().any(|&i| i as usize >= vertices.len()) {
            return Err(PhysicsError::InvalidMesh {
                reason: "triangle index out of range",
            });
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidMesh {
                reason: "non-finite vertex",
            });
        }

        // Weld duplicates; `remap[i]` is the unique index of buffer vertex i
        let mut unique: Vec<Vec3> = Vec::with_capacity(vertices.len());
        let mut remap = Vec::with_capacity(vertices.len());
        for &v in vertices {
            let idx = match unique.iter().position(|u| u.distance(v) <= WELD_EPSILON) {
                Some(idx) => idx,
                None => {
                    unique.push(v);
                    unique.len() - 1
                }
            };
            remap.push(idx);
        }

        let centroid = compute_centroid(&unique);

        // Group triangles by plane
        let mut planes: Vec<(Vec3, f64, Vec<usize>)> = Vec::new();
        for tri in indices.chunks_exact(3) {
            let ids = [
                remap[tri[0] as usize],
                remap[tri[1] as usize],
                remap[tri[2] as usize],
            ];
            let (a, b, c) = (unique[ids[0]], unique[ids[1]], unique[ids[2]]);
            let Some(mut normal) = (b - a).cross(c - a).try_normalize(1e-12) else {
                continue;
            };
            if normal.dot(a - centroid) < 0.0 {
                normal = -normal;
            }
            let offset = normal.dot(a);

            let group = planes.iter_mut().find(|(n, d, _)| {
                1.0 - n.dot(normal) < COPLANAR_NORMAL_EPSILON
                    && (d - offset).abs() < COPLANAR_OFFSET_EPSILON
            });
            match group {
                Some((_, _, members)) => {
                    for id in ids {
                        if !members.contains(&id) {
                            members.push(id);
                        }
                    }
                }
                None => planes.push((normal, offset, ids.to_vec())),
            }
        }

        if planes.len() < 4 {
            return Err(PhysicsError::InvalidMesh {
                reason: "mesh does not enclose a volume",
            });
        }

        let faces = planes
            .into_iter()
            .map(|(normal, _, members)| {
                let (u, v) = normal.orthonormal_basis();
                let projected: Vec<(f64, f64)> = members
                    .iter()
                    .map(|&i| (unique[i].dot(u), unique[i].dot(v)))
                    .collect();
                let ordered = convex_hull_2d(&projected)
                    .into_iter()
                    .map(|k| members[k])
                    .collect();
                MeshFace {
                    normal,
                    vertices: ordered,
                }
            })
            .collect();

        // Keep only vertices that ended up on a face
        let mut used: Vec<usize> = Vec::new();
        let mut faces: Vec<MeshFace> = faces;
        for face in &faces {
            for &i in &face.vertices {
                if !used.contains(&i) {
                    used.push(i);
                }
            }
        }
        used.sort_unstable();
        if used.len() < 4 {
            return Err(PhysicsError::InvalidMesh {
                reason: "fewer than 4 unique vertices",
            });
        }
        for face in &mut faces {
            for i in &mut face.vertices {
                *i = used.binary_search(i).unwrap_or(0);
            }
        }
        let mut vertices: Vec<Vec3> = used.iter().map(|&i| unique[i]).collect();

        let offset = volume_centroid(&vertices, &faces);
        for v in &mut vertices {
            *v -= offset;
        }
        Ok(Self {
            vertices,
            faces,
            offset,
        })
    }

    /// Build the convex hull of a point cloud
    pub fn from_points(points: &[Vec3]) -> Result<Self, PhysicsError> {
        if points.len() < 4 {
            return Err(PhysicsError::InvalidMesh {
                reason: "hull requires at least 4 points",
            });
        }
        let (verts, triangles) = build_hull(points)?;
        let indices: Vec<u32> = triangles
            .iter()
            .flat_map(|t| t.iter().map(|&i| i as u32))
            .collect();
        Self::from_triangles(&verts, &indices)
    }

    /// Axis-aligned box centered on the origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        let vertices: Vec<Vec3> = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { -h.x } else { h.x },
                    if i & 2 == 0 { -h.y } else { h.y },
                    if i & 4 == 0 { -h.z } else { h.z },
                )
            })
            .collect();
        let quad = |normal: Vec3, vertices: [usize; 4]| MeshFace {
            normal,
            vertices: vertices.to_vec(),
        };
        let faces = vec![
            quad(-Vec3::UNIT_X, [0, 4, 6, 2]),
            quad(Vec3::UNIT_X, [1, 3, 7, 5]),
            quad(-Vec3::UNIT_Y, [0, 1, 5, 4]),
            quad(Vec3::UNIT_Y, [2, 6, 7, 3]),
            quad(-Vec3::UNIT_Z, [0, 2, 3, 1]),
            quad(Vec3::UNIT_Z, [4, 5, 7, 6]),
        ];
        Self {
            vertices,
            faces,
            offset: Vec3::ZERO,
        }
    }

    /// Thin square quad centered on the origin, facing `normal` on both sides
    pub(crate) fn quad(normal: Vec3, half_extent: f64) -> Self {
        let normal = normal.normalize();
        let (u, v) = normal.orthonormal_basis();
        let (u, v) = (u * half_extent, v * half_extent);
        let vertices = vec![-u - v, u - v, u + v, v - u];
        let faces = vec![
            MeshFace {
                normal,
                vertices: vec![0, 1, 2, 3],
            },
            MeshFace {
                normal: -normal,
                vertices: vec![3, 2, 1, 0],
            },
        ];
        Self {
            vertices,
            faces,
            offset: Vec3::ZERO,
        }
    }

    /// Unique vertices (mesh-local)
    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Polygon faces
    #[inline]
    pub fn faces(&self) -> &[MeshFace] {
        &self.faces
    }

    /// Where the mesh-local origin sat in the vertex buffer it was built from
    ///
    /// Buffers are recentred on their center of mass; place the body at
    /// `buffer_pose.transform_point(offset)` to keep the authored placement.
    #[inline]
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Average of the unique vertices
    pub fn centroid(&self) -> Vec3 {
        compute_centroid(&self.vertices)
    }

    /// Half-extents of the local bounding box around the origin
    pub fn half_extents(&self) -> Vec3 {
        self.vertices
            .iter()
            .fold(Vec3::ZERO, |acc, v| acc.max(v.abs()))
    }
}

/// Center of mass of a closed polyhedron of uniform density
///
/// Sums signed tetrahedra from the vertex average to every fan triangle of
/// every face. Falls back to the vertex average when the volume vanishes.
fn volume_centroid(vertices: &[Vec3], faces: &[MeshFace]) -> Vec3 {
    let reference = compute_centroid(vertices);
    let mut volume = 0.0;
    let mut moment = Vec3::ZERO;
    for face in faces {
        let Some((&first, rest)) = face.vertices.split_first() else {
            continue;
        };
        let a = vertices[first] - reference;
        for edge in rest.windows(2) {
            let b = vertices[edge[0]] - reference;
            let c = vertices[edge[1]] - reference;
            let v = a.dot(b.cross(c)) / 6.0;
            volume += v;
            moment += (a + b + c) * (v / 4.0);
        }
    }
    if volume.abs() < f64::EPSILON {
        return reference;
    }
    reference + moment / volume
}

impl Support for ConvexMesh {
    fn support(&self, direction: Vec3) -> Vec3 {
        let mut best = self.vertices[0];
        let mut best_dot = best.dot(direction);
        for &v in &self.vertices[1..] {
            let d = v.dot(direction);
            if d > best_dot {
                best = v;
                best_dot = d;
            }
        }
        best
    }
}

// ============================================================================
// Incremental hull
// ============================================================================

/// Triangle of the hull under construction, wound counter-clockwise seen from
/// outside
#[derive(Clone, Copy, Debug)]
struct HullFace {
    indices: [usize; 3],
    normal: Vec3,
}

impl HullFace {
    fn new(verts: &[Vec3], indices: [usize; 3], interior: Vec3) -> Self {
        let [i, j, k] = indices;
        let normal = (verts[j] - verts[i]).cross(verts[k] - verts[i]);
        if normal.dot(interior - verts[i]) > 0.0 {
            Self {
                indices: [i, k, j],
                normal: -normal,
            }
        } else {
            Self { indices, normal }
        }
    }
}

/// Incremental hull: returns the inserted vertices and the hull triangles
fn build_hull(points: &[Vec3]) -> Result<(Vec<Vec3>, Vec<[usize; 3]>), PhysicsError> {
    let (tet, remaining) = find_initial_tetrahedron(points)?;

    let mut verts: Vec<Vec3> = tet.to_vec();
    let interior = compute_centroid(&verts);
    let scale = points
        .iter()
        .fold(0.0_f64, |acc, p| acc.max(p.abs().x.max(p.abs().y).max(p.abs().z)))
        .max(1.0);
    let visibility_eps = 1e-10 * scale * scale;

    let mut faces: Vec<HullFace> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .iter()
        .map(|&idx| HullFace::new(&verts, idx, interior))
        .collect();

    for point in remaining {
        insert_point(&mut verts, &mut faces, point, interior, visibility_eps);
    }

    Ok((verts, faces.iter().map(|f| f.indices).collect()))
}

/// Find 4 non-coplanar points to form an initial tetrahedron
///
/// Returns `(tetrahedron_points, remaining_points)`.
fn find_initial_tetrahedron(points: &[Vec3]) -> Result<([Vec3; 4], Vec<Vec3>), PhysicsError> {
    let n = points.len();

    // Two points that are furthest apart
    let (mut i0, mut i1) = (0usize, 1usize);
    let mut max_dist = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = points[i].distance(points[j]);
            if d > max_dist {
                max_dist = d;
                i0 = i;
                i1 = j;
            }
        }
    }

    // Point furthest from the line (i0, i1)
    let line_dir = points[i1] - points[i0];
    let mut i2 = 0usize;
    let mut max_cross = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i == i0 || i == i1 {
            continue;
        }
        let cl = line_dir.cross(*p - points[i0]).length();
        if cl > max_cross {
            max_cross = cl;
            i2 = i;
        }
    }

    // Point furthest from the plane (i0, i1, i2)
    let tri_normal = line_dir.cross(points[i2] - points[i0]);
    let mut i3 = 0usize;
    let mut max_plane_dist = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i == i0 || i == i1 || i == i2 {
            continue;
        }
        let d = (*p - points[i0]).dot(tri_normal).abs();
        if d > max_plane_dist {
            max_plane_dist = d;
            i3 = i;
        }
    }

    if max_dist <= WELD_EPSILON || max_cross <= WELD_EPSILON || max_plane_dist <= WELD_EPSILON {
        return Err(PhysicsError::InvalidMesh {
            reason: "points are coplanar or coincident",
        });
    }

    let tet = [points[i0], points[i1], points[i2], points[i3]];
    let remaining = points
        .iter()
        .enumerate()
        .filter(|(i, _)| ![i0, i1, i2, i3].contains(i))
        .map(|(_, p)| *p)
        .collect();

    Ok((tet, remaining))
}

/// Insert a point into the hull, expanding it if the point is outside
fn insert_point(
    verts: &mut Vec<Vec3>,
    faces: &mut Vec<HullFace>,
    point: Vec3,
    interior: Vec3,
    eps: f64,
) {
    let visible: Vec<usize> = faces
        .iter()
        .enumerate()
        .filter(|(_, f)| f.normal.dot(point - verts[f.indices[0]]) > eps)
        .map(|(i, _)| i)
        .collect();

    if visible.is_empty() {
        return;
    }

    // Horizon: edges of visible faces whose twin belongs to a hidden face
    let mut horizon: Vec<(usize, usize)> = Vec::new();
    for &fi in &visible {
        let face = faces[fi];
        for e in 0..3 {
            let (e0, e1) = (face.indices[e], face.indices[(e + 1) % 3]);
            let shared = visible.iter().any(|&other| {
                other != fi
                    && (0..3).any(|oe| {
                        faces[other].indices[oe] == e1 && faces[other].indices[(oe + 1) % 3] == e0
                    })
            });
            if !shared {
                horizon.push((e0, e1));
            }
        }
    }

    let mut visible = visible;
    visible.sort_unstable();
    for &fi in visible.iter().rev() {
        faces.swap_remove(fi);
    }

    let new_idx = verts.len();
    verts.push(point);
    for (e0, e1) in horizon {
        faces.push(HullFace::new(verts, [e0, e1, new_idx], interior));
    }
}
