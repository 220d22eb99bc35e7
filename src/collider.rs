//! Collision Shapes
//!
//! Convex shapes queried by the narrow phase through their support function and,
//! for polyhedral shapes, through their planar faces.
//!
//! # Shapes
//!
//! - **Box**: half-extents
//! - **Plane**: finite square quad of zero thickness (local normal + half-extent)
//! - **Sphere**: radius, no faces
//! - **ConvexMesh**: welded vertices and polygon faces
//!
//! A [`Collider`] keeps a cached world pose, refreshed by the solver once per
//! substep from its owning body.

use crate::convex_mesh::ConvexMesh;
use crate::math::Vec3;
use crate::pose::Pose;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Support
// ============================================================================

/// Support function trait for GJK
pub trait Support {
    /// Returns the point on the shape furthest in the given direction
    fn support(&self, direction: Vec3) -> Vec3;
}

// ============================================================================
// Axis-Aligned Bounding Box
// ============================================================================

/// Axis-Aligned Bounding Box
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Check if two AABBs intersect (broad phase)
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Grow by `margin` on every side
    #[inline]
    pub fn expanded(&self, margin: f64) -> Aabb {
        let m = Vec3::splat(margin.max(0.0));
        Aabb {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Compute union of two AABBs
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Center point
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Shape discriminator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeKind {
    Box,
    Plane,
    Sphere,
    ConvexMesh,
}

/// Box shape, centered on the origin
#[derive(Clone, Debug, PartialEq)]
pub struct BoxShape {
    /// Half-extents along local X, Y, Z
    pub half_extents: Vec3,
    hull: ConvexMesh,
}

impl BoxShape {
    /// Create a box from half-extents (sign ignored)
    pub fn new(half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            half_extents,
            hull: ConvexMesh::cuboid(half_extents),
        }
    }
}

impl Support for BoxShape {
    #[inline]
    fn support(&self, direction: Vec3) -> Vec3 {
        let h = self.half_extents;
        Vec3::new(
            if direction.x >= 0.0 { h.x } else { -h.x },
            if direction.y >= 0.0 { h.y } else { -h.y },
            if direction.z >= 0.0 { h.z } else { -h.z },
        )
    }
}

/// Finite plane: a square quad through the origin
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneShape {
    /// Local unit normal
    pub normal: Vec3,
    /// Half the side length of the quad
    pub half_extent: f64,
    hull: ConvexMesh,
}

impl PlaneShape {
    /// Create a plane facing `normal` (normalized; zero falls back to +Y)
    pub fn new(normal: Vec3, half_extent: f64) -> Self {
        let normal = normal.try_normalize(1e-12).unwrap_or(Vec3::UNIT_Y);
        let half_extent = half_extent.abs();
        Self {
            normal,
            half_extent,
            hull: ConvexMesh::quad(normal, half_extent),
        }
    }
}

impl Support for PlaneShape {
    fn support(&self, direction: Vec3) -> Vec3 {
        self.hull.support(direction)
    }
}

/// Sphere shape, centered on the origin
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SphereShape {
    /// Sphere radius
    pub radius: f64,
}

impl SphereShape {
    /// Create a sphere (sign of radius ignored)
    pub fn new(radius: f64) -> Self {
        Self {
            radius: radius.abs(),
        }
    }
}

impl Support for SphereShape {
    #[inline(always)]
    fn support(&self, direction: Vec3) -> Vec3 {
        direction.try_normalize(1e-12).unwrap_or(Vec3::UNIT_X) * self.radius
    }
}

/// Shape-local geometry of a collider
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Box(BoxShape),
    Plane(PlaneShape),
    Sphere(SphereShape),
    ConvexMesh(ConvexMesh),
}

impl Shape {
    /// Shape discriminator
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box(_) => ShapeKind::Box,
            Shape::Plane(_) => ShapeKind::Plane,
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::ConvexMesh(_) => ShapeKind::ConvexMesh,
        }
    }

    /// Polyhedral representation, `None` for spheres
    pub fn polyhedron(&self) -> Option<&ConvexMesh> {
        match self {
            Shape::Box(b) => Some(&b.hull),
            Shape::Plane(p) => Some(&p.hull),
            Shape::Sphere(_) => None,
            Shape::ConvexMesh(m) => Some(m),
        }
    }
}

impl Support for Shape {
    #[inline]
    fn support(&self, direction: Vec3) -> Vec3 {
        match self {
            Shape::Box(b) => b.support(direction),
            Shape::Plane(p) => p.support(direction),
            Shape::Sphere(s) => s.support(direction),
            Shape::ConvexMesh(m) => m.support(direction),
        }
    }
}

// ============================================================================
// Collider
// ============================================================================

/// World-space planar face of a posed collider
#[derive(Clone, Debug, PartialEq)]
pub struct FacePolygon {
    /// Outward unit normal
    pub normal: Vec3,
    /// Vertices, counter-clockwise around `normal`
    pub vertices: Vec<Vec3>,
}

/// A shape plus its cached world pose
#[derive(Clone, Debug, PartialEq)]
pub struct Collider {
    shape: Shape,
    pose: Pose,
}

impl Collider {
    /// Wrap a shape at the identity pose
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            pose: Pose::IDENTITY,
        }
    }

    /// Box from half-extents
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(Shape::Box(BoxShape::new(half_extents)))
    }

    /// Finite plane facing `normal`
    pub fn plane(normal: Vec3, half_extent: f64) -> Self {
        Self::new(Shape::Plane(PlaneShape::new(normal, half_extent)))
    }

    /// Sphere from radius
    pub fn sphere(radius: f64) -> Self {
        Self::new(Shape::Sphere(SphereShape::new(radius)))
    }

    /// Convex mesh
    pub fn convex_mesh(mesh: ConvexMesh) -> Self {
        Self::new(Shape::ConvexMesh(mesh))
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Cached world pose
    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Refresh the cached world pose
    #[inline]
    pub fn update_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Shape-local vertices (empty for spheres)
    pub fn local_vertices(&self) -> &[Vec3] {
        self.shape
            .polyhedron()
            .map(ConvexMesh::vertices)
            .unwrap_or(&[])
    }

    /// Half-extents of the shape-local bounds
    pub fn local_half_extents(&self) -> Vec3 {
        match &self.shape {
            Shape::Box(b) => b.half_extents,
            Shape::Sphere(s) => Vec3::splat(s.radius),
            Shape::Plane(p) => p.hull.half_extents(),
            Shape::ConvexMesh(m) => m.half_extents(),
        }
    }

    /// World AABB at the cached pose
    pub fn aabb(&self) -> Aabb {
        if let Shape::Sphere(s) = &self.shape {
            return Aabb::from_center_half(self.pose.position, Vec3::splat(s.radius));
        }
        let axes = [Vec3::UNIT_X, Vec3::UNIT_Y, Vec3::UNIT_Z];
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for (i, axis) in axes.iter().enumerate() {
            max[i] = self.support(*axis).dot(*axis);
            min[i] = self.support(-*axis).dot(*axis);
        }
        Aabb::new(Vec3::from(min), Vec3::from(max))
    }

    /// The face whose outward normal is most aligned with `direction`
    ///
    /// Returns the face and its alignment `normal · direction` (direction is
    /// expected to be unit length). `None` for spheres.
    pub fn best_face(&self, direction: Vec3) -> Option<(FacePolygon, f64)> {
        let mesh = self.shape.polyhedron()?;
        let local_dir = self.pose.inverse_rotate(direction);
        let face = mesh.faces().iter().max_by(|a, b| {
            a.normal
                .dot(local_dir)
                .total_cmp(&b.normal.dot(local_dir))
        })?;
        let alignment = face.normal.dot(local_dir);
        let polygon = FacePolygon {
            normal: self.pose.rotate(face.normal),
            vertices: face
                .vertices
                .iter()
                .map(|&i| self.pose.transform_point(mesh.vertices()[i]))
                .collect(),
        };
        Some((polygon, alignment))
    }
}

impl Support for Collider {
    /// World-space support point at the cached pose
    #[inline]
    fn support(&self, direction: Vec3) -> Vec3 {
        let local = self.shape.support(self.pose.inverse_rotate(direction));
        self.pose.transform_point(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;
    use approx::assert_relative_eq;
    use core::f64::consts::FRAC_PI_4;

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let c = Aabb::new(Vec3::splat(1.5), Vec3::splat(2.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.expanded(0.6).intersects(&c));
        assert_eq!(a.union(&c).max, Vec3::splat(2.0));
    }

    #[test]
    fn test_box_support_world() {
        let mut c = Collider::cuboid(Vec3::new(1.0, 2.0, 3.0));
        c.update_pose(Pose::from_position(Vec3::new(10.0, 0.0, 0.0)));
        let s = c.support(Vec3::new(1.0, 1.0, -1.0));
        assert_eq!(s, Vec3::new(11.0, 2.0, -3.0));
    }

    #[test]
    fn test_rotated_box_aabb() {
        let mut c = Collider::cuboid(Vec3::ONE);
        c.update_pose(Pose::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_4)));
        let aabb = c.aabb();
        assert_relative_eq!(aabb.max.x, 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(aabb.min.y, -(2.0_f64.sqrt()), epsilon = 1e-12);
        assert_relative_eq!(aabb.max.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_has_no_faces() {
        let c = Collider::sphere(0.5);
        assert_eq!(c.kind(), ShapeKind::Sphere);
        assert!(c.best_face(Vec3::UNIT_Y).is_none());
        assert!(c.local_vertices().is_empty());
        assert_relative_eq!(c.support(Vec3::new(0.0, 3.0, 0.0)).y, 0.5);
    }

    #[test]
    fn test_plane_faces_both_sides() {
        let c = Collider::plane(Vec3::UNIT_Y, 10.0);
        let (up, a) = c.best_face(Vec3::UNIT_Y).unwrap();
        let (down, b) = c.best_face(-Vec3::UNIT_Y).unwrap();
        assert_relative_eq!(a, 1.0, epsilon = 1e-12);
        assert_relative_eq!(b, 1.0, epsilon = 1e-12);
        assert_relative_eq!(up.normal.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(down.normal.y, -1.0, epsilon = 1e-12);
        assert_eq!(up.vertices.len(), 4);
        let aabb = c.aabb();
        assert_relative_eq!(aabb.max.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(aabb.max.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_best_face_rotated_box() {
        let mut c = Collider::cuboid(Vec3::splat(0.5));
        c.update_pose(Pose::new(
            Vec3::new(0.0, 2.0, 0.0),
            Quat::from_axis_angle(Vec3::UNIT_X, core::f64::consts::FRAC_PI_2),
        ));
        let (face, alignment) = c.best_face(-Vec3::UNIT_Y).unwrap();
        assert_relative_eq!(alignment, 1.0, epsilon = 1e-12);
        assert_relative_eq!(face.normal.y, -1.0, epsilon = 1e-12);
        for v in &face.vertices {
            assert_relative_eq!(v.y, 1.5, epsilon = 1e-12);
        }
    }
}
