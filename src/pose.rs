//! Rigid Transform (Pose)
//!
//! Position + orientation pair. Every mutating operation renormalizes the
//! orientation so a pose always carries a unit quaternion.

use crate::math::{Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and orientation of a frame relative to its parent
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Translation
    pub position: Vec3,
    /// Rotation (unit length)
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a pose, normalizing the orientation
    #[inline]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation: orientation.normalize(),
        }
    }

    /// Pure translation
    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Replace the orientation (normalized)
    #[inline]
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
    }

    /// Apply a world-frame rotation vector (first-order, normalized)
    #[inline]
    pub fn rotate_by(&mut self, rotation: Vec3) {
        self.orientation = self.orientation.integrate(rotation);
    }

    /// Rotate a direction from local to parent space
    #[inline]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.orientation.rotate_vec(v)
    }

    /// Rotate a direction from parent to local space
    #[inline]
    pub fn inverse_rotate(&self, v: Vec3) -> Vec3 {
        self.orientation.inverse_rotate_vec(v)
    }

    /// Transform a point from local to parent space
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.position + self.rotate(p)
    }

    /// Transform a point from parent to local space
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.inverse_rotate(p - self.position)
    }

    /// `self ∘ local`: the pose of a child frame expressed in this pose's parent
    #[inline]
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose::new(
            self.transform_point(local.position),
            self.orientation.mul(local.orientation),
        )
    }

    /// Inverse transform
    #[inline]
    pub fn invert(&self) -> Pose {
        let q = self.orientation.conjugate();
        Pose::new(-q.rotate_vec(self.position), q)
    }

    /// True when position and orientation are finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f64::consts::FRAC_PI_2;

    #[test]
    fn test_transform_roundtrip() {
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7),
        );
        let p = Vec3::new(-0.5, 4.0, 2.0);
        let back = pose.inverse_transform_point(pose.transform_point(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let pose = Pose::new(
            Vec3::new(5.0, -1.0, 0.25),
            Quat::from_axis_angle(Vec3::UNIT_Y, 1.3),
        );
        let id = pose.compose(&pose.invert());
        assert_relative_eq!(id.position.length(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(id.orientation.angle(), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_compose_applies_local_first() {
        let parent = Pose::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_2));
        let child = Pose::from_position(Vec3::UNIT_X);
        let world = parent.compose(&child);
        // local +X of the parent is world +Y
        assert_relative_eq!(world.position.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(world.position.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mutation_keeps_unit_orientation() {
        let mut pose = Pose::new(Vec3::ZERO, Quat::new(0.0, 0.0, 3.0, 4.0));
        assert_relative_eq!(pose.orientation.length(), 1.0, epsilon = 1e-12);
        pose.rotate_by(Vec3::new(0.3, -0.2, 0.1));
        assert_relative_eq!(pose.orientation.length(), 1.0, epsilon = 1e-12);
        pose.set_orientation(Quat::new(1.0, 1.0, 1.0, 1.0));
        assert_relative_eq!(pose.orientation.length(), 1.0, epsilon = 1e-12);
    }
}
