//! Mass Properties of Primitive Shapes
//!
//! Closed-form mass and diagonal inertia for common solids, expressed in the
//! body-local frame with the center of mass at the origin.
//!
//! # Supported Shapes
//!
//! - Box (half-extents)
//! - Cylinder (axis along local Y)
//! - Sphere
//!
//! Convex meshes and planes use the box inertia of their local bounds; see
//! [`MassProperties::for_collider`].

use crate::collider::{Collider, Shape};
use crate::math::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mass and principal moments of inertia
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass
    pub mass: f64,
    /// Principal moments about the local X, Y and Z axes
    pub inertia: Vec3,
}

impl MassProperties {
    /// Solid box with the given half-extents
    ///
    /// `Ixx = m/12 · (h² + d²)` with full dimensions `w, h, d`.
    #[must_use]
    pub fn cuboid(mass: f64, half_extents: Vec3) -> Self {
        let full = half_extents.abs() * 2.0;
        let k = mass / 12.0;
        Self {
            mass,
            inertia: Vec3::new(
                k * (full.y * full.y + full.z * full.z),
                k * (full.x * full.x + full.z * full.z),
                k * (full.x * full.x + full.y * full.y),
            ),
        }
    }

    /// Solid cylinder of the given radius and full height, axis along Y
    ///
    /// `Iyy = ½ m r²`, `Ixx = Izz = m (3r² + h²) / 12`.
    #[must_use]
    pub fn cylinder(mass: f64, radius: f64, height: f64) -> Self {
        let r2 = radius * radius;
        let axial = 0.5 * mass * r2;
        let lateral = mass * (3.0 * r2 + height * height) / 12.0;
        Self {
            mass,
            inertia: Vec3::new(lateral, axial, lateral),
        }
    }

    /// Solid sphere: `I = 2/5 m r²` on every axis
    #[must_use]
    pub fn sphere(mass: f64, radius: f64) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self {
            mass,
            inertia: Vec3::splat(i),
        }
    }

    /// Default mass properties for a collider shape
    #[must_use]
    pub fn for_collider(mass: f64, collider: &Collider) -> Self {
        match collider.shape() {
            Shape::Sphere(s) => Self::sphere(mass, s.radius),
            _ => Self::cuboid(mass, collider.local_half_extents()),
        }
    }

    /// Inverse mass, zero for non-positive or non-finite mass
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        invert(self.mass)
    }

    /// Component-wise inverse inertia; degenerate axes get zero
    #[inline]
    pub fn inverse_inertia(&self) -> Vec3 {
        Vec3::new(
            invert(self.inertia.x),
            invert(self.inertia.y),
            invert(self.inertia.z),
        )
    }
}

#[inline]
fn invert(v: f64) -> f64 {
    if v > 0.0 && v.is_finite() {
        1.0 / v
    } else {
        0.0
    }
}
