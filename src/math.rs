//! Vector and Quaternion Mathematics
//!
//! # Types
//!
//! - `Vec3`: 3D vector with `f64` components
//! - `Quat`: rotation quaternion stored as (x, y, z, w), w is the scalar part
//!
//! All types are `Copy` values. Rotations are applied as `q * v * q⁻¹`; angular
//! quantities (angular velocity, rotation corrections) are world-frame vectors
//! unless stated otherwise.

use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Vec3
// ============================================================================

/// 3D vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// All components one
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    /// Unit X vector
    pub const UNIT_X: Self = Self::new(1.0, 0.0, 0.0);
    /// Unit Y vector
    pub const UNIT_Y: Self = Self::new(0.0, 1.0, 0.0);
    /// Unit Z vector
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Create new vector
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Vector with all components set to `v`
    #[inline]
    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Dot product
    #[inline]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product
    #[inline]
    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// Squared length (no sqrt)
    #[inline]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length (magnitude)
    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[inline]
    pub fn distance(self, rhs: Self) -> f64 {
        (self - rhs).length()
    }

    /// Normalize to unit length, zero vector stays zero
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self / len
        } else {
            Self::ZERO
        }
    }

    /// Normalize, or `None` when shorter than `epsilon`
    pub fn try_normalize(self, epsilon: f64) -> Option<Self> {
        let len = self.length();
        if len > epsilon {
            Some(self / len)
        } else {
            None
        }
    }

    /// Scale by scalar
    #[inline]
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Component-wise product (diagonal matrix times vector)
    #[inline]
    pub fn mul_elem(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }

    /// Component-wise absolute value
    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    /// Component-wise minimum
    #[inline]
    pub fn min(self, rhs: Self) -> Self {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y), self.z.min(rhs.z))
    }

    /// Component-wise maximum
    #[inline]
    pub fn max(self, rhs: Self) -> Self {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y), self.z.max(rhs.z))
    }

    /// Linear interpolation
    #[inline]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        self + (rhs - self) * t
    }

    /// True when every component is finite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Two unit vectors completing `self` (assumed unit) to an orthonormal basis
    pub fn orthonormal_basis(self) -> (Self, Self) {
        // Duff et al., "Building an Orthonormal Basis, Revisited"
        let sign = 1.0_f64.copysign(self.z);
        let a = -1.0 / (sign + self.z);
        let b = self.x * self.y * a;
        let u = Self::new(1.0 + sign * self.x * self.x * a, sign * b, -sign * self.x);
        let v = Self::new(b, sign + self.y * self.y * a, -self.y);
        (u, v)
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        rhs.scale(self)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign<f64> for Vec3 {
    #[inline]
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl From<[f64; 3]> for Vec3 {
    #[inline]
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    #[inline]
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

// ============================================================================
// Quat
// ============================================================================

/// Quaternion (for rotations)
///
/// Stored as (x, y, z, w) where w is the scalar part
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create from raw components
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about `axis` (normalized internally)
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let axis = axis.normalize();
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Pure quaternion `[v, 0]`
    #[inline]
    pub const fn from_vector(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z, 0.0)
    }

    /// Vector part
    #[inline]
    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Hamilton product `self * rhs`
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }

    /// Conjugate (inverse for unit quaternions)
    #[inline]
    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Dot product of the four components
    #[inline]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }

    /// Squared length
    #[inline]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Normalize to unit length; a degenerate quaternion becomes identity
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > f64::EPSILON && len.is_finite() {
            let inv = 1.0 / len;
            Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Rotate a vector
    #[inline]
    pub fn rotate_vec(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(u × v) + 2u × (u × v)
        let u = self.xyz();
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }

    /// Rotate a vector by the inverse rotation
    #[inline]
    pub fn inverse_rotate_vec(self, v: Vec3) -> Vec3 {
        self.conjugate().rotate_vec(v)
    }

    /// Local X axis in world space
    #[inline]
    pub fn axis_x(self) -> Vec3 {
        self.rotate_vec(Vec3::UNIT_X)
    }

    /// Local Y axis in world space
    #[inline]
    pub fn axis_y(self) -> Vec3 {
        self.rotate_vec(Vec3::UNIT_Y)
    }

    /// Local Z axis in world space
    #[inline]
    pub fn axis_z(self) -> Vec3 {
        self.rotate_vec(Vec3::UNIT_Z)
    }

    /// First-order update by a world-frame rotation vector
    ///
    /// `q + ½·[rotation, 0]·q`, normalized. Exact for small angles.
    pub fn integrate(self, rotation: Vec3) -> Self {
        let dq = Self::from_vector(rotation).mul(self);
        Self::new(
            self.x + 0.5 * dq.x,
            self.y + 0.5 * dq.y,
            self.z + 0.5 * dq.z,
            self.w + 0.5 * dq.w,
        )
        .normalize()
    }

    /// Rotation angle in radians, in `[0, π]`
    pub fn angle(self) -> f64 {
        let q = self.normalize();
        2.0 * q.xyz().length().atan2(q.w.abs())
    }

    /// True when every component is finite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Mul for Quat {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Quat::mul(self, rhs)
    }
}

impl Mul<Vec3> for Quat {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        self.rotate_vec(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f64::consts::{FRAC_PI_2, PI};

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
    }

    #[test]
    fn test_vec3_dot() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_relative_eq!(a.dot(b), 32.0);
    }

    #[test]
    fn test_vec3_cross() {
        assert_vec_eq(Vec3::UNIT_X.cross(Vec3::UNIT_Y), Vec3::UNIT_Z);
        assert_vec_eq(Vec3::UNIT_Y.cross(Vec3::UNIT_X), -Vec3::UNIT_Z);
    }

    #[test]
    fn test_normalize_zero_stays_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
        assert!(Vec3::new(1e-14, 0.0, 0.0).try_normalize(1e-12).is_none());
        assert_relative_eq!(Vec3::new(3.0, 4.0, 0.0).normalize().length(), 1.0);
    }

    #[test]
    fn test_orthonormal_basis() {
        for n in [
            Vec3::UNIT_X,
            Vec3::UNIT_Y,
            -Vec3::UNIT_Z,
            Vec3::new(1.0, -2.0, 0.5).normalize(),
        ] {
            let (u, v) = n.orthonormal_basis();
            assert_relative_eq!(u.length(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(v.length(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(u.dot(n), 0.0, epsilon = 1e-12);
            assert_relative_eq!(v.dot(n), 0.0, epsilon = 1e-12);
            assert_relative_eq!(u.dot(v), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_quat_identity() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_vec_eq(Quat::IDENTITY.rotate_vec(v), v);
    }

    #[test]
    fn test_quat_axis_angle_rotation() {
        let q = Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_2);
        assert_vec_eq(q.rotate_vec(Vec3::UNIT_X), Vec3::UNIT_Y);
        assert_vec_eq(q.inverse_rotate_vec(Vec3::UNIT_Y), Vec3::UNIT_X);
        assert_relative_eq!(q.angle(), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_quat_composition_order() {
        let a = Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_2);
        let b = Quat::from_axis_angle(Vec3::UNIT_X, FRAC_PI_2);
        // (a * b) applies b first, then a
        let v = (a * b).rotate_vec(Vec3::UNIT_Y);
        assert_vec_eq(v, a.rotate_vec(b.rotate_vec(Vec3::UNIT_Y)));
    }

    #[test]
    fn test_quat_integrate_small_rotation() {
        let omega = Vec3::new(0.0, 0.0, 1.0);
        let mut q = Quat::IDENTITY;
        let h = 1e-4;
        for _ in 0..10_000 {
            q = q.integrate(omega * h);
        }
        // one radian about Z
        assert_relative_eq!(q.angle(), 1.0, epsilon = 1e-3);
        assert_relative_eq!(q.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quat_normalize_degenerate() {
        assert_eq!(Quat::new(0.0, 0.0, 0.0, 0.0).normalize(), Quat::IDENTITY);
        let q = Quat::new(0.0, 0.0, 0.0, -2.0).normalize();
        assert_relative_eq!(q.w, -1.0);
        assert_relative_eq!(Quat::from_axis_angle(Vec3::UNIT_Y, PI).angle(), PI, epsilon = 1e-12);
    }
}
