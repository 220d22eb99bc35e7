//! Generalized Body-Pair Correction
//!
//! The single XPBD update shared by contacts and constraints. A correction
//! vector `C·n` is resolved into a Lagrange multiplier step
//!
//! ```text
//! Δλ = −C / (w₀ + w₁ + α/h²)
//! ```
//!
//! with `wᵢ` the generalized inverse masses along `n`, and applied as equal and
//! opposite position (or velocity) changes: body A moves along `+n`, body B
//! along `−n`. A missing second body is the static world.

use crate::body::RigidBody;
use crate::math::Vec3;

/// Whether a correction displaces poses or changes velocities
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrectionLevel {
    Position,
    Velocity,
}

/// A correction to apply between two bodies
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairCorrection {
    /// Direction times magnitude of the error, pointing the way body A must move
    pub vector: Vec3,
    /// Inverse stiffness (0 = rigid)
    pub compliance: f64,
    /// World application points on A and B; `None` for a purely angular correction
    pub points: Option<(Vec3, Vec3)>,
    pub level: CorrectionLevel,
}

impl PairCorrection {
    /// Linear correction acting at the two world points
    #[inline]
    pub fn at_points(vector: Vec3, point_a: Vec3, point_b: Vec3, level: CorrectionLevel) -> Self {
        Self {
            vector,
            compliance: 0.0,
            points: Some((point_a, point_b)),
            level,
        }
    }

    /// Purely rotational correction
    #[inline]
    pub fn angular(vector: Vec3, level: CorrectionLevel) -> Self {
        Self {
            vector,
            compliance: 0.0,
            points: None,
            level,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_compliance(mut self, compliance: f64) -> Self {
        self.compliance = compliance.max(0.0);
        self
    }
}

/// Apply a correction to a body pair, returning `|Δλ|`
///
/// A no-op returning 0 when the correction is (near) zero or neither body can
/// move.
pub fn apply_pair_correction(
    a: &mut RigidBody,
    b: Option<&mut RigidBody>,
    correction: &PairCorrection,
    h: f64,
) -> f64 {
    let magnitude = correction.vector.length();
    if magnitude < f64::EPSILON || h <= 0.0 {
        return 0.0;
    }
    let normal = correction.vector / magnitude;
    let (point_a, point_b) = match correction.points {
        Some((pa, pb)) => (Some(pa), Some(pb)),
        None => (None, None),
    };

    let w0 = a.inverse_mass_along(normal, point_a);
    let w1 = b
        .as_deref()
        .map_or(0.0, |b| b.inverse_mass_along(normal, point_b));
    let w = w0 + w1;
    if w < f64::EPSILON {
        log::trace!("skipping correction between immovable bodies");
        return 0.0;
    }

    let alpha = correction.compliance / (h * h);
    let lambda = -magnitude / (w + alpha);
    let impulse = normal * -lambda;

    a.apply_correction(impulse, point_a, correction.level);
    if let Some(b) = b {
        b.apply_correction(-impulse, point_b, correction.level);
    }
    lambda.abs()
}

/// Mutable access to two distinct bodies of a slice
///
/// `None` when `a == b` or either index is out of range.
pub fn pair_mut(
    bodies: &mut [RigidBody],
    a: usize,
    b: usize,
) -> Option<(&mut RigidBody, &mut RigidBody)> {
    if a == b || a >= bodies.len() || b >= bodies.len() {
        return None;
    }
    if a < b {
        let (left, right) = bodies.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = bodies.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}

/// Body A and an optional body B of a slice
pub fn pair_or_world_mut(
    bodies: &mut [RigidBody],
    a: usize,
    b: Option<usize>,
) -> Option<(&mut RigidBody, Option<&mut RigidBody>)> {
    match b {
        Some(b) => pair_mut(bodies, a, b).map(|(a, b)| (a, Some(b))),
        None => bodies.get_mut(a).map(|a| (a, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyBuilder;
    use crate::collider::Collider;
    use approx::assert_relative_eq;

    fn ball(x: f64, mass: f64) -> RigidBody {
        RigidBodyBuilder::new(Collider::sphere(0.5))
            .sphere_mass(mass, 0.5)
            .position(Vec3::new(x, 0.0, 0.0))
            .build()
    }

    #[test]
    fn test_equal_masses_split_evenly() {
        let mut a = ball(0.0, 1.0);
        let mut b = ball(2.0, 1.0);
        let corr = PairCorrection::at_points(
            Vec3::new(1.0, 0.0, 0.0),
            a.position(),
            b.position(),
            CorrectionLevel::Position,
        );
        let lambda = apply_pair_correction(&mut a, Some(&mut b), &corr, 1.0 / 60.0);
        assert_relative_eq!(lambda, 0.5, epsilon = 1e-12);
        assert_relative_eq!(a.position().x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(b.position().x, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_world_anchor_moves_only_a() {
        let mut a = ball(0.0, 2.0);
        let corr = PairCorrection::at_points(
            Vec3::new(0.0, -1.0, 0.0),
            a.position(),
            Vec3::new(0.0, -1.0, 0.0),
            CorrectionLevel::Position,
        );
        apply_pair_correction(&mut a, None, &corr, 0.01);
        assert_relative_eq!(a.position().y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compliance_softens() {
        let mut a = ball(0.0, 1.0);
        let h = 0.1;
        let corr = PairCorrection::at_points(Vec3::UNIT_X, a.position(), Vec3::UNIT_X, CorrectionLevel::Position)
            .with_compliance(h * h);
        apply_pair_correction(&mut a, None, &corr, h);
        // w = 1, α/h² = 1 => half the error is removed
        assert_relative_eq!(a.position().x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_is_noop() {
        let mut a = ball(0.0, 1.0);
        let mut s = RigidBodyBuilder::new(Collider::sphere(0.5)).fixed().build();
        let zero = PairCorrection::angular(Vec3::ZERO, CorrectionLevel::Position);
        assert_eq!(apply_pair_correction(&mut a, None, &zero, 0.01), 0.0);

        let mut t = RigidBodyBuilder::new(Collider::sphere(0.5)).fixed().build();
        let corr = PairCorrection::angular(Vec3::UNIT_Y, CorrectionLevel::Position);
        assert_eq!(apply_pair_correction(&mut s, Some(&mut t), &corr, 0.01), 0.0);
        assert_eq!(s.position(), Vec3::ZERO);
    }

    #[test]
    fn test_pair_mut_rejects_same_index() {
        let mut bodies = vec![ball(0.0, 1.0), ball(1.0, 1.0)];
        assert!(pair_mut(&mut bodies, 1, 1).is_none());
        assert!(pair_mut(&mut bodies, 0, 5).is_none());
        let (b1, b0) = pair_mut(&mut bodies, 1, 0).unwrap();
        assert_relative_eq!(b1.position().x, 1.0);
        assert_relative_eq!(b0.position().x, 0.0);
    }
}
