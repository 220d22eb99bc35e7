//! Constraint System
//!
//! XPBD constraints between a body and another body (or the static world).
//! Every constraint carries an attachment frame per side; the frame of a
//! world-anchored side is given directly in world space.
//!
//! # Primitives
//!
//! - **Attachment**: pins the two frame origins together
//! - **AlignOrientation**: drives the relative rotation of the frames to identity
//! - **AlignAxes**: aligns the frames' X axes
//! - **Swing / twist limits**: keep the angle between reference axes inside an
//!   [`AngleLimit`]
//!
//! Joints ([`JointType`]) are fixed compositions of these primitives.

use crate::body::{BodyId, RigidBody};
use crate::correction::{apply_pair_correction, pair_or_world_mut, CorrectionLevel, PairCorrection};
use crate::joint::JointType;
use crate::math::{Quat, Vec3};
use crate::pose::Pose;
use core::f64::consts::{PI, TAU};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Angular range `[min, max]` in radians with its own compliance
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngleLimit {
    pub min: f64,
    pub max: f64,
    pub compliance: f64,
}

impl AngleLimit {
    /// Rigid limit; the bounds are reordered if given backwards
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
            compliance: 0.0,
        }
    }

    #[inline]
    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// What a constraint enforces
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintKind {
    Attachment,
    AlignOrientation,
    AlignAxes,
    SwingLimit,
    TwistLimit,
    Joint(JointType),
}

// ============================================================================
// Linked bodies
// ============================================================================

/// The bodies of one constraint together with their attachment frames
pub struct Linked<'a> {
    a: &'a mut RigidBody,
    b: Option<&'a mut RigidBody>,
    local_a: Pose,
    local_b: Pose,
}

impl<'a> Linked<'a> {
    /// `local_b` is a world pose when `b` is `None`
    pub fn new(a: &'a mut RigidBody, b: Option<&'a mut RigidBody>, local_a: Pose, local_b: Pose) -> Self {
        Self {
            a,
            b,
            local_a,
            local_b,
        }
    }

    /// Current world attachment frames
    pub fn frames(&self) -> (Pose, Pose) {
        let world_a = self.a.pose().compose(&self.local_a);
        let world_b = match &self.b {
            Some(b) => b.pose().compose(&self.local_b),
            None => self.local_b,
        };
        (world_a, world_b)
    }

    /// Apply one pair correction, returning `|Δλ|`
    #[inline]
    pub fn correct(&mut self, correction: &PairCorrection, h: f64) -> f64 {
        apply_pair_correction(&mut *self.a, self.b.as_deref_mut(), correction, h)
    }

    fn angular_velocities(&self) -> (Vec3, Vec3) {
        (
            self.a.angular_velocity(),
            self.b.as_deref().map_or(Vec3::ZERO, RigidBody::angular_velocity),
        )
    }

    fn point_velocities(&self, pa: Vec3, pb: Vec3) -> (Vec3, Vec3) {
        (
            self.a.velocity_at(pa),
            self.b.as_deref().map_or(Vec3::ZERO, |b| b.velocity_at(pb)),
        )
    }
}

// ============================================================================
// Primitives
// ============================================================================

/// Pin the frame origins together (`corr = p_b − p_a`)
pub fn attachment(link: &mut Linked<'_>, compliance: f64, h: f64) -> f64 {
    let (fa, fb) = link.frames();
    let corr = PairCorrection::at_points(
        fb.position - fa.position,
        fa.position,
        fb.position,
        CorrectionLevel::Position,
    )
    .with_compliance(compliance);
    link.correct(&corr, h)
}

/// Drive the relative frame rotation `q_b·q_a⁻¹` to identity
pub fn align_orientation(link: &mut Linked<'_>, compliance: f64, h: f64) -> f64 {
    let (fa, fb) = link.frames();
    let dq = fb.orientation.mul(fa.orientation.conjugate());
    let mut omega = dq.xyz() * 2.0;
    if dq.w < 0.0 {
        omega = -omega;
    }
    let corr = PairCorrection::angular(omega, CorrectionLevel::Position).with_compliance(compliance);
    link.correct(&corr, h)
}

/// Align the frames' X axes (`corr = a_x × b_x`)
pub fn align_axes(link: &mut Linked<'_>, compliance: f64, h: f64) -> f64 {
    let (fa, fb) = link.frames();
    let omega = fa.orientation.axis_x().cross(fb.orientation.axis_x());
    let corr = PairCorrection::angular(omega, CorrectionLevel::Position).with_compliance(compliance);
    link.correct(&corr, h)
}

/// Signed angle from `a` to `b` about `n`, in `[−π, π]`
pub fn signed_angle(n: Vec3, a: Vec3, b: Vec3) -> f64 {
    let mut phi = a.cross(b).dot(n).clamp(-1.0, 1.0).asin();
    if a.dot(b) < 0.0 {
        phi = PI - phi;
    }
    if phi > PI {
        phi -= TAU;
    }
    if phi < -PI {
        phi += TAU;
    }
    phi
}

/// Keep the angle between `a` and `b` about `n` inside `limit`
///
/// Only corrects when outside; the rotation applied is at most `max_correction`.
pub fn limit_angle(
    link: &mut Linked<'_>,
    n: Vec3,
    a: Vec3,
    b: Vec3,
    limit: &AngleLimit,
    max_correction: f64,
    h: f64,
) -> f64 {
    let phi = signed_angle(n, a, b);
    if limit.contains(phi) {
        return 0.0;
    }
    let target = phi.clamp(limit.min, limit.max);
    let mut omega = Quat::from_axis_angle(n, target).rotate_vec(a).cross(b);
    let magnitude = omega.length();
    if magnitude > max_correction {
        omega = omega * (max_correction / magnitude);
    }
    let corr = PairCorrection::angular(omega, CorrectionLevel::Position).with_compliance(limit.compliance);
    link.correct(&corr, h)
}

/// Cone limit on the angle between the frames' X axes
pub fn swing_limit(link: &mut Linked<'_>, limit: &AngleLimit, h: f64) -> f64 {
    let (fa, fb) = link.frames();
    let (ax, bx) = (fa.orientation.axis_x(), fb.orientation.axis_x());
    // Parallel axes: no swing plane, angle is zero
    let Some(n) = ax.cross(bx).try_normalize(f64::EPSILON) else {
        return 0.0;
    };
    limit_angle(link, n, ax, bx, limit, PI, h)
}

/// Limit on the hinge angle: the Y axes measured about A's X axis
pub fn hinge_limit(link: &mut Linked<'_>, limit: &AngleLimit, h: f64) -> f64 {
    let (fa, fb) = link.frames();
    let n = fa.orientation.axis_x();
    let (ay, by) = (fa.orientation.axis_y(), fb.orientation.axis_y());
    limit_angle(link, n, ay, by, limit, PI, h)
}

/// Limit on the rotation about the mean X axis
///
/// Near anti-parallel X axes the twist axis is ill-conditioned, so the
/// correction is capped to `h` there.
pub fn twist_limit(link: &mut Linked<'_>, limit: &AngleLimit, h: f64) -> f64 {
    let (fa, fb) = link.frames();
    let (n0, n1) = (fa.orientation.axis_x(), fb.orientation.axis_x());
    let Some(n) = (n0 + n1).try_normalize(f64::EPSILON) else {
        return 0.0;
    };
    let project = |v: Vec3| (v - n * n.dot(v)).try_normalize(f64::EPSILON);
    let (Some(a), Some(b)) = (
        project(fa.orientation.axis_y()),
        project(fb.orientation.axis_y()),
    ) else {
        return 0.0;
    };
    let max_correction = if n0.dot(n1) > -0.5 { TAU } else { h };
    limit_angle(link, n, a, b, limit, max_correction, h)
}

// ============================================================================
// Constraint
// ============================================================================

/// A constraint between body A and body B (or the world)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constraint {
    body_a: BodyId,
    body_b: Option<BodyId>,
    local_a: Pose,
    local_b: Pose,
    kind: ConstraintKind,
    compliance: f64,
    positional_damping: f64,
    rotational_damping: f64,
    swing: Option<AngleLimit>,
    twist: Option<AngleLimit>,
    collide_connected: bool,
    /// Sum of `|Δλ|` applied in the last substep
    lambda: f64,
}

impl Constraint {
    /// Constraint of `kind` between two attachment frames
    ///
    /// `local_a` is relative to body A; `local_b` is relative to body B, or a
    /// world pose when `body_b` is `None`.
    pub fn new(
        kind: ConstraintKind,
        body_a: BodyId,
        body_b: Option<BodyId>,
        local_a: Pose,
        local_b: Pose,
    ) -> Self {
        Self {
            body_a,
            body_b,
            local_a,
            local_b,
            kind,
            compliance: 0.0,
            positional_damping: 0.0,
            rotational_damping: 0.0,
            swing: None,
            twist: None,
            collide_connected: false,
            lambda: 0.0,
        }
    }

    pub fn attachment(body_a: BodyId, body_b: Option<BodyId>, local_a: Pose, local_b: Pose) -> Self {
        Self::new(ConstraintKind::Attachment, body_a, body_b, local_a, local_b)
    }

    pub fn align_orientation(body_a: BodyId, body_b: Option<BodyId>, local_a: Pose, local_b: Pose) -> Self {
        Self::new(ConstraintKind::AlignOrientation, body_a, body_b, local_a, local_b)
    }

    pub fn align_axes(body_a: BodyId, body_b: Option<BodyId>, local_a: Pose, local_b: Pose) -> Self {
        Self::new(ConstraintKind::AlignAxes, body_a, body_b, local_a, local_b)
    }

    /// Cone limit on the X axes of the two frames
    pub fn swing_limit(
        body_a: BodyId,
        body_b: Option<BodyId>,
        local_a: Pose,
        local_b: Pose,
        min: f64,
        max: f64,
    ) -> Self {
        let mut c = Self::new(ConstraintKind::SwingLimit, body_a, body_b, local_a, local_b);
        c.set_swing_limits(min, max);
        c
    }

    /// Limit on the twist about the mean X axis
    pub fn twist_limit(
        body_a: BodyId,
        body_b: Option<BodyId>,
        local_a: Pose,
        local_b: Pose,
        min: f64,
        max: f64,
    ) -> Self {
        let mut c = Self::new(ConstraintKind::TwistLimit, body_a, body_b, local_a, local_b);
        c.set_twist_limits(min, max);
        c
    }

    /// Weld: no relative motion of the frames
    pub fn fixed(body_a: BodyId, body_b: Option<BodyId>, local_a: Pose, local_b: Pose) -> Self {
        Self::new(ConstraintKind::Joint(JointType::Fixed), body_a, body_b, local_a, local_b)
    }

    /// Rotation about the shared frame X axis only
    pub fn hinge(body_a: BodyId, body_b: Option<BodyId>, local_a: Pose, local_b: Pose) -> Self {
        Self::new(ConstraintKind::Joint(JointType::Hinge), body_a, body_b, local_a, local_b)
    }

    /// Ball and socket
    pub fn spherical(body_a: BodyId, body_b: Option<BodyId>, local_a: Pose, local_b: Pose) -> Self {
        Self::new(ConstraintKind::Joint(JointType::Spherical), body_a, body_b, local_a, local_b)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn body_a(&self) -> BodyId {
        self.body_a
    }

    #[inline]
    pub fn body_b(&self) -> Option<BodyId> {
        self.body_b
    }

    #[inline]
    pub fn local_frames(&self) -> (Pose, Pose) {
        (self.local_a, self.local_b)
    }

    #[inline]
    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    #[inline]
    pub fn compliance(&self) -> f64 {
        self.compliance
    }

    /// `(positional, rotational)` damping
    #[inline]
    pub fn damping(&self) -> (f64, f64) {
        (self.positional_damping, self.rotational_damping)
    }

    #[inline]
    pub fn swing_limits(&self) -> Option<AngleLimit> {
        self.swing
    }

    #[inline]
    pub fn twist_limits(&self) -> Option<AngleLimit> {
        self.twist
    }

    #[inline]
    pub fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    /// A constraint with infinite compliance does nothing
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.compliance.is_finite()
    }

    /// Accumulated `|Δλ|` of the last substep
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Magnitude of the constraint force over a substep of length `h`
    #[inline]
    pub fn force(&self, h: f64) -> f64 {
        if h > 0.0 {
            self.lambda / (h * h)
        } else {
            0.0
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Inverse stiffness (0 = rigid)
    pub fn set_compliance(&mut self, compliance: f64) {
        self.compliance = compliance.max(0.0);
    }

    /// `1 / compliance`; zero (or negative) stiffness disables the constraint
    pub fn set_stiffness(&mut self, stiffness: f64) {
        self.compliance = if stiffness > 0.0 {
            1.0 / stiffness
        } else {
            f64::INFINITY
        };
    }

    pub fn set_damping(&mut self, positional: f64, rotational: f64) {
        self.positional_damping = positional.max(0.0);
        self.rotational_damping = rotational.max(0.0);
    }

    /// Swing limits; for a hinge these bound the hinge angle
    pub fn set_swing_limits(&mut self, min: f64, max: f64) {
        let compliance = self.swing.map_or(0.0, |l| l.compliance);
        self.swing = Some(AngleLimit {
            compliance,
            ..AngleLimit::new(min, max)
        });
    }

    pub fn set_twist_limits(&mut self, min: f64, max: f64) {
        let compliance = self.twist.map_or(0.0, |l| l.compliance);
        self.twist = Some(AngleLimit {
            compliance,
            ..AngleLimit::new(min, max)
        });
    }

    /// Compliance of the swing limit (no effect until limits are set)
    pub fn set_swing_compliance(&mut self, compliance: f64) {
        if let Some(limit) = &mut self.swing {
            limit.compliance = compliance.max(0.0);
        }
    }

    pub fn set_twist_compliance(&mut self, compliance: f64) {
        if let Some(limit) = &mut self.twist {
            limit.compliance = compliance.max(0.0);
        }
    }

    /// Let the two bodies collide with each other
    pub fn set_collide_connected(&mut self, collide: bool) {
        self.collide_connected = collide;
    }

    // ------------------------------------------------------------------
    // Solve
    // ------------------------------------------------------------------

    #[inline]
    pub(crate) fn reset_lambda(&mut self) {
        self.lambda = 0.0;
    }

    fn link<'b>(&self, bodies: &'b mut [RigidBody]) -> Option<Linked<'b>> {
        let (a, b) = pair_or_world_mut(bodies, self.body_a.index(), self.body_b.map(BodyId::index))?;
        Some(Linked::new(a, b, self.local_a, self.local_b))
    }

    /// Position pass, accumulating the applied multipliers
    pub fn solve_position(&mut self, bodies: &mut [RigidBody], h: f64) {
        if !self.is_enabled() {
            return;
        }
        let Some(mut link) = self.link(bodies) else {
            return;
        };
        let compliance = self.compliance;
        let applied = match self.kind {
            ConstraintKind::Attachment => attachment(&mut link, compliance, h),
            ConstraintKind::AlignOrientation => align_orientation(&mut link, compliance, h),
            ConstraintKind::AlignAxes => align_axes(&mut link, compliance, h),
            ConstraintKind::SwingLimit => self
                .swing
                .map_or(0.0, |limit| swing_limit(&mut link, &limit, h)),
            ConstraintKind::TwistLimit => self
                .twist
                .map_or(0.0, |limit| twist_limit(&mut link, &limit, h)),
            ConstraintKind::Joint(joint) => {
                joint.solve_position(&mut link, compliance, self.swing.as_ref(), self.twist.as_ref(), h)
            }
        };
        self.lambda += applied;
    }

    /// Velocity pass: relative angular and attachment-point damping
    ///
    /// Each correction is scaled by `min(1, damping·h)` so it never removes
    /// more relative velocity than there is.
    pub fn solve_velocity(&self, bodies: &mut [RigidBody], h: f64) {
        if !self.is_enabled() || (self.rotational_damping <= 0.0 && self.positional_damping <= 0.0) {
            return;
        }
        let Some(mut link) = self.link(bodies) else {
            return;
        };

        if self.rotational_damping > 0.0 {
            let (wa, wb) = link.angular_velocities();
            let omega = (wb - wa) * (self.rotational_damping * h).min(1.0);
            link.correct(&PairCorrection::angular(omega, CorrectionLevel::Velocity), h);
        }

        if self.positional_damping > 0.0 {
            let (fa, fb) = link.frames();
            let (va, vb) = link.point_velocities(fa.position, fb.position);
            let dv = (vb - va) * (self.positional_damping * h).min(1.0);
            let corr = PairCorrection::at_points(dv, fa.position, fb.position, CorrectionLevel::Velocity);
            link.correct(&corr, h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyBuilder;
    use crate::collider::Collider;
    use approx::assert_relative_eq;

    const H: f64 = 1.0 / 600.0;

    fn cube_at(position: Vec3, rotation: Quat) -> RigidBody {
        RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.5)))
            .box_mass(1.0, Vec3::splat(0.5))
            .position(position)
            .rotation(rotation)
            .build()
    }

    #[test]
    fn test_world_attachment_pins_center() {
        let mut bodies = vec![cube_at(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY)];
        let mut c = Constraint::attachment(BodyId(0), None, Pose::IDENTITY, Pose::IDENTITY);
        c.solve_position(&mut bodies, H);
        assert_relative_eq!(bodies[0].position().length(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.lambda(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(c.force(H), 2.0 / (H * H), max_relative = 1e-12);
    }

    #[test]
    fn test_align_orientation_converges() {
        let q = Quat::from_axis_angle(Vec3::UNIT_Z, 0.3);
        let mut bodies = vec![cube_at(Vec3::ZERO, q)];
        let mut c = Constraint::align_orientation(BodyId(0), None, Pose::IDENTITY, Pose::IDENTITY);
        for _ in 0..20 {
            c.solve_position(&mut bodies, H);
        }
        assert!(bodies[0].orientation().angle() < 1e-3);
    }

    #[test]
    fn test_align_axes_leaves_rotation_about_x() {
        let q = Quat::from_axis_angle(Vec3::UNIT_X, 0.8).mul(Quat::from_axis_angle(Vec3::UNIT_Y, 0.2));
        let mut bodies = vec![cube_at(Vec3::ZERO, q)];
        let mut c = Constraint::align_axes(BodyId(0), None, Pose::IDENTITY, Pose::IDENTITY);
        for _ in 0..50 {
            c.solve_position(&mut bodies, H);
        }
        let x = bodies[0].orientation().axis_x();
        assert_relative_eq!(x.x, 1.0, epsilon = 1e-4);
        // free twist survives
        assert!(bodies[0].orientation().angle() > 0.5);
    }

    #[test]
    fn test_signed_angle() {
        let n = Vec3::UNIT_Z;
        assert_relative_eq!(signed_angle(n, Vec3::UNIT_X, Vec3::UNIT_Y), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(signed_angle(n, Vec3::UNIT_Y, Vec3::UNIT_X), -PI / 2.0, epsilon = 1e-12);
        let back = Vec3::new(-1.0, 0.1, 0.0).normalize();
        assert!(signed_angle(n, Vec3::UNIT_X, back) > 2.9);
    }

    #[test]
    fn test_hinge_limit_clamps_angle() {
        let q = Quat::from_axis_angle(Vec3::UNIT_X, 0.5);
        let mut bodies = vec![cube_at(Vec3::ZERO, q)];
        let mut c = Constraint::hinge(BodyId(0), None, Pose::IDENTITY, Pose::IDENTITY);
        c.set_swing_limits(-0.1, 0.1);
        for _ in 0..50 {
            c.solve_position(&mut bodies, H);
        }
        let qa = bodies[0].orientation();
        let angle = signed_angle(qa.axis_x(), qa.axis_y(), Vec3::UNIT_Y);
        assert!(angle.abs() <= 0.1 + 1e-3, "hinge angle {}", angle);
    }

    #[test]
    fn test_twist_correction_capped_near_antiparallel() {
        let q = Quat::from_axis_angle(Vec3::UNIT_Z, 2.5).mul(Quat::from_axis_angle(Vec3::UNIT_X, 1.0));
        let mut bodies = vec![cube_at(Vec3::ZERO, q)];
        let h = 0.01;
        let mut c = Constraint::twist_limit(BodyId(0), None, Pose::IDENTITY, Pose::IDENTITY, -0.1, 0.1);
        c.solve_position(&mut bodies, h);
        let moved = bodies[0].orientation().mul(q.conjugate()).angle();
        assert!(moved > 0.0);
        assert!(moved <= h + 1e-9);
    }

    #[test]
    fn test_zero_stiffness_disables() {
        let mut bodies = vec![cube_at(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY)];
        let mut c = Constraint::attachment(BodyId(0), None, Pose::IDENTITY, Pose::IDENTITY);
        c.set_stiffness(0.0);
        assert!(!c.is_enabled());
        c.solve_position(&mut bodies, H);
        assert_relative_eq!(bodies[0].position().x, 1.0);
    }

    #[test]
    fn test_stiffness_is_inverse_compliance() {
        let mut c = Constraint::spherical(BodyId(0), Some(BodyId(1)), Pose::IDENTITY, Pose::IDENTITY);
        c.set_stiffness(100.0);
        assert_relative_eq!(c.compliance(), 0.01);
        c.set_twist_compliance(0.5);
        assert!(c.twist_limits().is_none());
        c.set_twist_limits(0.4, -0.4);
        c.set_twist_compliance(0.5);
        let limit = c.twist_limits().unwrap();
        assert_eq!((limit.min, limit.max, limit.compliance), (-0.4, 0.4, 0.5));
    }

    #[test]
    fn test_rotational_damping_reduces_relative_spin() {
        let spinning = RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.5)))
            .box_mass(1.0, Vec3::splat(0.5))
            .angular_velocity(Vec3::new(0.0, 10.0, 0.0))
            .build();
        let mut bodies = vec![spinning];
        let mut c = Constraint::spherical(BodyId(0), None, Pose::IDENTITY, Pose::IDENTITY);
        c.set_damping(0.0, 60.0);
        c.solve_velocity(&mut bodies, 0.01);
        // min(1, 60 · 0.01) = 0.6 of the relative spin removed
        assert_relative_eq!(bodies[0].angular_velocity().y, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_body_pair_attachment_meets_halfway() {
        let mut bodies = vec![
            cube_at(Vec3::ZERO, Quat::IDENTITY),
            cube_at(Vec3::new(3.0, 0.0, 0.0), Quat::IDENTITY),
        ];
        let mut c = Constraint::attachment(BodyId(0), Some(BodyId(1)), Pose::IDENTITY, Pose::IDENTITY);
        c.solve_position(&mut bodies, H);
        assert_relative_eq!(bodies[0].position().x, 1.5, epsilon = 1e-12);
        assert_relative_eq!(bodies[1].position().x, 1.5, epsilon = 1e-12);
    }
}
