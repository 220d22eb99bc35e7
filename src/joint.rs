//! Joint Compositions
//!
//! Joints are sequences of constraint primitives solved in one position pass:
//! the angular parts first, then the attachment of the frame origins.
//!
//! # Joint Types
//!
//! - **Fixed**: 0-DOF weld (orientation + attachment)
//! - **Hinge**: 1-DOF rotation about the frame X axis with an optional hinge
//!   angle limit (door, knee)
//! - **Spherical**: 3-DOF ball and socket with optional swing cone and twist
//!   limits (shoulder, hip)

use crate::constraint::{
    align_axes, align_orientation, attachment, hinge_limit, swing_limit, twist_limit, AngleLimit,
    Linked,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Joint type enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointType {
    Fixed,
    Hinge,
    Spherical,
}

impl JointType {
    /// Solve the joint's primitives in order, returning the summed `|Δλ|`
    ///
    /// For a hinge the swing limit bounds the hinge angle; a spherical joint
    /// uses both limits.
    pub fn solve_position(
        self,
        link: &mut Linked<'_>,
        compliance: f64,
        swing: Option<&AngleLimit>,
        twist: Option<&AngleLimit>,
        h: f64,
    ) -> f64 {
        let mut lambda = 0.0;
        match self {
            JointType::Fixed => {
                lambda += align_orientation(link, compliance, h);
            }
            JointType::Hinge => {
                lambda += align_axes(link, compliance, h);
                if let Some(limit) = swing {
                    lambda += hinge_limit(link, limit, h);
                }
            }
            JointType::Spherical => {
                if let Some(limit) = swing {
                    lambda += swing_limit(link, limit, h);
                }
                if let Some(limit) = twist {
                    lambda += twist_limit(link, limit, h);
                }
            }
        }
        lambda + attachment(link, compliance, h)
    }

    /// Rotational degrees of freedom left free by the joint
    #[inline]
    pub fn rotational_dof(self) -> usize {
        match self {
            JointType::Fixed => 0,
            JointType::Hinge => 1,
            JointType::Spherical => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyId, RigidBody, RigidBodyBuilder};
    use crate::collider::Collider;
    use crate::constraint::Constraint;
    use crate::math::{Quat, Vec3};
    use crate::pose::Pose;
    use approx::assert_relative_eq;

    const H: f64 = 1.0 / 600.0;

    fn cube(position: Vec3, rotation: Quat) -> RigidBody {
        RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.25)))
            .box_mass(1.0, Vec3::splat(0.25))
            .position(position)
            .rotation(rotation)
            .build()
    }

    fn anchor() -> RigidBody {
        RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.25)))
            .fixed()
            .build()
    }

    fn relax(c: &mut Constraint, bodies: &mut [RigidBody], passes: usize) {
        for _ in 0..passes {
            c.solve_position(bodies, H);
        }
    }

    #[test]
    fn test_fixed_joint_welds() {
        let tilt = Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.4);
        let mut bodies = vec![anchor(), cube(Vec3::new(1.3, 0.2, 0.0), tilt)];
        let mut c = Constraint::fixed(
            BodyId(0),
            Some(BodyId(1)),
            Pose::from_position(Vec3::new(0.5, 0.0, 0.0)),
            Pose::from_position(Vec3::new(-0.5, 0.0, 0.0)),
        );
        relax(&mut c, &mut bodies, 100);
        let body = &bodies[1];
        assert!(body.orientation().angle() < 1e-3);
        assert_relative_eq!(body.position().x, 1.0, epsilon = 1e-3);
        assert_relative_eq!(body.position().y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_hinge_keeps_axis_and_pivot() {
        let tilt = Quat::from_axis_angle(Vec3::UNIT_Y, 0.3).mul(Quat::from_axis_angle(Vec3::UNIT_X, 0.7));
        let mut bodies = vec![anchor(), cube(Vec3::new(0.1, -1.0, 0.0), tilt)];
        let mut c = Constraint::hinge(
            BodyId(0),
            Some(BodyId(1)),
            Pose::IDENTITY,
            Pose::from_position(Vec3::new(0.0, 1.0, 0.0)),
        );
        relax(&mut c, &mut bodies, 200);
        let (_, local_b) = c.local_frames();
        let pivot = bodies[1].pose().transform_point(local_b.position);
        assert!(pivot.length() < 1e-3, "pivot drifted to {:?}", pivot);
        assert_relative_eq!(bodies[1].orientation().axis_x().x, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_spherical_allows_free_rotation() {
        let tilt = Quat::from_axis_angle(Vec3::UNIT_Z, 0.9);
        let mut bodies = vec![anchor(), cube(Vec3::ZERO, tilt)];
        let mut c = Constraint::spherical(BodyId(0), Some(BodyId(1)), Pose::IDENTITY, Pose::IDENTITY);
        relax(&mut c, &mut bodies, 10);
        assert_relative_eq!(bodies[1].orientation().angle(), 0.9, epsilon = 1e-9);
        assert_eq!(c.lambda(), 0.0);
    }

    #[test]
    fn test_spherical_swing_cone() {
        let tilt = Quat::from_axis_angle(Vec3::UNIT_Z, 0.9);
        let mut bodies = vec![anchor(), cube(Vec3::ZERO, tilt)];
        let mut c = Constraint::spherical(BodyId(0), Some(BodyId(1)), Pose::IDENTITY, Pose::IDENTITY);
        c.set_swing_limits(-0.25, 0.25);
        relax(&mut c, &mut bodies, 50);
        let swing = bodies[1].orientation().axis_x().dot(Vec3::UNIT_X).clamp(-1.0, 1.0).acos();
        assert!(swing <= 0.25 + 1e-3, "swing {}", swing);
    }

    #[test]
    fn test_rotational_dof() {
        assert_eq!(JointType::Fixed.rotational_dof(), 0);
        assert_eq!(JointType::Hinge.rotational_dof(), 1);
        assert_eq!(JointType::Spherical.rotational_dof(), 3);
    }
}
