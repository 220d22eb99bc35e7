//! XPBD (Extended Position Based Dynamics) Solver
//!
//! Runs one fixed-size frame of `substeps` substeps over a body slice:
//!
//! 1. integrate every body (collider poses follow)
//! 2. build contacts for the frame's broad-phase pairs
//! 3. `position_iterations` passes over contacts and constraints
//! 4. derive velocities from the pose change
//! 5. velocity pass: friction, restitution, constraint and body damping
//!
//! Forces are cleared once the frame is done.
//!
//! # Parallelism
//!
//! With the `parallel` feature the per-body integrate/update loops run on the
//! rayon pool. Contacts and constraints are always solved sequentially
//! (Gauss-Seidel).

use crate::body::RigidBody;
use crate::broadphase::CollisionPair;
use crate::constraint::Constraint;
use crate::contact::{ContactRules, ContactSet};
use crate::error::PhysicsError;
use crate::material::CombineRule;
use crate::math::Vec3;
use crate::sleeping::SleepConfig;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Gravity of a new world (m/s²)
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

// ============================================================================
// Configuration
// ============================================================================

/// XPBD solver configuration
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Simulated frames per second; the frame time is `1 / frame_rate`
    pub frame_rate: f64,
    /// Substeps per frame
    pub substeps: usize,
    /// Position passes over contacts and constraints per substep
    pub position_iterations: usize,
    /// Constant broad-phase AABB margin (m)
    pub contact_margin: f64,
    pub friction_combine: CombineRule,
    pub restitution_combine: CombineRule,
    /// Relative speed above which a sleeping body in a pair is woken (m/s)
    pub wake_threshold: f64,
    /// Upper bound on frames run by one `World::step`; further backlog is dropped
    pub max_frames_per_step: usize,
    pub sleep: SleepConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            substeps: 10,
            position_iterations: 1,
            contact_margin: 0.01,
            friction_combine: CombineRule::Average,
            restitution_combine: CombineRule::Max,
            wake_threshold: 0.1,
            max_frames_per_step: 5,
            sleep: SleepConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Check every field, reporting the first invalid one
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let invalid = |reason| Err(PhysicsError::InvalidConfiguration { reason });
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return invalid("frame_rate must be finite and > 0");
        }
        if self.substeps == 0 {
            return invalid("substeps must be > 0");
        }
        if self.position_iterations == 0 {
            return invalid("position_iterations must be > 0");
        }
        if !(self.contact_margin.is_finite() && self.contact_margin >= 0.0) {
            return invalid("contact_margin must be finite and >= 0");
        }
        if !(self.wake_threshold.is_finite() && self.wake_threshold >= 0.0) {
            return invalid("wake_threshold must be finite and >= 0");
        }
        if self.max_frames_per_step == 0 {
            return invalid("max_frames_per_step must be > 0");
        }
        let sleep = &self.sleep;
        if !(sleep.linear_threshold >= 0.0 && sleep.angular_threshold >= 0.0) {
            return invalid("sleep thresholds must be >= 0");
        }
        if !(sleep.sleep_duration.is_finite() && sleep.sleep_duration >= 0.0) {
            return invalid("sleep_duration must be finite and >= 0");
        }
        if !(0.0..=1.0).contains(&sleep.sleep_damping) {
            return invalid("sleep_damping must be in [0, 1]");
        }
        Ok(())
    }

    /// `T = 1 / frame_rate`
    #[inline]
    pub fn frame_time(&self) -> f64 {
        1.0 / self.frame_rate
    }

    /// `h = T / substeps`
    #[inline]
    pub fn substep_time(&self) -> f64 {
        self.frame_time() / self.substeps as f64
    }

    #[inline]
    pub fn contact_rules(&self) -> ContactRules {
        ContactRules {
            friction: self.friction_combine,
            restitution: self.restitution_combine,
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

#[inline]
fn integrate_bodies(bodies: &mut [RigidBody], h: f64, gravity: Vec3) {
    #[cfg(feature = "parallel")]
    bodies.par_iter_mut().for_each(|body| body.integrate(h, gravity));

    #[cfg(not(feature = "parallel"))]
    bodies.iter_mut().for_each(|body| body.integrate(h, gravity));
}

#[inline]
fn update_bodies(bodies: &mut [RigidBody], h: f64) {
    #[cfg(feature = "parallel")]
    bodies.par_iter_mut().for_each(|body| body.update(h));

    #[cfg(not(feature = "parallel"))]
    bodies.iter_mut().for_each(|body| body.update(h));
}

/// One substep
fn substep(
    bodies: &mut [RigidBody],
    constraints: &mut [Constraint],
    pairs: &[CollisionPair],
    gravity: Vec3,
    config: &SolverConfig,
) -> ContactSet {
    let h = config.substep_time();

    integrate_bodies(bodies, h, gravity);

    let mut contacts = ContactSet::build(bodies, pairs, &config.contact_rules());
    for constraint in constraints.iter_mut() {
        constraint.reset_lambda();
    }

    for _ in 0..config.position_iterations {
        contacts.solve_position(bodies, h);
        for constraint in constraints.iter_mut() {
            constraint.solve_position(bodies, h);
        }
    }

    update_bodies(bodies, h);

    contacts.solve_velocity(bodies, h, gravity);
    for constraint in constraints.iter() {
        constraint.solve_velocity(bodies, h);
    }
    for body in bodies.iter_mut() {
        body.apply_damping(h);
    }

    contacts
}

/// Run one frame, returning the contacts of its last substep
pub fn solve_frame(
    bodies: &mut [RigidBody],
    constraints: &mut [Constraint],
    pairs: &[CollisionPair],
    gravity: Vec3,
    config: &SolverConfig,
) -> ContactSet {
    let mut contacts = ContactSet::default();
    for _ in 0..config.substeps {
        contacts = substep(bodies, constraints, pairs, gravity, config);
    }
    for body in bodies.iter_mut() {
        body.clear_forces();
        body.sync_collider();
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyId, RigidBodyBuilder};
    use crate::collider::Collider;
    use crate::pose::Pose;
    use approx::assert_relative_eq;

    fn ball(position: Vec3) -> RigidBody {
        RigidBodyBuilder::new(Collider::sphere(0.5))
            .sphere_mass(1.0, 0.5)
            .position(position)
            .build()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.substep_time(), 1.0 / 600.0, epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let bad = [
            SolverConfig { frame_rate: 0.0, ..Default::default() },
            SolverConfig { frame_rate: f64::NAN, ..Default::default() },
            SolverConfig { substeps: 0, ..Default::default() },
            SolverConfig { position_iterations: 0, ..Default::default() },
            SolverConfig { contact_margin: -1.0, ..Default::default() },
            SolverConfig { max_frames_per_step: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(PhysicsError::InvalidConfiguration { .. })
            ));
        }

        let mut config = SolverConfig::default();
        config.sleep.sleep_damping = 1.5;
        assert_eq!(
            config.validate(),
            Err(PhysicsError::InvalidConfiguration {
                reason: "sleep_damping must be in [0, 1]"
            })
        );
    }

    #[test]
    fn test_free_fall_one_second() {
        let config = SolverConfig::default();
        let mut bodies = vec![ball(Vec3::ZERO)];
        for _ in 0..60 {
            solve_frame(&mut bodies, &mut [], &[], DEFAULT_GRAVITY, &config);
        }
        assert_relative_eq!(bodies[0].position().y, -0.5 * 9.81, max_relative = 1e-2);
        assert_relative_eq!(bodies[0].velocity().y, -9.81, max_relative = 1e-6);
    }

    #[test]
    fn test_forces_cleared_after_frame() {
        let config = SolverConfig::default();
        let mut bodies = vec![ball(Vec3::ZERO)];
        bodies[0].apply_force(Vec3::new(6.0, 0.0, 0.0));
        solve_frame(&mut bodies, &mut [], &[], Vec3::ZERO, &config);
        assert_eq!(bodies[0].force(), Vec3::ZERO);
        // a = 6 m/s² over 1/60 s
        assert_relative_eq!(bodies[0].velocity().x, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_constraint_lambda_reported() {
        let config = SolverConfig::default();
        let mut bodies = vec![ball(Vec3::new(1.0, 0.0, 0.0))];
        let mut constraints = vec![Constraint::attachment(
            BodyId(0),
            None,
            Pose::IDENTITY,
            Pose::from_position(Vec3::new(1.0, 0.0, 0.0)),
        )];
        solve_frame(&mut bodies, &mut constraints, &[], DEFAULT_GRAVITY, &config);
        // holding the ball against gravity: λ/h² ≈ m·g
        let force = constraints[0].force(config.substep_time());
        assert_relative_eq!(force, 9.81, max_relative = 1e-3);
    }
}
