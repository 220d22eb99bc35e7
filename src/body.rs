//! Rigid Bodies
//!
//! Per-body dynamic state and the XPBD body operations:
//!
//! - [`RigidBody::integrate`]: semi-implicit Euler prediction of the substep pose
//! - [`RigidBody::update`]: velocities derived from the corrected pose
//! - [`RigidBody::inverse_mass_along`]: generalized inverse mass of a correction
//! - [`RigidBody::apply_correction`]: position- or velocity-level correction
//!
//! Bodies are created with [`RigidBodyBuilder`] and owned by a
//! [`World`](crate::world::World), which hands back a [`BodyId`].

use crate::collider::Collider;
use crate::correction::CorrectionLevel;
use crate::mass_properties::MassProperties;
use crate::math::{Quat, Vec3};
use crate::pose::Pose;
use crate::sleeping::{SleepData, SleepState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound on the rotation angle of a single integration substep (radians)
pub const MAX_ROTATION_PER_SUBSTEP: f64 = 0.5;

/// Handle of a body inside its world
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    /// Index into [`World::bodies`](crate::world::World::bodies)
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Opaque handle to a host-side visual mesh; never interpreted by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshHandle(pub u64);

// ============================================================================
// Body Type
// ============================================================================

/// Type of rigid body
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum BodyType {
    /// Moved by physics (gravity, constraints, impulses)
    #[default]
    Dynamic = 0,
    /// Never moves
    Static = 1,
    /// Moved by its own velocity, pushes dynamic bodies but is not affected by them
    Kinematic = 2,
}

// ============================================================================
// Rigid Body
// ============================================================================

/// Rigid body state
#[derive(Clone, Debug)]
pub struct RigidBody {
    collider: Collider,
    mesh: Option<MeshHandle>,
    pose: Pose,
    prev_pose: Pose,
    velocity: Vec3,
    angular_velocity: Vec3,
    prev_velocity: Vec3,
    prev_angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
    /// Inverse mass (0 = immovable)
    inv_mass: f64,
    /// Inverse inertia (diagonal, body-local)
    inv_inertia: Vec3,
    body_type: BodyType,
    collision_enabled: bool,
    sleep: SleepData,
    can_sleep: bool,
    friction: f64,
    restitution: f64,
    gravity_scale: f64,
    linear_damping: f64,
    angular_damping: f64,
}

impl RigidBody {
    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    #[inline]
    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Pose at the start of the current substep
    #[inline]
    pub fn previous_pose(&self) -> &Pose {
        &self.prev_pose
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    #[inline]
    pub fn orientation(&self) -> Quat {
        self.pose.orientation
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// World-frame angular velocity
    #[inline]
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Linear velocity at the start of the current substep
    #[inline]
    pub fn previous_velocity(&self) -> Vec3 {
        self.prev_velocity
    }

    #[inline]
    pub fn previous_angular_velocity(&self) -> Vec3 {
        self.prev_angular_velocity
    }

    /// Force accumulated since the last frame
    #[inline]
    pub fn force(&self) -> Vec3 {
        self.force
    }

    #[inline]
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Configured inverse mass (0 for static and kinematic bodies)
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Configured body-local diagonal inverse inertia
    #[inline]
    pub fn inverse_inertia(&self) -> Vec3 {
        self.inv_inertia
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    /// Dynamic and awake: corrections and integration affect it
    #[inline]
    pub fn is_movable(&self) -> bool {
        self.is_dynamic() && !self.sleep.is_sleeping()
    }

    #[inline]
    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    #[inline]
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision_enabled = enabled;
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleep.is_sleeping()
    }

    #[inline]
    pub fn sleep_state(&self) -> SleepState {
        self.sleep.state
    }

    /// Seconds the body has been idle
    #[inline]
    pub fn idle_time(&self) -> f64 {
        self.sleep.idle_time
    }

    #[inline]
    pub fn can_sleep(&self) -> bool {
        self.can_sleep && self.is_dynamic()
    }

    /// Allow or forbid sleeping; forbidding wakes the body
    pub fn set_can_sleep(&mut self, can_sleep: bool) {
        self.can_sleep = can_sleep;
        if !can_sleep {
            self.wake_up();
        }
    }

    #[inline]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    #[inline]
    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction.max(0.0);
    }

    #[inline]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    #[inline]
    pub fn set_restitution(&mut self, restitution: f64) {
        self.restitution = restitution.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn gravity_scale(&self) -> f64 {
        self.gravity_scale
    }

    #[inline]
    pub fn set_gravity_scale(&mut self, scale: f64) {
        self.gravity_scale = scale;
    }

    /// `(linear, angular)` damping rates in 1/s
    #[inline]
    pub fn damping(&self) -> (f64, f64) {
        (self.linear_damping, self.angular_damping)
    }

    // ------------------------------------------------------------------
    // User-driven state changes (all wake the body)
    // ------------------------------------------------------------------

    /// Teleport to `position`
    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
        self.sync_collider();
        self.wake_up();
    }

    /// Replace the orientation (normalized)
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.pose.set_orientation(orientation);
        self.sync_collider();
        self.wake_up();
    }

    /// Replace the whole pose (orientation normalized)
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = Pose::new(pose.position, pose.orientation);
        self.sync_collider();
        self.wake_up();
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity = velocity;
        self.wake_up();
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: Vec3) {
        if self.is_static() {
            return;
        }
        self.angular_velocity = angular_velocity;
        self.wake_up();
    }

    /// Add a force at the center of mass for the next frame
    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_dynamic() {
            self.force += force;
            self.wake_up();
        }
    }

    /// Add a force at a world point (also produces torque)
    pub fn apply_force_at(&mut self, force: Vec3, point: Vec3) {
        if self.is_dynamic() {
            self.force += force;
            self.torque += (point - self.pose.position).cross(force);
            self.wake_up();
        }
    }

    /// Add a world-frame torque for the next frame
    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_dynamic() {
            self.torque += torque;
            self.wake_up();
        }
    }

    /// Apply impulse at center of mass
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if self.is_dynamic() {
            self.wake_up();
            self.velocity += impulse * self.inv_mass;
        }
    }

    /// Apply impulse at world-space point
    pub fn apply_impulse_at(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_dynamic() {
            self.wake_up();
            self.velocity += impulse * self.inv_mass;
            let r = point - self.pose.position;
            self.angular_velocity += self.world_inverse_inertia(r.cross(impulse));
        }
    }

    /// Zero the accumulated force and torque
    #[inline]
    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// Wake the body if it is asleep
    #[inline]
    pub fn wake_up(&mut self) {
        if self.is_dynamic() {
            self.sleep.wake();
        }
    }

    /// Put the body to sleep, zeroing its velocities
    pub(crate) fn fall_asleep(&mut self) {
        if self.is_dynamic() {
            self.sleep.state = SleepState::Sleeping;
            self.velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
    }

    #[inline]
    pub(crate) fn sleep_data_mut(&mut self) -> &mut SleepData {
        &mut self.sleep
    }

    /// Scale both velocities (sleep damping)
    #[inline]
    pub(crate) fn scale_velocities(&mut self, factor: f64) {
        self.velocity *= factor;
        self.angular_velocity *= factor;
    }

    /// `(½|v|², ½|ω|²)`
    #[inline]
    pub fn kinetic_energy_per_mass(&self) -> (f64, f64) {
        (
            0.5 * self.velocity.length_squared(),
            0.5 * self.angular_velocity.length_squared(),
        )
    }

    /// Copy the body pose into the collider's cached pose
    #[inline]
    pub fn sync_collider(&mut self) {
        self.collider.update_pose(self.pose);
    }

    /// True when pose and velocities are finite
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.velocity.is_finite() && self.angular_velocity.is_finite()
    }

    // ------------------------------------------------------------------
    // XPBD operations
    // ------------------------------------------------------------------

    /// `R · (I⁻¹ ⊙ Rᵀ v)`: body-local inverse inertia applied to a world vector
    #[inline]
    pub fn world_inverse_inertia(&self, v: Vec3) -> Vec3 {
        let local = self.pose.inverse_rotate(v);
        self.pose.rotate(local.mul_elem(self.inv_inertia))
    }

    /// World velocity of a point rigidly attached to the body
    #[inline]
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(point - self.pose.position)
    }

    /// Predict the substep pose (semi-implicit Euler)
    ///
    /// Snapshots the previous pose and velocities first. Static and sleeping
    /// bodies only snapshot; kinematic bodies advance by their own velocity.
    /// The collider follows the predicted pose.
    pub fn integrate(&mut self, h: f64, gravity: Vec3) {
        self.prev_pose = self.pose;
        self.prev_velocity = self.velocity;
        self.prev_angular_velocity = self.angular_velocity;

        match self.body_type {
            BodyType::Static => return,
            BodyType::Dynamic if self.sleep.is_sleeping() => return,
            BodyType::Dynamic => {
                self.velocity += (gravity * self.gravity_scale + self.force * self.inv_mass) * h;
                self.angular_velocity += self.world_inverse_inertia(self.torque) * h;
            }
            BodyType::Kinematic => {}
        }

        self.pose.position += self.velocity * h;

        let mut rotation = self.angular_velocity * h;
        let angle = rotation.length();
        if angle > MAX_ROTATION_PER_SUBSTEP {
            rotation = rotation * (MAX_ROTATION_PER_SUBSTEP / angle);
        }
        self.pose.rotate_by(rotation);
        self.sync_collider();
    }

    /// Derive velocities from the pose change of the substep
    pub fn update(&mut self, h: f64) {
        if !self.is_movable() || h <= 0.0 {
            return;
        }
        self.velocity = (self.pose.position - self.prev_pose.position) / h;

        let dq = self.pose.orientation.mul(self.prev_pose.orientation.conjugate());
        let omega = dq.xyz() * (2.0 / h);
        self.angular_velocity = if dq.w >= 0.0 { omega } else { -omega };
    }

    /// Generalized inverse mass along `normal`
    ///
    /// With a point: `m⁻¹ + (r×n)ᵀ I⁻¹ (r×n)`; without: `nᵀ I⁻¹ n`. Zero for
    /// bodies that cannot move.
    pub fn inverse_mass_along(&self, normal: Vec3, point: Option<Vec3>) -> f64 {
        if !self.is_movable() {
            return 0.0;
        }
        let (axis, linear) = match point {
            Some(p) => ((p - self.pose.position).cross(normal), self.inv_mass),
            None => (normal, 0.0),
        };
        let local = self.pose.inverse_rotate(axis);
        linear + local.dot(local.mul_elem(self.inv_inertia))
    }

    /// Apply a correction computed by the pair primitive
    ///
    /// With a point the correction acts linearly at that point (and angularly
    /// through the lever arm); without, it is purely rotational.
    pub fn apply_correction(&mut self, correction: Vec3, point: Option<Vec3>, level: CorrectionLevel) {
        if !self.is_movable() {
            return;
        }
        let angular = match point {
            Some(p) => {
                let linear = correction * self.inv_mass;
                match level {
                    CorrectionLevel::Position => self.pose.position += linear,
                    CorrectionLevel::Velocity => self.velocity += linear,
                }
                self.world_inverse_inertia((p - self.pose.position).cross(correction))
            }
            None => self.world_inverse_inertia(correction),
        };
        match level {
            CorrectionLevel::Position => self.pose.rotate_by(angular),
            CorrectionLevel::Velocity => self.angular_velocity += angular,
        }
    }

    /// Exponential-ish linear/angular velocity damping over a substep
    pub fn apply_damping(&mut self, h: f64) {
        if !self.is_movable() {
            return;
        }
        if self.linear_damping > 0.0 {
            self.velocity *= (1.0 - self.linear_damping * h).max(0.0);
        }
        if self.angular_damping > 0.0 {
            self.angular_velocity *= (1.0 - self.angular_damping * h).max(0.0);
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Clone, Copy, Debug)]
enum MassSpec {
    /// Total mass, inertia from the collider
    Mass(f64),
    Explicit(MassProperties),
}

/// Fluent constructor for [`RigidBody`]
///
/// ```
/// use xpbd_rigid::prelude::*;
///
/// let crate_body = RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.5)))
///     .box_mass(10.0, Vec3::splat(0.5))
///     .position(Vec3::new(0.0, 3.0, 0.0))
///     .friction(0.6)
///     .build();
/// assert!(crate_body.is_dynamic());
/// ```
#[derive(Clone, Debug)]
pub struct RigidBodyBuilder {
    collider: Collider,
    mass: MassSpec,
    body_type: BodyType,
    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
    angular_velocity: Vec3,
    friction: f64,
    restitution: f64,
    can_sleep: bool,
    collision_enabled: bool,
    gravity_scale: f64,
    linear_damping: f64,
    angular_damping: f64,
    mesh: Option<MeshHandle>,
}

impl RigidBodyBuilder {
    /// Dynamic body of mass 1 with the given collider
    pub fn new(collider: Collider) -> Self {
        Self {
            collider,
            mass: MassSpec::Mass(1.0),
            body_type: BodyType::Dynamic,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            friction: 0.3,
            restitution: 0.2,
            can_sleep: true,
            collision_enabled: true,
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            mesh: None,
        }
    }

    /// Replace the collider
    pub fn collider(mut self, collider: Collider) -> Self {
        self.collider = collider;
        self
    }

    /// Mass and box inertia for the given half-extents
    pub fn box_mass(mut self, mass: f64, half_extents: Vec3) -> Self {
        self.mass = MassSpec::Explicit(MassProperties::cuboid(mass, half_extents));
        self
    }

    /// Mass and cylinder inertia (axis along local Y)
    pub fn cylinder_mass(mut self, mass: f64, radius: f64, height: f64) -> Self {
        self.mass = MassSpec::Explicit(MassProperties::cylinder(mass, radius, height));
        self
    }

    /// Mass and solid-sphere inertia
    pub fn sphere_mass(mut self, mass: f64, radius: f64) -> Self {
        self.mass = MassSpec::Explicit(MassProperties::sphere(mass, radius));
        self
    }

    /// Mass with inertia derived from the collider
    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = MassSpec::Mass(mass);
        self
    }

    /// Explicit mass properties
    pub fn mass_properties(mut self, props: MassProperties) -> Self {
        self.mass = MassSpec::Explicit(props);
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn friction(mut self, friction: f64) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    pub fn restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    pub fn body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    /// Static body
    pub fn fixed(self) -> Self {
        self.body_type(BodyType::Static)
    }

    pub fn kinematic(self) -> Self {
        self.body_type(BodyType::Kinematic)
    }

    pub fn can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn collision_enabled(mut self, enabled: bool) -> Self {
        self.collision_enabled = enabled;
        self
    }

    /// Gravity scale multiplier (1.0 = normal, 0.0 = no gravity, 2.0 = double)
    pub fn gravity_scale(mut self, scale: f64) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Linear and angular velocity damping rates (1/s)
    pub fn damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
        self
    }

    pub fn mesh(mut self, mesh: MeshHandle) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn build(self) -> RigidBody {
        let props = match self.mass {
            MassSpec::Mass(m) => MassProperties::for_collider(m, &self.collider),
            MassSpec::Explicit(p) => p,
        };
        let (inv_mass, inv_inertia) = match self.body_type {
            BodyType::Dynamic => (props.inverse_mass(), props.inverse_inertia()),
            BodyType::Static | BodyType::Kinematic => (0.0, Vec3::ZERO),
        };
        let (velocity, angular_velocity) = match self.body_type {
            BodyType::Static => (Vec3::ZERO, Vec3::ZERO),
            _ => (self.velocity, self.angular_velocity),
        };
        let pose = Pose::new(self.position, self.rotation);

        let mut collider = self.collider;
        collider.update_pose(pose);

        RigidBody {
            collider,
            mesh: self.mesh,
            pose,
            prev_pose: pose,
            velocity,
            angular_velocity,
            prev_velocity: velocity,
            prev_angular_velocity: angular_velocity,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            inv_mass,
            inv_inertia,
            body_type: self.body_type,
            collision_enabled: self.collision_enabled,
            sleep: SleepData::new(),
            can_sleep: self.can_sleep,
            friction: self.friction,
            restitution: self.restitution,
            gravity_scale: self.gravity_scale,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> RigidBodyBuilder {
        RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.5))).box_mass(1.0, Vec3::splat(0.5))
    }

    #[test]
    fn test_static_body_has_no_inverse_mass() {
        let body = unit_box().fixed().velocity(Vec3::ONE).build();
        assert_eq!(body.inverse_mass(), 0.0);
        assert_eq!(body.inverse_inertia(), Vec3::ZERO);
        assert_eq!(body.velocity(), Vec3::ZERO);
        assert_eq!(body.inverse_mass_along(Vec3::UNIT_Y, Some(Vec3::ONE)), 0.0);
    }

    #[test]
    fn test_integrate_free_fall() {
        let mut body = unit_box().build();
        let g = Vec3::new(0.0, -10.0, 0.0);
        body.integrate(0.1, g);
        assert_relative_eq!(body.velocity().y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(body.position().y, -0.1, epsilon = 1e-12);
        assert_eq!(body.previous_pose().position, Vec3::ZERO);
    }

    #[test]
    fn test_integrate_clamps_rotation() {
        let mut body = unit_box().angular_velocity(Vec3::new(0.0, 100.0, 0.0)).build();
        body.integrate(0.1, Vec3::ZERO);
        let rotated = body.orientation().mul(body.previous_pose().orientation.conjugate());
        // first-order update of a 0.5 rad rotation vector
        assert!(rotated.angle() <= MAX_ROTATION_PER_SUBSTEP + 1e-9);
        assert!(rotated.angle() > 0.4);
    }

    #[test]
    fn test_update_recovers_velocities() {
        let mut body = unit_box().build();
        let h = 0.01;
        body.integrate(h, Vec3::ZERO);
        body.apply_correction(Vec3::new(0.02, 0.0, 0.0), None, CorrectionLevel::Position);
        body.update(h);
        // pure angular correction about X, scaled by I⁻¹ = 6
        assert_relative_eq!(body.angular_velocity().x, 0.12 / h, max_relative = 1e-2);
        assert_relative_eq!(body.velocity().length(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_generalized_inverse_mass() {
        let body = unit_box().build();
        // at the center: only the linear part
        assert_relative_eq!(body.inverse_mass_along(Vec3::UNIT_Y, Some(Vec3::ZERO)), 1.0);
        // lever arm 0.5 along X, normal Y: r×n = 0.5 Z, I⁻¹ = 6
        let w = body.inverse_mass_along(Vec3::UNIT_Y, Some(Vec3::new(0.5, 0.0, 0.0)));
        assert_relative_eq!(w, 1.0 + 0.25 * 6.0, epsilon = 1e-12);
        assert_relative_eq!(body.inverse_mass_along(Vec3::UNIT_Z, None), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sleeping_body_is_immovable() {
        let mut body = unit_box().build();
        body.fall_asleep();
        assert!(body.is_sleeping());
        body.integrate(0.1, Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(body.position(), Vec3::ZERO);
        assert_eq!(body.inverse_mass_along(Vec3::UNIT_X, None), 0.0);
    }

    #[test]
    fn test_force_and_impulse_wake() {
        let mut body = unit_box().build();
        body.fall_asleep();
        body.apply_force(Vec3::UNIT_X);
        assert!(!body.is_sleeping());

        body.fall_asleep();
        body.apply_impulse_at(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.5, 0.0, 0.0));
        assert!(!body.is_sleeping());
        assert_relative_eq!(body.velocity().y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.angular_velocity().z, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kinematic_moves_without_gravity() {
        let mut body = unit_box().kinematic().velocity(Vec3::UNIT_X).build();
        body.integrate(0.5, Vec3::new(0.0, -10.0, 0.0));
        assert_relative_eq!(body.position().x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(body.position().y, 0.0, epsilon = 1e-12);
        assert_eq!(body.inverse_mass_along(Vec3::UNIT_X, None), 0.0);
    }

    #[test]
    fn test_builder_defaults_and_mesh() {
        let body = RigidBodyBuilder::new(Collider::sphere(1.0))
            .mass(2.5)
            .mesh(MeshHandle(7))
            .damping(0.1, 0.2)
            .build();
        assert_relative_eq!(body.inverse_mass(), 0.4);
        assert_eq!(body.mesh(), Some(MeshHandle(7)));
        assert_eq!(body.damping(), (0.1, 0.2));
        assert!(body.can_sleep());
        assert!(body.collision_enabled());
    }
}
