//! Contact Constraints
//!
//! Contacts are rebuilt every substep from the frame's broad-phase pairs (no
//! warm starting). Each contact point is an inequality constraint solved with
//! the shared pair correction, one manifold at a time:
//!
//! - **Position pass**: push the anchors apart along the normal, then cancel the
//!   tangential drift while the friction multiplier stays inside the static
//!   cone `λ_t < μ·λ_n`
//! - **Velocity pass**: dynamic friction bounded by `μ·|λ_n|/h`, and
//!   restitution against the normal velocity cached at creation
//!
//! Both passes correct the manifold as a whole at its centroid before its
//! single points, so a face resting flat stays level.

use crate::body::{BodyId, RigidBody};
use crate::broadphase::CollisionPair;
use crate::correction::{apply_pair_correction, pair_mut, CorrectionLevel, PairCorrection};
use crate::gjk::penetration;
use crate::manifold::build_manifold;
use crate::material::{CombineRule, SurfacePair};
use crate::math::Vec3;
use core::ops::Range;

/// One contact point between two bodies
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Anchor on A, body-local
    pub local_a: Vec3,
    /// Anchor on B, body-local
    pub local_b: Vec3,
    /// World point on A at creation
    pub point_a: Vec3,
    /// World point on B at creation
    pub point_b: Vec3,
    /// Unit normal from A to B
    pub normal: Vec3,
    /// Penetration depth at creation
    pub depth: f64,
    /// Accumulated normal multiplier of this substep
    pub lambda_n: f64,
    /// Accumulated tangential multiplier of this substep
    pub lambda_t: f64,
    /// `v_A(p_A) − v_B(p_B)` at creation
    pub relative_velocity: Vec3,
    /// Normal component of `relative_velocity` (positive = approaching)
    pub normal_velocity: f64,
    pub friction: f64,
    pub restitution: f64,
}

impl Contact {
    /// Current world anchors
    #[inline]
    fn anchors(&self, a: &RigidBody, b: &RigidBody) -> (Vec3, Vec3) {
        (
            a.pose().transform_point(self.local_a),
            b.pose().transform_point(self.local_b),
        )
    }
}

/// How contact coefficients of a pair are combined
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactRules {
    pub friction: CombineRule,
    pub restitution: CombineRule,
}

/// All contacts of one substep
///
/// Points of one manifold are stored contiguously; `manifolds` holds their
/// index ranges.
#[derive(Clone, Debug, Default)]
pub struct ContactSet {
    contacts: Vec<Contact>,
    manifolds: Vec<Range<usize>>,
}

impl ContactSet {
    /// Run the narrow phase on every pair at the current collider poses
    pub fn build(bodies: &[RigidBody], pairs: &[CollisionPair], rules: &ContactRules) -> Self {
        let mut contacts = Vec::new();
        let mut manifolds = Vec::new();
        for pair in pairs {
            let (ia, ib) = (pair.first().index(), pair.second().index());
            let (a, b) = (&bodies[ia], &bodies[ib]);
            let Some(hit) = penetration(a.collider(), b.collider()) else {
                continue;
            };
            let manifold = build_manifold(a.collider(), b.collider(), &hit);
            if manifold.points.is_empty() {
                continue;
            }
            let surface = SurfacePair::combine(
                (a.friction(), a.restitution()),
                (b.friction(), b.restitution()),
                rules.friction,
                rules.restitution,
            );

            let first = contacts.len();
            for point in &manifold.points {
                let relative_velocity = a.velocity_at(point.on_a) - b.velocity_at(point.on_b);
                contacts.push(Contact {
                    body_a: pair.first(),
                    body_b: pair.second(),
                    local_a: a.pose().inverse_transform_point(point.on_a),
                    local_b: b.pose().inverse_transform_point(point.on_b),
                    point_a: point.on_a,
                    point_b: point.on_b,
                    normal: manifold.normal,
                    depth: point.depth,
                    lambda_n: 0.0,
                    lambda_t: 0.0,
                    relative_velocity,
                    normal_velocity: relative_velocity.dot(manifold.normal),
                    friction: surface.friction,
                    restitution: surface.restitution,
                });
            }
            manifolds.push(first..contacts.len());
        }
        Self {
            contacts,
            manifolds,
        }
    }

    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Number of manifolds (touching body pairs)
    #[inline]
    pub fn manifold_count(&self) -> usize {
        self.manifolds.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Penetration and static friction pass
    ///
    /// Each manifold is first corrected at the centroid of its penetrating
    /// points, then point by point for what is left.
    pub fn solve_position(&mut self, bodies: &mut [RigidBody], h: f64) {
        for range in &self.manifolds {
            let manifold = &mut self.contacts[range.clone()];
            let (ia, ib) = (manifold[0].body_a.index(), manifold[0].body_b.index());
            let Some((a, b)) = pair_mut(bodies, ia, ib) else {
                continue;
            };
            push_apart(manifold, a, b, h);
            hold_static(manifold, a, b, h);
        }
    }

    /// Dynamic friction and restitution pass
    ///
    /// One velocity correction per manifold at its center of pressure (points
    /// weighted by `λ_n`), then dynamic friction on the sliding left at single
    /// points, e.g. a box spinning about the normal. Restitution is suppressed
    /// when the cached approach speed is at most `2·|g|·h`.
    pub fn solve_velocity(&self, bodies: &mut [RigidBody], h: f64, gravity: Vec3) {
        let rest_threshold = 2.0 * gravity.length() * h;
        for range in &self.manifolds {
            let manifold = &self.contacts[range.clone()];
            let total: f64 = manifold.iter().map(|c| c.lambda_n.max(0.0)).sum();
            if total <= 0.0 {
                continue;
            }
            let first = &manifold[0];
            let Some((a, b)) = pair_mut(bodies, first.body_a.index(), first.body_b.index())
            else {
                continue;
            };
            let n = first.normal;

            let (mut local_a, mut local_b, mut approach) = (Vec3::ZERO, Vec3::ZERO, 0.0);
            for c in manifold.iter().filter(|c| c.lambda_n > 0.0) {
                let share = c.lambda_n / total;
                local_a += c.local_a * share;
                local_b += c.local_b * share;
                approach += c.normal_velocity * share;
            }
            let pa = a.pose().transform_point(local_a);
            let pb = b.pose().transform_point(local_b);
            let v = a.velocity_at(pa) - b.velocity_at(pb);
            let vn = v.dot(n);
            let vt = v - n * vn;

            let budget = first.friction * total / h;
            let mut spent = 0.0;
            let mut dv = Vec3::ZERO;
            let vt_len = vt.length();
            if vt_len > f64::EPSILON {
                spent = budget.min(vt_len);
                dv -= vt * (spent / vt_len);
            }

            let e = if approach.abs() <= rest_threshold {
                0.0
            } else {
                first.restitution
            };
            dv += n * (-vn + (-e * approach).min(0.0));

            let corr = PairCorrection::at_points(dv, pa, pb, CorrectionLevel::Velocity);
            apply_pair_correction(a, Some(&mut *b), &corr, h);

            if manifold.len() < 2 || spent >= budget {
                continue;
            }
            let spare = budget - spent;
            for c in manifold.iter().filter(|c| c.lambda_n > 0.0) {
                let (pa, pb) = c.anchors(a, b);
                let v = a.velocity_at(pa) - b.velocity_at(pb);
                let vt = v - n * v.dot(n);
                let vt_len = vt.length();
                if vt_len <= f64::EPSILON {
                    continue;
                }
                let limit = spare * c.lambda_n / total;
                let corr = PairCorrection::at_points(
                    -vt * (limit.min(vt_len) / vt_len),
                    pa,
                    pb,
                    CorrectionLevel::Velocity,
                );
                apply_pair_correction(a, Some(&mut *b), &corr, h);
            }
        }
    }
}

/// Resolve the penetration of one manifold
fn push_apart(manifold: &mut [Contact], a: &mut RigidBody, b: &mut RigidBody, h: f64) {
    let n = manifold[0].normal;

    // Common part at the centroid of the penetrating points
    let penetrating: Vec<usize> = (0..manifold.len())
        .filter(|&i| {
            let (pa, pb) = manifold[i].anchors(a, b);
            (pa - pb).dot(n) > 0.0
        })
        .collect();
    if penetrating.len() > 1 {
        let k = penetrating.len() as f64;
        let (mut local_a, mut local_b) = (Vec3::ZERO, Vec3::ZERO);
        for &i in &penetrating {
            local_a += manifold[i].local_a;
            local_b += manifold[i].local_b;
        }
        let pa = a.pose().transform_point(local_a / k);
        let pb = b.pose().transform_point(local_b / k);
        let depth = (pa - pb).dot(n);
        if depth > 0.0 {
            let push = PairCorrection::at_points(-n * depth, pa, pb, CorrectionLevel::Position);
            let lambda = apply_pair_correction(a, Some(&mut *b), &push, h);
            for &i in &penetrating {
                manifold[i].lambda_n += lambda / k;
            }
        }
    }

    // Residual tilt, point by point
    for contact in manifold.iter_mut() {
        let (pa, pb) = contact.anchors(a, b);
        let depth = (pa - pb).dot(n);
        if depth <= 0.0 {
            continue;
        }
        let push = PairCorrection::at_points(-n * depth, pa, pb, CorrectionLevel::Position);
        contact.lambda_n += apply_pair_correction(a, Some(&mut *b), &push, h);
    }
}

/// Static friction: undo the tangential drift of the anchors over the substep
/// while the friction multiplier stays inside the cone
///
/// Like [`push_apart`], the manifold centroid goes first so that a sliding face
/// is held without a twist; single points then catch spin about the normal.
fn hold_static(manifold: &mut [Contact], a: &mut RigidBody, b: &mut RigidBody, h: f64) {
    let n = manifold[0].normal;
    let friction = manifold[0].friction;

    let touching: Vec<usize> = (0..manifold.len())
        .filter(|&i| manifold[i].lambda_n > 0.0)
        .collect();
    if touching.len() > 1 {
        let k = touching.len() as f64;
        let (mut local_a, mut local_b) = (Vec3::ZERO, Vec3::ZERO);
        let (mut lambda_n, mut lambda_t) = (0.0, 0.0);
        for &i in &touching {
            local_a += manifold[i].local_a;
            local_b += manifold[i].local_b;
            lambda_n += manifold[i].lambda_n;
            lambda_t += manifold[i].lambda_t;
        }
        let anchors = (local_a / k, local_b / k);
        let lambda = stick(a, b, anchors, n, friction * lambda_n - lambda_t, h);
        for &i in &touching {
            manifold[i].lambda_t += lambda * manifold[i].lambda_n / lambda_n;
        }
    }

    for contact in manifold.iter_mut().filter(|c| c.lambda_n > 0.0) {
        let cone = friction * contact.lambda_n - contact.lambda_t;
        contact.lambda_t += stick(a, b, (contact.local_a, contact.local_b), n, cone, h);
    }
}

/// Cancel the tangential drift of one anchor pair if the required multiplier
/// fits in `cone`; returns the applied `|Δλ|`
fn stick(
    a: &mut RigidBody,
    b: &mut RigidBody,
    (local_a, local_b): (Vec3, Vec3),
    n: Vec3,
    cone: f64,
    h: f64,
) -> f64 {
    let pa = a.pose().transform_point(local_a);
    let pb = b.pose().transform_point(local_b);
    let prev_a = a.previous_pose().transform_point(local_a);
    let prev_b = b.previous_pose().transform_point(local_b);
    let drift = (pa - prev_a) - (pb - prev_b);
    let tangential = drift - n * drift.dot(n);
    let slip = tangential.length();
    if slip < f64::EPSILON {
        return 0.0;
    }
    let t = tangential / slip;
    let w = a.inverse_mass_along(t, Some(pa)) + b.inverse_mass_along(t, Some(pb));
    if w < f64::EPSILON || slip / w >= cone {
        return 0.0;
    }
    let hold = PairCorrection::at_points(-tangential, pa, pb, CorrectionLevel::Position);
    apply_pair_correction(a, Some(b), &hold, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyBuilder;
    use crate::collider::Collider;
    use approx::assert_relative_eq;

    const RULES: ContactRules = ContactRules {
        friction: CombineRule::Average,
        restitution: CombineRule::Max,
    };

    fn cube_over_ground(y: f64, vy: f64) -> Vec<RigidBody> {
        let cube = RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.5)))
            .box_mass(1.0, Vec3::splat(0.5))
            .position(Vec3::new(0.0, y, 0.0))
            .velocity(Vec3::new(0.0, vy, 0.0))
            .restitution(0.5)
            .build();
        let ground = RigidBodyBuilder::new(Collider::plane(Vec3::UNIT_Y, 10.0))
            .fixed()
            .restitution(0.0)
            .build();
        vec![cube, ground]
    }

    fn pair() -> Vec<CollisionPair> {
        vec![CollisionPair::new(BodyId(0), BodyId(1)).unwrap()]
    }

    #[test]
    fn test_build_face_contact() {
        let bodies = cube_over_ground(0.48, -1.0);
        let set = ContactSet::build(&bodies, &pair(), &RULES);
        assert_eq!(set.len(), 4);
        for c in set.contacts() {
            assert_relative_eq!(c.depth, 0.02, epsilon = 1e-6);
            assert_relative_eq!(c.normal.y, -1.0, epsilon = 1e-6);
            // cube moving down = toward the ground
            assert_relative_eq!(c.normal_velocity, 1.0, epsilon = 1e-6);
            assert_relative_eq!(c.restitution, 0.5);
        }
    }

    #[test]
    fn test_no_contact_when_separated() {
        let bodies = cube_over_ground(2.0, 0.0);
        assert!(ContactSet::build(&bodies, &pair(), &RULES).is_empty());
    }

    #[test]
    fn test_position_solve_resolves_penetration() {
        let mut bodies = cube_over_ground(0.48, 0.0);
        for b in &mut bodies {
            b.integrate(1e-3, Vec3::ZERO);
        }
        let mut set = ContactSet::build(&bodies, &pair(), &RULES);
        for _ in 0..20 {
            set.solve_position(&mut bodies, 1e-3);
        }
        assert!(bodies[0].position().y > 0.495);
        assert_eq!(bodies[1].position(), Vec3::ZERO);
        assert!(set.contacts().iter().all(|c| c.lambda_n > 0.0));
    }

    #[test]
    fn test_flat_face_pushed_without_rotation() {
        let mut bodies = cube_over_ground(0.48, 0.0);
        for b in &mut bodies {
            b.integrate(1e-3, Vec3::ZERO);
        }
        let mut set = ContactSet::build(&bodies, &pair(), &RULES);
        assert_eq!(set.manifold_count(), 1);
        set.solve_position(&mut bodies, 1e-3);
        // one pass lifts the whole face
        assert_relative_eq!(bodies[0].position().y, 0.5, epsilon = 1e-9);
        assert!(bodies[0].orientation().angle() < 1e-12);
    }

    #[test]
    fn test_flat_face_bounces_without_spin() {
        let mut bodies = cube_over_ground(0.5, -2.0);
        one_substep(&mut bodies, 1e-3);
        assert_relative_eq!(bodies[0].velocity().y, 1.0, epsilon = 1e-6);
        assert!(bodies[0].angular_velocity().length() < 1e-9);
    }

    #[test]
    fn test_friction_slows_spin_about_normal() {
        let mut bodies = cube_over_ground(0.49, 0.0);
        bodies[0].set_angular_velocity(Vec3::new(0.0, 5.0, 0.0));
        bodies[0].set_friction(0.5);
        bodies[1].set_friction(0.5);
        one_substep(&mut bodies, 1e-2);
        let spin = bodies[0].angular_velocity().y;
        assert!(spin > 0.0 && spin < 4.9, "spin {}", spin);
    }

    fn ball_over_ground(y: f64, vy: f64, restitution: f64) -> Vec<RigidBody> {
        let ball = RigidBodyBuilder::new(Collider::sphere(0.5))
            .sphere_mass(1.0, 0.5)
            .position(Vec3::new(0.0, y, 0.0))
            .velocity(Vec3::new(0.0, vy, 0.0))
            .restitution(restitution)
            .build();
        let ground = RigidBodyBuilder::new(Collider::plane(Vec3::UNIT_Y, 10.0))
            .fixed()
            .restitution(0.0)
            .build();
        vec![ball, ground]
    }

    fn one_substep(bodies: &mut [RigidBody], h: f64) {
        let g = Vec3::ZERO;
        for b in bodies.iter_mut() {
            b.integrate(h, g);
        }
        let mut set = ContactSet::build(bodies, &pair(), &RULES);
        set.solve_position(bodies, h);
        for b in bodies.iter_mut() {
            b.update(h);
        }
        set.solve_velocity(bodies, h, Vec3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_velocity_solve_applies_restitution() {
        let mut bodies = ball_over_ground(0.5, -2.0, 0.5);
        one_substep(&mut bodies, 1e-3);
        // bounces back with e · v
        assert_relative_eq!(bodies[0].velocity().y, 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_slow_impact_does_not_bounce() {
        // 2·|g|·h ≈ 0.196 m/s
        let mut bodies = ball_over_ground(0.5, -0.15, 1.0);
        one_substep(&mut bodies, 1e-2);
        assert!(bodies[0].velocity().y.abs() < 1e-3);
    }
}
