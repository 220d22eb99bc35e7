//! Broad-phase Pairing
//!
//! Sort-and-sweep over world AABBs, run once per frame. Every AABB is grown by
//! a velocity-scaled margin so that pairs closing in during the frame are
//! already known to the narrow phase on every substep.

use crate::body::{BodyId, RigidBody};
use crate::collider::Aabb;
use crate::error::PhysicsError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unordered pair of distinct bodies (stored with the lower index first)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionPair {
    a: BodyId,
    b: BodyId,
}

impl CollisionPair {
    /// Pair two bodies; pairing a body with itself is an error
    pub fn new(a: BodyId, b: BodyId) -> Result<Self, PhysicsError> {
        if a == b {
            return Err(PhysicsError::SelfPair { index: a.index() });
        }
        Ok(if a < b { Self { a, b } } else { Self { a: b, b: a } })
    }

    /// Lower body id
    #[inline]
    pub fn first(&self) -> BodyId {
        self.a
    }

    /// Higher body id
    #[inline]
    pub fn second(&self) -> BodyId {
        self.b
    }

    #[inline]
    pub fn contains(&self, id: BodyId) -> bool {
        self.a == id || self.b == id
    }
}

/// Broad-phase tunables for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BroadPhaseParams {
    /// Frame duration the velocity margin must cover
    pub frame_time: f64,
    /// Constant margin added to every AABB
    pub contact_margin: f64,
    /// Relative speed above which a sleeping partner is woken
    pub wake_threshold: f64,
}

/// World AABB grown by `2·T·|v| + margin`
pub fn expanded_aabb(body: &RigidBody, params: &BroadPhaseParams) -> Aabb {
    let speed = body.velocity().length();
    body.collider()
        .aabb()
        .expanded(2.0 * params.frame_time * speed + params.contact_margin)
}

/// A body that can still drive a contact this frame
#[inline]
fn is_active(body: &RigidBody) -> bool {
    body.is_movable() || body.is_kinematic()
}

/// Collect candidate pairs and wake sleeping bodies that are hit hard enough
///
/// `excluded(a, b)` (indices, `a < b`) removes pairs such as bodies joined by
/// a constraint. The result is sorted.
pub fn collect_pairs(
    bodies: &mut [RigidBody],
    params: &BroadPhaseParams,
    excluded: impl Fn(usize, usize) -> bool,
) -> Vec<CollisionPair> {
    let mut entries: Vec<(usize, Aabb)> = bodies
        .iter()
        .enumerate()
        .filter(|(_, b)| b.collision_enabled())
        .map(|(i, b)| (i, expanded_aabb(b, params)))
        .collect();
    entries.sort_by(|x, y| x.1.min.x.total_cmp(&y.1.min.x));

    let mut pairs = Vec::new();
    for (k, (i, box_i)) in entries.iter().enumerate() {
        for (j, box_j) in &entries[k + 1..] {
            if box_j.min.x > box_i.max.x {
                break;
            }
            if !box_i.intersects(box_j) {
                continue;
            }
            let (lo, hi) = if i < j { (*i, *j) } else { (*j, *i) };
            let (a, b) = (&bodies[lo], &bodies[hi]);
            if !(a.is_dynamic() || b.is_dynamic()) {
                continue;
            }
            if !(is_active(a) || is_active(b)) {
                continue;
            }
            if excluded(lo, hi) {
                continue;
            }
            pairs.push((lo, hi));
        }
    }

    pairs.sort_unstable();

    let mut woken = 0usize;
    for &(lo, hi) in &pairs {
        let relative = (bodies[lo].velocity() - bodies[hi].velocity()).length();
        if relative > params.wake_threshold
            && (bodies[lo].is_sleeping() || bodies[hi].is_sleeping())
        {
            bodies[lo].wake_up();
            bodies[hi].wake_up();
            woken += 1;
        }
    }
    if woken > 0 {
        log::debug!("broad phase woke {} sleeping pair(s)", woken);
    }

    pairs
        .into_iter()
        .map(|(lo, hi)| CollisionPair {
            a: BodyId(lo),
            b: BodyId(hi),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyBuilder;
    use crate::collider::Collider;
    use crate::math::Vec3;

    fn params() -> BroadPhaseParams {
        BroadPhaseParams {
            frame_time: 1.0 / 60.0,
            contact_margin: 0.01,
            wake_threshold: 0.1,
        }
    }

    fn ball(x: f64) -> RigidBody {
        RigidBodyBuilder::new(Collider::sphere(0.5))
            .position(Vec3::new(x, 0.0, 0.0))
            .build()
    }

    #[test]
    fn test_self_pair_rejected() {
        let id = BodyId(3);
        assert_eq!(
            CollisionPair::new(id, id),
            Err(PhysicsError::SelfPair { index: 3 })
        );
    }

    #[test]
    fn test_pair_is_unordered() {
        let p = CollisionPair::new(BodyId(5), BodyId(2)).unwrap();
        assert_eq!(p.first(), BodyId(2));
        assert_eq!(p.second(), BodyId(5));
        assert_eq!(p, CollisionPair::new(BodyId(2), BodyId(5)).unwrap());
        assert!(p.contains(BodyId(5)));
    }

    #[test]
    fn test_sweep_finds_only_overlaps() {
        let mut bodies = vec![ball(0.0), ball(0.9), ball(5.0)];
        let pairs = collect_pairs(&mut bodies, &params(), |_, _| false);
        assert_eq!(pairs, vec![CollisionPair::new(BodyId(0), BodyId(1)).unwrap()]);
    }

    #[test]
    fn test_velocity_margin_catches_fast_body() {
        let fast = RigidBodyBuilder::new(Collider::sphere(0.5))
            .velocity(Vec3::new(60.0, 0.0, 0.0))
            .build();
        let mut bodies = vec![fast, ball(2.5)];
        // 2·T·|v| = 2 m of margin
        assert_eq!(collect_pairs(&mut bodies, &params(), |_, _| false).len(), 1);
    }

    #[test]
    fn test_static_pairs_and_exclusions_skipped() {
        let ground = |x: f64| {
            RigidBodyBuilder::new(Collider::sphere(0.5))
                .fixed()
                .position(Vec3::new(x, 0.0, 0.0))
                .build()
        };
        let mut bodies = vec![ground(0.0), ground(0.5), ball(0.25)];
        let pairs = collect_pairs(&mut bodies, &params(), |a, b| (a, b) == (0, 2));
        assert_eq!(pairs, vec![CollisionPair::new(BodyId(1), BodyId(2)).unwrap()]);
    }

    #[test]
    fn test_disabled_collision_ignored() {
        let ghost = RigidBodyBuilder::new(Collider::sphere(0.5))
            .collision_enabled(false)
            .build();
        let mut bodies = vec![ghost, ball(0.1)];
        assert!(collect_pairs(&mut bodies, &params(), |_, _| false).is_empty());
    }

    #[test]
    fn test_fast_partner_wakes_sleeper() {
        let mut sleeper = ball(0.0);
        sleeper.fall_asleep();
        let mover = RigidBodyBuilder::new(Collider::sphere(0.5))
            .position(Vec3::new(0.9, 0.0, 0.0))
            .velocity(Vec3::new(-1.0, 0.0, 0.0))
            .build();
        let mut bodies = vec![sleeper, mover];
        collect_pairs(&mut bodies, &params(), |_, _| false);
        assert!(!bodies[0].is_sleeping());
    }

    #[test]
    fn test_two_sleepers_not_paired() {
        let mut a = ball(0.0);
        let mut b = ball(0.5);
        a.fall_asleep();
        b.fall_asleep();
        let mut bodies = vec![a, b];
        assert!(collect_pairs(&mut bodies, &params(), |_, _| false).is_empty());
    }
}
