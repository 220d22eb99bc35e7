//! Physics World
//!
//! Owns bodies, constraints and the solver state, and advances them in fixed
//! frames. `step(dt)` feeds a time accumulator and runs as many whole frames as
//! it holds (capped per call); `step_frame()` runs exactly one.
//!
//! Per frame: broad-phase pairing, `substeps` XPBD substeps, then the sleep
//! and island update.

use crate::body::{BodyId, RigidBody};
use crate::broadphase::{collect_pairs, BroadPhaseParams, CollisionPair};
use crate::constraint::{Constraint, ConstraintKind};
use crate::contact::{Contact, ContactSet};
use crate::error::PhysicsError;
use crate::math::Vec3;
use crate::sleeping::IslandManager;
use crate::solver::{solve_frame, SolverConfig, DEFAULT_GRAVITY};
use log::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle of a constraint inside its world
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintId(pub(crate) usize);

impl ConstraintId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Simulation world
#[derive(Clone, Debug)]
pub struct World {
    bodies: Vec<RigidBody>,
    constraints: Vec<Constraint>,
    gravity: Vec3,
    config: SolverConfig,
    contacts: ContactSet,
    pairs: Vec<CollisionPair>,
    islands: IslandManager,
    /// Unsimulated time carried between `step` calls
    accumulator: f64,
    frame_count: u64,
}

impl World {
    /// Create an empty world; the configuration is validated first
    pub fn new(config: SolverConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        debug!(
            "world created: {} Hz, {} substeps, {} position iteration(s)",
            config.frame_rate, config.substeps, config.position_iterations
        );
        Ok(Self {
            bodies: Vec::new(),
            constraints: Vec::new(),
            gravity: DEFAULT_GRAVITY,
            config,
            contacts: ContactSet::default(),
            pairs: Vec::new(),
            islands: IslandManager::new(0),
            accumulator: 0.0,
            frame_count: 0,
        })
    }

    /// Add a body, returning its handle
    pub fn add_body(&mut self, body: RigidBody) -> BodyId {
        let id = BodyId(self.bodies.len());
        self.bodies.push(body);
        self.islands.resize(self.bodies.len());
        id
    }

    /// Add a constraint after checking its wiring
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintId, PhysicsError> {
        let count = self.bodies.len();
        let check = |id: BodyId| {
            if id.index() < count {
                Ok(())
            } else {
                Err(PhysicsError::InvalidBodyId {
                    index: id.index(),
                    count,
                })
            }
        };
        check(constraint.body_a())?;
        if let Some(b) = constraint.body_b() {
            check(b)?;
            if b == constraint.body_a() {
                return Err(PhysicsError::InvalidConstraint {
                    reason: "constraint connects a body to itself",
                });
            }
        }
        let (local_a, local_b) = constraint.local_frames();
        if !(local_a.is_finite() && local_b.is_finite()) {
            return Err(PhysicsError::InvalidConstraint {
                reason: "attachment frame is not finite",
            });
        }
        let missing_limit = match constraint.kind() {
            ConstraintKind::SwingLimit => constraint.swing_limits().is_none(),
            ConstraintKind::TwistLimit => constraint.twist_limits().is_none(),
            _ => false,
        };
        if missing_limit {
            return Err(PhysicsError::InvalidConstraint {
                reason: "limit constraint has no angle limits",
            });
        }

        let id = ConstraintId(self.constraints.len());
        debug!(
            "constraint {} added: {:?} between {:?} and {:?}",
            id.0,
            constraint.kind(),
            constraint.body_a(),
            constraint.body_b()
        );
        self.constraints.push(constraint);
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance by `dt` seconds of wall time, returning the number of frames run
    ///
    /// At most `max_frames_per_step` frames run per call; any backlog left
    /// after that is dropped. Non-finite or non-positive `dt` runs nothing.
    pub fn step(&mut self, dt: f64) -> usize {
        if !(dt.is_finite() && dt > 0.0) {
            return 0;
        }
        let frame_time = self.config.frame_time();
        self.accumulator += dt;

        let mut frames = 0;
        while self.accumulator >= frame_time && frames < self.config.max_frames_per_step {
            self.step_frame();
            self.accumulator -= frame_time;
            frames += 1;
        }
        if self.accumulator >= frame_time {
            debug!(
                "dropping {:.4} s of simulation backlog after {} frame(s)",
                self.accumulator, frames
            );
            self.accumulator = 0.0;
        }
        frames
    }

    /// Run exactly one frame
    pub fn step_frame(&mut self) {
        let params = BroadPhaseParams {
            frame_time: self.config.frame_time(),
            contact_margin: self.config.contact_margin,
            wake_threshold: self.config.wake_threshold,
        };
        let joined = self.joined_pairs();
        self.pairs = collect_pairs(&mut self.bodies, &params, |a, b| {
            joined.binary_search(&(a, b)).is_ok()
        });

        self.contacts = solve_frame(
            &mut self.bodies,
            &mut self.constraints,
            &self.pairs,
            self.gravity,
            &self.config,
        );

        self.update_sleep();
        self.frame_count += 1;

        for (i, body) in self.bodies.iter().enumerate() {
            if !body.is_finite() {
                warn!("body {} has non-finite state after frame {}", i, self.frame_count);
            }
        }
    }

    /// Sorted body pairs joined by a constraint that disables their collision
    fn joined_pairs(&self) -> Vec<(usize, usize)> {
        let mut joined: Vec<(usize, usize)> = self
            .constraints
            .iter()
            .filter(|c| !c.collide_connected())
            .filter_map(|c| {
                let (a, b) = (c.body_a().index(), c.body_b()?.index());
                Some((a.min(b), a.max(b)))
            })
            .collect();
        joined.sort_unstable();
        joined.dedup();
        joined
    }

    /// Advance idle timers and put whole islands to sleep (or wake them)
    fn update_sleep(&mut self) {
        let frame_time = self.config.frame_time();
        let sleep = self.config.sleep;
        let n = self.bodies.len();

        let mut ready = vec![false; n];
        let mut restless = vec![false; n];
        for (i, body) in self.bodies.iter_mut().enumerate() {
            if !body.is_movable() {
                continue;
            }
            let (linear, angular) = body.kinetic_energy_per_mass();
            if !body.can_sleep() {
                restless[i] = linear >= sleep.linear_threshold || angular >= sleep.angular_threshold;
                continue;
            }
            let data = body.sleep_data_mut();
            let idle = data.observe(linear, angular, frame_time, &sleep);
            ready[i] = data.is_ready(&sleep);
            restless[i] = !idle;
            if idle {
                body.scale_velocities(sleep.sleep_damping);
            }
        }

        self.islands.resize(n);
        self.islands.reset_unions();
        let bodies = &self.bodies;
        let dynamic = |i: usize| bodies[i].is_dynamic();
        for c in &self.constraints {
            if let Some(b) = c.body_b() {
                let (a, b) = (c.body_a().index(), b.index());
                if dynamic(a) && dynamic(b) {
                    self.islands.union(a, b);
                }
            }
        }
        for pair in &self.pairs {
            let (a, b) = (pair.first().index(), pair.second().index());
            if dynamic(a) && dynamic(b) {
                self.islands.union(a, b);
            }
        }
        let islands = self.islands.build_islands(dynamic);

        let (mut slept, mut woken) = (0usize, 0usize);
        for island in &islands {
            let members = &island.bodies;
            if members.iter().any(|&i| restless[i]) {
                for &i in members {
                    if self.bodies[i].is_sleeping() {
                        self.bodies[i].wake_up();
                        woken += 1;
                    }
                }
                continue;
            }
            let settled = members
                .iter()
                .all(|&i| ready[i] || self.bodies[i].is_sleeping());
            if settled {
                for &i in members {
                    if !self.bodies[i].is_sleeping() {
                        self.bodies[i].fall_asleep();
                        slept += 1;
                    }
                }
            }
        }
        if slept > 0 || woken > 0 {
            debug!(
                "frame {}: {} body(ies) fell asleep, {} woke up",
                self.frame_count, slept, woken
            );
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Change gravity, waking every body so the change takes effect
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        for body in &mut self.bodies {
            body.wake_up();
        }
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.index())
    }

    #[inline]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.index())
    }

    #[inline]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    #[inline]
    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id.index())
    }

    #[inline]
    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.constraints.get_mut(id.index())
    }

    #[inline]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Contacts of the last substep
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        self.contacts.contacts()
    }

    /// Broad-phase pairs of the last frame
    #[inline]
    pub fn pairs(&self) -> &[CollisionPair] {
        &self.pairs
    }

    pub fn sleeping_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_sleeping()).count()
    }

    /// Frames simulated so far
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
