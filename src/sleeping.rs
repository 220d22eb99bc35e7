//! Sleeping and Island Management
//!
//! Puts low-energy bodies to sleep and groups connected bodies into islands.
//!
//! # Sleeping
//!
//! A body whose kinetic energy per unit mass (`½|v|²` and `½|ω|²`) stays below
//! the thresholds accumulates idle time; its velocities are damped while it is
//! idle. Once the idle time exceeds the configured duration the body is ready
//! to sleep. Sleeping bodies are skipped by integration and have no effective
//! inverse mass.
//!
//! # Islands
//!
//! Dynamic bodies connected by constraints or by this frame's contact pairs form
//! an island. An island falls asleep only when every member is ready, and any
//! awake, restless member keeps (or wakes) the whole island.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sleep state for a body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SleepState {
    /// Body is fully active
    Awake,
    /// Body is sleeping (skipped in simulation)
    Sleeping,
}

/// Per-body sleep tracking data
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SleepData {
    /// Current sleep state
    pub state: SleepState,
    /// Seconds spent continuously below the energy thresholds
    pub idle_time: f64,
}

impl SleepData {
    /// Create new awake sleep data
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SleepState::Awake,
            idle_time: 0.0,
        }
    }

    /// Check if this body is currently sleeping
    #[inline]
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.state == SleepState::Sleeping
    }

    /// Wake up this body
    #[inline]
    pub fn wake(&mut self) {
        self.state = SleepState::Awake;
        self.idle_time = 0.0;
    }

    /// Advance the idle timer by one frame
    ///
    /// Returns `true` while the body is below the thresholds.
    pub fn observe(
        &mut self,
        linear_energy: f64,
        angular_energy: f64,
        frame_time: f64,
        config: &SleepConfig,
    ) -> bool {
        let idle = linear_energy < config.linear_threshold && angular_energy < config.angular_threshold;
        if idle {
            self.idle_time += frame_time;
        } else {
            self.idle_time = 0.0;
        }
        idle
    }

    /// Idle long enough to fall asleep
    #[inline]
    pub fn is_ready(&self, config: &SleepConfig) -> bool {
        self.idle_time >= config.sleep_duration
    }
}

impl Default for SleepData {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the sleeping system
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SleepConfig {
    /// Linear kinetic energy per unit mass (`½|v|²`) below which a body is idle
    pub linear_threshold: f64,
    /// Angular kinetic energy per unit inertia (`½|ω|²`) below which a body is idle
    pub angular_threshold: f64,
    /// Seconds a body must stay idle before it may sleep
    pub sleep_duration: f64,
    /// Velocity scale applied each frame while a body is idle, in `[0, 1]`
    pub sleep_damping: f64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            linear_threshold: 2e-3,  // ~0.063 m/s
            angular_threshold: 2e-3, // ~0.063 rad/s
            sleep_duration: 0.5,
            sleep_damping: 0.9,
        }
    }
}

/// Island: a group of connected bodies
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Island {
    /// Body indices in this island
    pub bodies: Vec<usize>,
}

/// Island manager using Union-Find (disjoint set)
#[derive(Clone, Debug, Default)]
pub struct IslandManager {
    /// Parent array for union-find
    parent: Vec<usize>,
    /// Rank for union by rank
    rank: Vec<u32>,
}

impl IslandManager {
    /// Create a new island manager for `num_bodies` bodies
    #[must_use]
    pub fn new(num_bodies: usize) -> Self {
        Self {
            parent: (0..num_bodies).collect(),
            rank: vec![0; num_bodies],
        }
    }

    /// Number of tracked bodies
    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Resize to accommodate more bodies
    pub fn resize(&mut self, num_bodies: usize) {
        while self.parent.len() < num_bodies {
            let idx = self.parent.len();
            self.parent.push(idx);
            self.rank.push(0);
        }
    }

    /// Reset all unions (call before rebuilding islands)
    pub fn reset_unions(&mut self) {
        for (i, p) in self.parent.iter_mut().enumerate() {
            *p = i;
        }
        self.rank.fill(0);
    }

    /// Find root with path halving
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Union two bodies into the same island
    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            core::cmp::Ordering::Less => self.parent[ra] = rb,
            core::cmp::Ordering::Greater => self.parent[rb] = ra,
            core::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Build islands from the current union-find state
    ///
    /// Only bodies for which `member` returns true are grouped; the rest are
    /// left out entirely.
    pub fn build_islands(&mut self, member: impl Fn(usize) -> bool) -> Vec<Island> {
        let n = self.parent.len();
        let mut island_map: Vec<Option<usize>> = vec![None; n];
        let mut islands: Vec<Island> = Vec::new();

        for i in (0..n).filter(|&i| member(i)) {
            let root = self.find(i);
            let idx = match island_map[root] {
                Some(idx) => idx,
                None => {
                    island_map[root] = Some(islands.len());
                    islands.push(Island { bodies: Vec::new() });
                    islands.len() - 1
                }
            };
            islands[idx].bodies.push(i);
        }

        islands
    }
}
