//! Surface Combine Rules
//!
//! Each body carries its own friction and restitution coefficient; a contact
//! needs one value per pair. The rule used for each coefficient is configured
//! once in [`SolverConfig`](crate::solver::SolverConfig).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How to combine two per-body coefficients
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CombineRule {
    /// Average of two values
    #[default]
    Average,
    /// Minimum of two values
    Min,
    /// Maximum of two values
    Max,
    /// Multiply two values
    Multiply,
}

impl CombineRule {
    /// Apply the combine rule to two values
    #[inline]
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            CombineRule::Average => 0.5 * (a + b),
            CombineRule::Min => a.min(b),
            CombineRule::Max => a.max(b),
            CombineRule::Multiply => a * b,
        }
    }
}

/// Combined coefficients of a contact pair
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePair {
    pub friction: f64,
    pub restitution: f64,
}

impl SurfacePair {
    /// Combine `(friction, restitution)` of two bodies
    #[inline]
    pub fn combine(
        a: (f64, f64),
        b: (f64, f64),
        friction_rule: CombineRule,
        restitution_rule: CombineRule,
    ) -> Self {
        Self {
            friction: friction_rule.apply(a.0, b.0).max(0.0),
            restitution: restitution_rule.apply(a.1, b.1).clamp(0.0, 1.0),
        }
    }
}
