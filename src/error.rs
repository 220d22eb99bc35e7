//! Physics Error Types
//!
//! Unified error type for the engine. Constructors that validate user input
//! (world configuration, constraint wiring, convex mesh buffers, collision
//! pairs) return `Result<T, PhysicsError>`. The per-step hot path never fails:
//! numerical degeneracies there are handled as no-ops.

use thiserror::Error;

/// Unified error type for physics operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PhysicsError {
    /// Body id does not refer to a body of this world.
    #[error("body index {index} out of range (count={count})")]
    InvalidBodyId {
        /// The invalid index that was provided
        index: usize,
        /// Current number of bodies in the world
        count: usize,
    },
    /// A pair or constraint was built from a body with itself.
    #[error("body {index} cannot be paired with itself")]
    SelfPair {
        /// The body that appeared on both sides
        index: usize,
    },
    /// A constraint is wired in a way the solver cannot use.
    #[error("invalid constraint: {reason}")]
    InvalidConstraint {
        /// Human-readable description of the problem
        reason: &'static str,
    },
    /// Convex mesh buffers were rejected.
    #[error("invalid convex mesh: {reason}")]
    InvalidMesh {
        /// Human-readable description of the problem
        reason: &'static str,
    },
    /// Invalid configuration parameter.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the invalid configuration
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PhysicsError::InvalidBodyId { index: 5, count: 3 };
        let s = e.to_string();
        assert!(s.contains('5'), "Should contain index");
        assert!(s.contains('3'), "Should contain count");
    }

    #[test]
    fn test_self_pair_display() {
        let e = PhysicsError::SelfPair { index: 7 };
        assert_eq!(e.to_string(), "body 7 cannot be paired with itself");
    }

    #[test]
    fn test_error_variants() {
        let e1 = PhysicsError::InvalidBodyId { index: 0, count: 0 };
        let e2 = PhysicsError::InvalidMesh {
            reason: "fewer than 4 unique vertices",
        };
        let e3 = PhysicsError::InvalidConstraint {
            reason: "body A == body B",
        };
        assert_ne!(e1, e2);
        assert_ne!(e2, e3);
    }

    #[test]
    fn test_invalid_configuration() {
        let e = PhysicsError::InvalidConfiguration {
            reason: "substeps must be > 0",
        };
        assert!(e.to_string().contains("substeps"));
    }

    #[test]
    fn test_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&PhysicsError::SelfPair { index: 1 });
    }
}
