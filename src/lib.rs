//! # xpbd-rigid
//!
//! **Real-Time Rigid Body Simulation with XPBD**
//!
//! A rigid-body engine built on Extended Position-Based Dynamics: bodies are
//! integrated in small substeps, convex colliders are tested with GJK/EPA,
//! contact manifolds come from face clipping, and contacts and joints are all
//! solved through one compliance-based pair correction.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Colliders** | Box, finite plane, sphere, convex mesh (welded triangle soup or point cloud) |
//! | **Narrow phase** | GJK + EPA, face-clipped manifolds with a single-point fallback |
//! | **Contacts** | Static/dynamic Coulomb friction, restitution with resting suppression |
//! | **Constraints** | Attachment, orientation and axis alignment, swing/twist limits |
//! | **Joints** | Fixed, hinge, spherical |
//! | **Sleeping** | Energy-based sleep with island grouping |
//!
//! ## Cargo features
//!
//! - `parallel`: per-body integrate/update loops on rayon
//! - `serde`: `Serialize`/`Deserialize` for configs and value types
//!
//! ## Quick Start
//!
//! ```rust
//! use xpbd_rigid::prelude::*;
//!
//! let mut world = World::new(SolverConfig::default()).unwrap();
//!
//! world.add_body(
//!     RigidBodyBuilder::new(Collider::plane(Vec3::UNIT_Y, 50.0))
//!         .fixed()
//!         .build(),
//! );
//! let crate_box = world.add_body(
//!     RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.5)))
//!         .box_mass(5.0, Vec3::splat(0.5))
//!         .position(Vec3::new(0.0, 2.0, 0.0))
//!         .build(),
//! );
//!
//! for _ in 0..120 {
//!     world.step(1.0 / 60.0);
//! }
//! let y = world.body(crate_box).unwrap().position().y;
//! assert!((y - 0.5).abs() < 0.01);
//! ```
//!
//! ## Joints
//!
//! ```rust
//! use xpbd_rigid::prelude::*;
//!
//! let mut world = World::new(SolverConfig::default()).unwrap();
//! let bob = world.add_body(
//!     RigidBodyBuilder::new(Collider::sphere(0.2))
//!         .sphere_mass(1.0, 0.2)
//!         .position(Vec3::new(1.0, 0.0, 0.0))
//!         .build(),
//! );
//!
//! // Pin the bob's center one meter from the world origin
//! let mut hinge = Constraint::hinge(
//!     bob,
//!     None,
//!     Pose::from_position(Vec3::new(-1.0, 0.0, 0.0)),
//!     Pose::from_position(Vec3::ZERO),
//! );
//! hinge.set_damping(0.0, 0.5);
//! world.add_constraint(hinge).unwrap();
//! world.step(1.0);
//! ```

pub mod body;
pub mod broadphase;
pub mod collider;
pub mod constraint;
pub mod contact;
pub mod convex_mesh;
pub mod correction;
pub mod error;
pub mod gjk;
pub mod joint;
pub mod manifold;
pub mod mass_properties;
pub mod material;
pub mod math;
pub mod pose;
pub mod sleeping;
pub mod solver;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::body::{BodyId, BodyType, MeshHandle, RigidBody, RigidBodyBuilder};
    pub use crate::broadphase::CollisionPair;
    pub use crate::collider::{Aabb, Collider, Shape, ShapeKind, Support};
    pub use crate::constraint::{AngleLimit, Constraint, ConstraintKind};
    pub use crate::contact::Contact;
    pub use crate::convex_mesh::ConvexMesh;
    pub use crate::error::PhysicsError;
    pub use crate::gjk::{gjk, penetration, EpaResult, GjkResult};
    pub use crate::joint::JointType;
    pub use crate::mass_properties::MassProperties;
    pub use crate::material::CombineRule;
    pub use crate::math::{Quat, Vec3};
    pub use crate::pose::Pose;
    pub use crate::sleeping::{SleepConfig, SleepState};
    pub use crate::solver::SolverConfig;
    pub use crate::world::{ConstraintId, World};
}

// Re-export main types at crate root
pub use prelude::*;
