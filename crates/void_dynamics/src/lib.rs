//! Void Dynamics - Rigid-Body Contact Pipeline
//!
//! This crate provides the collision and contact-resolution core of the Void
//! Engine's rigid-body simulation.
//!
//! # Features
//!
//! - Dynamic AABB tree with surface-area insertion and AVL rotations
//! - Separating-axis narrow phase for spheres, boxes, capsules, cylinders,
//!   planes and triangle meshes
//! - Persistent contact manifolds that keep point identity across steps
//! - Sequential-impulse solver with warm starting, circular friction and
//!   position correction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        Island                        │
//! │  ┌────────────┐  ┌─────────────┐  ┌───────────────┐  │
//! │  │   Bodies   │  │ BroadPhase  │  │ ManifoldStore │  │
//! │  └────────────┘  └─────────────┘  └───────────────┘  │
//! └──────────────────────────────────────────────────────┘
//!                            │ step(dt)
//!        ┌───────────────────┼───────────────────┐
//!        ▼                   ▼                   ▼
//!  ┌───────────┐      ┌─────────────┐      ┌──────────┐
//!  │DynamicTree│ ──▶  │ Narrow phase│ ──▶  │  Solver  │
//!  │  (pairs)  │      │ (manifolds) │      │  (rows)  │
//!  └───────────┘      └─────────────┘      └──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use void_dynamics::prelude::*;
//!
//! let mut island = Island::new(ContactConfig::default())?;
//!
//! let ground = island.add_body(RigidBodyDesc::fixed(Shape::plane(Vec3::Y, 0.0)))?;
//! let crate_box = island.add_body(
//!     RigidBodyDesc::dynamic(Shape::cuboid(0.5, 0.5, 0.5), 1.0).with_position(0.0, 2.0, 0.0),
//! )?;
//!
//! island.create_manifold(crate_box, ground)?;
//! island.step(1.0 / 60.0)?;
//! ```

pub mod aabb;
pub mod arena;
pub mod body;
pub mod broad_phase;
pub mod config;
pub mod error;
pub mod events;
pub mod island;
pub mod manifold;
pub mod material;
pub mod math;
pub mod narrow;
pub mod shapes;
pub mod solver;
pub mod tree;

pub mod prelude {
    //! Common imports for the contact pipeline
    pub use crate::aabb::Aabb;
    pub use crate::arena::{Arena, Handle};
    pub use crate::body::{BodyHandle, BodyKind, RigidBody, RigidBodyDesc};
    pub use crate::broad_phase::BroadPhase;
    pub use crate::config::{ContactConfig, LARGE_SCALAR, MAX_CONTACTS};
    pub use crate::error::{DynamicsError, Result};
    pub use crate::events::{ContactData, ContactEvent, ContactEventHandler, ContactEventType, EventCollector};
    pub use crate::island::{Island, StepStats};
    pub use crate::manifold::{ContactId, ContactManifold, ContactPoint, ManifoldHandle, ManifoldStore};
    pub use crate::material::Material;
    pub use crate::narrow::{
        collide, detect_collision, CollisionContext, CollisionPoint, CollisionResult, NormalAttachment,
    };
    pub use crate::shapes::{Shape, ShapeKind, TriangleMesh};
    pub use crate::solver::{Solver, SolverStats};
    pub use crate::tree::{DynamicTree, NodeId, NULL_NODE};

    pub use glam::{Quat, Vec3};
}

pub use prelude::*;
