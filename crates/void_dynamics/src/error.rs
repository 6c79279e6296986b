//! Error types for the contact pipeline

use thiserror::Error;

use crate::body::BodyHandle;
use crate::manifold::ManifoldHandle;

/// Contact pipeline errors
///
/// Only API-boundary failures are reported here. Broken internal invariants
/// are debug assertions and degenerate geometry is silently discarded.
#[derive(Debug, Error)]
pub enum DynamicsError {
    /// Rigid body not found
    #[error("Rigid body not found: {0:?}")]
    BodyNotFound(BodyHandle),

    /// Manifold not found
    #[error("Contact manifold not found: {0:?}")]
    ManifoldNotFound(ManifoldHandle),

    /// A manifold already tracks this body pair
    #[error("Body pair ({0:?}, {1:?}) already has a contact manifold")]
    PairAlreadyTracked(BodyHandle, BodyHandle),

    /// A body cannot be paired with itself
    #[error("Cannot create a contact manifold between {0:?} and itself")]
    SelfPair(BodyHandle),

    /// Invalid configuration
    #[error("Invalid contact configuration: {0}")]
    InvalidConfig(String),

    /// Shape data rejected
    #[error("Invalid shape data: {0}")]
    InvalidShape(String),
}

/// Result type for contact pipeline operations
pub type Result<T> = std::result::Result<T, DynamicsError>;
