//! Error types shared across Thornvale crates.

use thiserror::Error;

use crate::ids::EntityId;

/// Errors raised by actor storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorError {
    /// Actor not found
    #[error("actor not found: {0}")]
    NotFound(EntityId),

    /// Actor already registered under this ID
    #[error("actor already registered: {0}")]
    AlreadyRegistered(EntityId),
}
