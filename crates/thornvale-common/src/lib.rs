//! # Thornvale Common
//!
//! Shared types for the Thornvale gameplay core:
//! - ID types (EntityId, ItemId)
//! - Collision layer masks
//! - 2D math helpers and facing
//! - Actor storage errors
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod layers;
pub mod math;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::layers::*;
    pub use crate::math::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn test_actor_error_display() {
        let err = ActorError::NotFound(EntityId::from_raw(7));
        assert_eq!(err.to_string(), "actor not found: #7");
    }
}
