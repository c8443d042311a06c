//! # Thornvale Gameplay
//!
//! Gameplay core of a 2D side-scrolling action game.
//!
//! This crate provides the actor layer and the systems that drive it:
//! - Health with mercy invincibility and knockback
//! - Player ability state machine (run, jump, double/wall jump, dash, knockback)
//! - Enemy behavior state machine for melee, ranged, flying and boss archetypes
//! - Combat resolution (melee hitboxes, projectiles, touch damage, rewards)
//! - Progression, potions, loot, chests, campfires and hazards
//! - Wind zones and timed trapdoors
//! - A reference physics world and the fixed-step simulation loop
//! - Event bus for presentation hooks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod archetype;
pub mod arena;
pub mod attack;
pub mod campfire;
pub mod combat;
pub mod config;
pub mod enemy;
pub mod events;
pub mod flat_world;
pub mod force_field;
pub mod hazard;
pub mod health;
pub mod input;
pub mod inventory;
pub mod knockback;
pub mod loot;
pub mod physics;
pub mod player;
pub mod player_combat;
pub mod progression;
pub mod projectile;
pub mod safe_ground;
pub mod simulation;
pub mod timers;
pub mod trapdoor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::archetype::*;
    pub use crate::arena::*;
    pub use crate::attack::*;
    pub use crate::campfire::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::enemy::*;
    pub use crate::events::*;
    pub use crate::flat_world::*;
    pub use crate::force_field::*;
    pub use crate::hazard::*;
    pub use crate::health::*;
    pub use crate::input::*;
    pub use crate::inventory::*;
    pub use crate::knockback::*;
    pub use crate::loot::*;
    pub use crate::physics::*;
    pub use crate::player::*;
    pub use crate::player_combat::*;
    pub use crate::progression::*;
    pub use crate::projectile::*;
    pub use crate::safe_ground::*;
    pub use crate::simulation::*;
    pub use crate::timers::*;
    pub use crate::trapdoor::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use thornvale_common::Vec2;

    #[test]
    fn test_every_preset_spawns() {
        for preset in ArchetypeConfig::presets() {
            let enemy = Enemy::spawn(&preset, Vec2::ZERO);
            assert!(enemy.is_ok(), "preset {} failed to spawn", preset.name);
        }
    }
}
