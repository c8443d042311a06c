//! Healing potions carried by the player.

use serde::{Deserialize, Serialize};

use crate::health::Health;

/// Potion capacity and strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PotionConfig {
    /// Maximum potions carried
    pub capacity: u32,
    /// HP restored per potion
    pub heal_amount: f32,
    /// Potions at spawn
    pub starting: u32,
}

impl Default for PotionConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            heal_amount: 30.0,
            starting: 0,
        }
    }
}

/// Potion stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotionBelt {
    count: u32,
    config: PotionConfig,
}

impl Default for PotionBelt {
    fn default() -> Self {
        Self::new(PotionConfig::default())
    }
}

impl PotionBelt {
    /// Creates a belt holding the configured starting potions.
    #[must_use]
    pub fn new(config: PotionConfig) -> Self {
        Self {
            count: config.starting.min(config.capacity),
            config,
        }
    }

    /// Potions carried.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Maximum potions carried.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// True if another potion fits.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.count < self.config.capacity
    }

    /// Picks up a potion. Returns false when full, leaving it in the world.
    pub fn add(&mut self) -> bool {
        if self.has_room() {
            self.count += 1;
            true
        } else {
            false
        }
    }

    /// Drinks a potion. No-op (returns `None`) with an empty belt, at full HP,
    /// or when dead. Returns HP restored.
    pub fn drink(&mut self, health: &mut Health) -> Option<f32> {
        if self.count == 0 || health.is_dead() || health.current_hp() >= health.max_hp() {
            return None;
        }
        self.count -= 1;
        Some(health.heal(self.config.heal_amount))
    }
}
