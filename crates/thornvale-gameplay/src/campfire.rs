//! Campfires: rest spots that restore the player's health.

use serde::{Deserialize, Serialize};
use tracing::info;

use thornvale_common::{EntityId, Vec2};

use crate::health::Health;

/// An interactable that fully heals whoever rests at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campfire {
    id: EntityId,
    position: Vec2,
    interact_range: f32,
}

impl Campfire {
    /// Creates a campfire.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            id: EntityId::new(),
            position,
            interact_range: 1.5,
        }
    }

    /// Sets the interaction range.
    #[must_use]
    pub fn with_interact_range(mut self, range: f32) -> Self {
        self.interact_range = range.max(0.0);
        self
    }

    /// Campfire ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Campfire position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// True if `actor` is close enough to rest.
    #[must_use]
    pub fn in_range(&self, actor: Vec2) -> bool {
        self.position.distance(actor) <= self.interact_range
    }

    /// Rests at the fire. Returns the HP restored, or `None` when out of range
    /// or dead.
    pub fn rest(&self, actor: Vec2, health: &mut Health) -> Option<f32> {
        if !self.in_range(actor) || health.is_dead() {
            return None;
        }
        let before = health.current_hp();
        health.heal_full();
        let healed = health.current_hp() - before;
        info!(campfire = %self.id, healed, "rested at campfire");
        Some(healed)
    }
}
