//! Hazard zones: spikes, lava, pits.

use serde::{Deserialize, Serialize};

use thornvale_common::{EntityId, Vec2};

use crate::combat::{TouchDamage, TouchPolicy};
use crate::knockback::KnockbackProfile;
use crate::physics::{Aabb, ContactPhase};

/// What touching a hazard does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HazardContact {
    /// Apply the hazard's touch damage
    pub damage: bool,
    /// Put the player back on the last safe ground
    pub return_to_safe: bool,
}

/// A static volume that hurts whoever touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    id: EntityId,
    bounds: Aabb,
    touch: TouchDamage,
    respawn: bool,
}

impl HazardZone {
    /// Creates a hazard that damages once per entry, without knockback.
    #[must_use]
    pub fn new(bounds: Aabb, damage: f32) -> Self {
        Self {
            id: EntityId::new(),
            bounds,
            touch: TouchDamage::new(damage.max(0.0), KnockbackProfile::NONE),
            respawn: false,
        }
    }

    /// Sets the contact policy.
    #[must_use]
    pub fn with_policy(mut self, policy: TouchPolicy) -> Self {
        self.touch = self.touch.with_policy(policy);
        self
    }

    /// Sets the knockback dealt on contact.
    #[must_use]
    pub fn with_knockback(mut self, knockback: KnockbackProfile) -> Self {
        self.touch.knockback = knockback;
        self
    }

    /// Makes the hazard put the player back on safe ground (pits and spikes).
    #[must_use]
    pub fn respawning(mut self) -> Self {
        self.respawn = true;
        self
    }

    /// Hazard ID, shared with its physics trigger.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Trigger volume.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Center of the volume, used as the knockback source.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.bounds.center()
    }

    /// Damage dealt on contact.
    #[must_use]
    pub fn touch(&self) -> &TouchDamage {
        &self.touch
    }

    /// True for pits and spikes.
    #[must_use]
    pub fn is_respawn(&self) -> bool {
        self.respawn
    }

    /// Decides the effect of a contact in `phase`.
    ///
    /// Respawn hazards move the player on entry whether or not the damage
    /// lands, so a player inside a mercy window still leaves the pit.
    #[must_use]
    pub fn on_contact(&self, phase: ContactPhase) -> HazardContact {
        HazardContact {
            damage: self.touch.policy.applies(phase),
            return_to_safe: self.respawn && phase == ContactPhase::Began,
        }
    }
}
