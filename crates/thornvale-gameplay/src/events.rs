//! Event bus for presentation and scene hooks.
//!
//! Animation, flash and sound requests, deaths, rewards and level-completion
//! are published fire-and-forget. The presentation layer drains the bus once
//! per frame; nothing in the core waits on a consumer.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use thornvale_common::{EntityId, ItemId, Vec2};

/// Kind of actor, for death notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// The player
    Player,
    /// A regular enemy
    Enemy,
    /// A boss
    Boss,
}

/// Tint/flash request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashKind {
    /// Took a hit
    Hit,
    /// Boss entered its second phase
    Enraged,
    /// Healed
    Heal,
}

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Play an animation trigger on an actor
    AnimationTriggered {
        /// Actor ID
        actor: EntityId,
        /// Trigger name
        name: String,
    },
    /// Flash or tint an actor
    FlashRequested {
        /// Actor ID
        actor: EntityId,
        /// Flash kind
        kind: FlashKind,
    },
    /// Play a sound cue
    SoundRequested {
        /// Cue name
        cue: String,
        /// World position of the source
        position: Vec2,
    },
    /// An actor took damage
    ActorDamaged {
        /// Actor ID
        actor: EntityId,
        /// HP removed
        amount: f32,
        /// HP left
        remaining: f32,
    },
    /// An actor died
    ActorDied {
        /// Actor ID
        actor: EntityId,
        /// Kind of actor
        kind: ActorKind,
        /// Where it died
        position: Vec2,
    },
    /// A boss entered its second phase
    BossPhaseTwo {
        /// Boss ID
        boss: EntityId,
    },
    /// A boss was defeated; the level is complete
    BossDefeated {
        /// Boss ID
        boss: EntityId,
    },
    /// XP was granted to the player
    XpGranted {
        /// Amount granted
        amount: u32,
        /// XP toward the next level after granting
        xp: u32,
        /// Level after granting
        level: u32,
    },
    /// The player gained a level
    LevelUp {
        /// New level
        level: u32,
        /// New max HP
        max_hp: f32,
    },
    /// An item dropped into the world
    LootDropped {
        /// Item type
        item: ItemId,
        /// Drop position
        position: Vec2,
        /// Enemy or chest that dropped it
        source: EntityId,
    },
    /// A chest was opened
    ChestOpened {
        /// Chest ID
        chest: EntityId,
    },
    /// The player drank a potion
    PotionUsed {
        /// HP restored
        healed: f32,
        /// Potions left
        remaining: u32,
    },
    /// The player was put back on solid ground or respawned
    PlayerRespawned {
        /// New position
        position: Vec2,
    },
    /// The player rested at a campfire
    Rested {
        /// Campfire ID
        campfire: EntityId,
        /// HP restored
        healed: f32,
    },
    /// An actor picked up and equipped a weapon
    WeaponEquipped {
        /// Actor ID
        actor: EntityId,
        /// Weapon name
        weapon: String,
    },
    /// A trapdoor lost its collision
    PlatformVanished {
        /// Trapdoor ID
        platform: EntityId,
    },
    /// A trapdoor is solid again
    PlatformRestored {
        /// Trapdoor ID
        platform: EntityId,
    },
}

impl GameEvent {
    /// Shorthand for an animation trigger.
    #[must_use]
    pub fn animation(actor: EntityId, name: &str) -> Self {
        Self::AnimationTriggered {
            actor,
            name: name.to_owned(),
        }
    }

    /// Shorthand for a sound cue.
    #[must_use]
    pub fn sound(cue: &str, position: Vec2) -> Self {
        Self::SoundRequested {
            cue: cue.to_owned(),
            position,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: GameEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        let actor = EntityId::new();
        bus.publish(GameEvent::animation(actor, "jump"));
        bus.publish(GameEvent::BossDefeated { boss: actor });
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            GameEvent::AnimationTriggered {
                actor,
                name: "jump".into()
            }
        );
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_without_blocking() {
        let bus = EventBus::new(2);
        for _ in 0..5 {
            bus.publish(GameEvent::sound("hit", Vec2::ZERO));
        }
        assert_eq!(bus.drain().len(), 2);
    }

    #[test]
    fn test_sender_handle_shares_channel() {
        let bus = EventBus::default();
        let sender = bus.sender();
        let _ = sender.try_send(GameEvent::ChestOpened { chest: EntityId::from_raw(3) });
        assert_eq!(bus.pending_count(), 1);
    }
}
