//! Loot tables, treasure chests, item and weapon pickups.

use serde::{Deserialize, Serialize};
use tracing::debug;

use thornvale_common::{EntityId, ItemId, Vec2};

use crate::player_combat::WeaponData;

/// One possible drop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Item dropped
    pub item: ItemId,
    /// Chance in percent, [0, 100]
    pub drop_chance: f32,
}

impl LootEntry {
    /// Creates an entry; the chance is clamped to [0, 100].
    #[must_use]
    pub fn new(item: ItemId, drop_chance: f32) -> Self {
        Self {
            item,
            drop_chance: drop_chance.clamp(0.0, 100.0),
        }
    }
}

/// Ordered list of possible drops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    entries: Vec<LootEntry>,
}

impl LootTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    #[must_use]
    pub fn with_entry(mut self, item: ItemId, drop_chance: f32) -> Self {
        self.entries.push(LootEntry::new(item, drop_chance));
        self
    }

    /// Entries in priority order.
    #[must_use]
    pub fn entries(&self) -> &[LootEntry] {
        &self.entries
    }

    /// True if nothing can drop.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks a drop for a roll in [0, 100): the first entry whose chance is at
    /// least the roll.
    #[must_use]
    pub fn pick(&self, roll: f32) -> Option<ItemId> {
        self.entries
            .iter()
            .find(|entry| entry.drop_chance > 0.0 && roll <= entry.drop_chance)
            .map(|entry| entry.item)
    }

    /// Rolls the table.
    pub fn roll(&self, rng: &mut fastrand::Rng) -> Option<ItemId> {
        if self.entries.is_empty() {
            return None;
        }
        self.pick(rng.f32() * 100.0)
    }
}

/// A chest the player can open once by interacting within range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasureChest {
    id: EntityId,
    position: Vec2,
    contents: LootTable,
    interact_range: f32,
    opened: bool,
}

impl TreasureChest {
    /// Creates a closed chest.
    #[must_use]
    pub fn new(position: Vec2, contents: LootTable) -> Self {
        Self {
            id: EntityId::new(),
            position,
            contents,
            interact_range: 1.5,
            opened: false,
        }
    }

    /// Sets the interaction range.
    #[must_use]
    pub fn with_interact_range(mut self, range: f32) -> Self {
        self.interact_range = range.max(0.0);
        self
    }

    /// Chest ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Chest position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// True once opened.
    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// True if `actor` is close enough to interact.
    #[must_use]
    pub fn in_range(&self, actor: Vec2) -> bool {
        self.position.distance(actor) <= self.interact_range
    }

    /// Opens the chest if closed and in range. Returns `None` for an ignored
    /// interaction, `Some(drop)` once opened.
    pub fn try_open(&mut self, actor: Vec2, rng: &mut fastrand::Rng) -> Option<Option<ItemId>> {
        if self.opened || !self.in_range(actor) {
            return None;
        }
        self.opened = true;
        let item = self.contents.roll(rng);
        debug!(chest = %self.id, ?item, "chest opened");
        Some(item)
    }
}

/// An item lying in the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    /// Pickup ID
    pub id: EntityId,
    /// Item
    pub item: ItemId,
    /// Position
    pub position: Vec2,
}

impl Pickup {
    /// Radius within which the player collects it.
    pub const COLLECT_RADIUS: f32 = 0.75;

    /// Places an item in the world.
    #[must_use]
    pub fn new(item: ItemId, position: Vec2) -> Self {
        Self {
            id: EntityId::new(),
            item,
            position,
        }
    }

    /// True if `actor` is close enough to collect it.
    #[must_use]
    pub fn reachable_from(&self, actor: Vec2) -> bool {
        self.position.distance(actor) <= Self::COLLECT_RADIUS
    }
}

/// A weapon lying in the world. Touching it equips it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponPickup {
    /// Pickup ID
    pub id: EntityId,
    /// Weapon handed over
    pub weapon: WeaponData,
    /// Position
    pub position: Vec2,
}

impl WeaponPickup {
    /// Places a weapon in the world.
    #[must_use]
    pub fn new(weapon: WeaponData, position: Vec2) -> Self {
        Self {
            id: EntityId::new(),
            weapon,
            position,
        }
    }

    /// True if `actor` is close enough to take it.
    #[must_use]
    pub fn reachable_from(&self, actor: Vec2) -> bool {
        self.position.distance(actor) <= Pickup::COLLECT_RADIUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEM: ItemId = ItemId::new(7);

    #[test]
    fn test_first_matching_entry_wins() {
        let table = LootTable::new()
            .with_entry(GEM, 10.0)
            .with_entry(ItemId::POTION, 60.0);
        assert_eq!(table.pick(5.0), Some(GEM));
        assert_eq!(table.pick(10.0), Some(GEM));
        assert_eq!(table.pick(30.0), Some(ItemId::POTION));
        assert_eq!(table.pick(75.0), None);
    }

    #[test]
    fn test_zero_chance_never_drops() {
        let table = LootTable::new().with_entry(GEM, 0.0);
        assert_eq!(table.pick(0.0), None);
    }

    #[test]
    fn test_seeded_rolls_are_deterministic() {
        let table = LootTable::new().with_entry(ItemId::POTION, 50.0);
        let mut a = fastrand::Rng::with_seed(42);
        let mut b = fastrand::Rng::with_seed(42);
        let left: Vec<_> = (0..20).map(|_| table.roll(&mut a)).collect();
        let right: Vec<_> = (0..20).map(|_| table.roll(&mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_guaranteed_drop() {
        let table = LootTable::new().with_entry(ItemId::POTION, 100.0);
        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..50 {
            assert_eq!(table.roll(&mut rng), Some(ItemId::POTION));
        }
    }

    #[test]
    fn test_chest_opens_once_in_range() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut chest = TreasureChest::new(Vec2::ZERO, LootTable::new().with_entry(GEM, 100.0));
        assert_eq!(chest.try_open(Vec2::new(5.0, 0.0), &mut rng), None);
        assert_eq!(chest.try_open(Vec2::new(1.0, 0.0), &mut rng), Some(Some(GEM)));
        assert!(chest.is_opened());
        assert_eq!(chest.try_open(Vec2::new(1.0, 0.0), &mut rng), None);
    }

    #[test]
    fn test_pickup_radius() {
        let pickup = Pickup::new(ItemId::POTION, Vec2::ZERO);
        assert!(pickup.reachable_from(Vec2::new(0.5, 0.0)));
        assert!(!pickup.reachable_from(Vec2::new(1.0, 0.0)));

        let weapon = WeaponPickup::new(WeaponData::blaster(), Vec2::ZERO);
        assert!(weapon.reachable_from(Vec2::new(0.0, 0.7)));
        assert!(!weapon.reachable_from(Vec2::new(0.0, 0.8)));
    }
}
