//! Slot storage for live enemies.

use ahash::AHashMap;

use thornvale_common::{ActorError, EntityId};

use crate::enemy::Enemy;

/// Result type for arena operations.
pub type ActorResult<T> = Result<T, ActorError>;

/// Arena-based enemy storage.
///
/// Uses a free list for slot reuse and a map from ID to slot for lookup.
/// Iteration follows slot order, so it is deterministic for a given sequence
/// of inserts and removals.
#[derive(Debug, Default)]
pub struct EnemyArena {
    slots: Vec<Option<Enemy>>,
    free_list: Vec<usize>,
    id_to_index: AHashMap<EntityId, usize>,
}

impl EnemyArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an arena with pre-allocated slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            id_to_index: AHashMap::with_capacity(capacity),
        }
    }

    /// Number of live enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_index.len()
    }

    /// True if no enemies are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_index.is_empty()
    }

    /// Adds an enemy.
    pub fn insert(&mut self, enemy: Enemy) -> ActorResult<EntityId> {
        let id = enemy.id();
        if self.id_to_index.contains_key(&id) {
            return Err(ActorError::AlreadyRegistered(id));
        }

        let index = match self.free_list.pop() {
            Some(free) => {
                self.slots[free] = Some(enemy);
                free
            },
            None => {
                self.slots.push(Some(enemy));
                self.slots.len() - 1
            },
        };
        self.id_to_index.insert(id, index);
        Ok(id)
    }

    /// Removes an enemy and returns it.
    pub fn remove(&mut self, id: EntityId) -> ActorResult<Enemy> {
        let index = self.id_to_index.remove(&id).ok_or(ActorError::NotFound(id))?;
        let enemy = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(ActorError::NotFound(id))?;
        self.free_list.push(index);
        Ok(enemy)
    }

    /// Looks up an enemy.
    pub fn get(&self, id: EntityId) -> ActorResult<&Enemy> {
        let index = self.id_to_index.get(&id).ok_or(ActorError::NotFound(id))?;
        self.slots
            .get(*index)
            .and_then(Option::as_ref)
            .ok_or(ActorError::NotFound(id))
    }

    /// Looks up an enemy mutably.
    pub fn get_mut(&mut self, id: EntityId) -> ActorResult<&mut Enemy> {
        let index = self.id_to_index.get(&id).ok_or(ActorError::NotFound(id))?;
        self.slots
            .get_mut(*index)
            .and_then(Option::as_mut)
            .ok_or(ActorError::NotFound(id))
    }

    /// True if an enemy with this ID is stored.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    /// Iterates enemies in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Iterates enemies mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// IDs in slot order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(Enemy::id).collect()
    }

    /// Removes every enemy.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.id_to_index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::ArchetypeConfig;
    use thornvale_common::Vec2;

    fn grunt(x: f32) -> Enemy {
        Enemy::spawn(&ArchetypeConfig::melee_grunt(), Vec2::new(x, 0.0)).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut arena = EnemyArena::new();
        let id = arena.insert(grunt(1.0)).unwrap();
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(id).map(Enemy::position), Ok(Vec2::new(1.0, 0.0)));
        assert!(arena.contains(id));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut arena = EnemyArena::new();
        let enemy = grunt(0.0);
        let copy = enemy.clone();
        let id = arena.insert(enemy).unwrap();
        assert_eq!(arena.insert(copy).unwrap_err(), ActorError::AlreadyRegistered(id));
    }

    #[test]
    fn test_remove_reuses_slot() {
        let mut arena = EnemyArena::with_capacity(4);
        let first = arena.insert(grunt(0.0)).unwrap();
        let second = arena.insert(grunt(1.0)).unwrap();
        arena.remove(first).unwrap();
        assert_eq!(arena.remove(first).unwrap_err(), ActorError::NotFound(first));

        let third = arena.insert(grunt(2.0)).unwrap();
        assert_eq!(arena.ids(), vec![third, second]);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_missing_lookup() {
        let mut arena = EnemyArena::new();
        let id = EntityId::from_raw(77);
        assert!(matches!(arena.get(id), Err(ActorError::NotFound(_))));
        assert!(arena.get_mut(id).is_err());
        arena.clear();
        assert!(arena.is_empty());
    }
}
