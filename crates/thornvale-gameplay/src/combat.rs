//! Combat resolution.
//!
//! This module turns hits into consequences:
//! - Touch damage on contact (once per entry, or every tick for sustained sources)
//! - Melee hitbox resolution at the attack point
//! - Projectile hit resolution
//! - Reward handoff on death
//!
//! Nothing here keeps state between calls. Every change to a target goes
//! through its own [`Health::apply_damage`] and knockback entry point, reached
//! via [`CombatStorage`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use thornvale_common::{EntityId, ItemId, LayerMask, Vec2};

use crate::events::{ActorKind, EventBus, GameEvent};
use crate::health::{DamageOutcome, Health};
use crate::knockback::{direction_from_positions, direction_from_velocity, KnockbackProfile};
use crate::loot::LootTable;
use crate::physics::{ContactPhase, PhysicsQuery};
use crate::projectile::ProjectileHit;
use crate::timers::Seconds;

// ============================================================================
// Hit descriptions
// ============================================================================

/// A melee hitbox to resolve on the tick an attack strikes.
#[derive(Debug, Clone, PartialEq)]
pub struct MeleeStrike {
    /// Attacking actor (never hit by its own strike)
    pub attacker: EntityId,
    /// Attack point
    pub center: Vec2,
    /// Hitbox radius
    pub radius: f32,
    /// Raw damage
    pub damage: f32,
    /// Knockback profile
    pub knockback: KnockbackProfile,
    /// Horizontal knockback sign, from the attacker's facing
    pub direction_sign: f32,
    /// Layers that can be hit
    pub targets: LayerMask,
}

/// When a touching damage source deals damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TouchPolicy {
    /// Once per contact entry.
    #[default]
    OnEnter,
    /// Every tick of overlap; the mercy window rate-limits it.
    Sustained,
}

impl TouchPolicy {
    /// True if a contact in `phase` should deal damage.
    #[must_use]
    pub const fn applies(self, phase: ContactPhase) -> bool {
        match self {
            Self::OnEnter => matches!(phase, ContactPhase::Began),
            Self::Sustained => true,
        }
    }
}

/// Damage dealt by touching an actor or hazard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchDamage {
    /// Raw damage
    pub damage: f32,
    /// Knockback profile
    pub knockback: KnockbackProfile,
    /// When it applies
    pub policy: TouchPolicy,
}

impl TouchDamage {
    /// Creates an on-enter touch source.
    #[must_use]
    pub const fn new(damage: f32, knockback: KnockbackProfile) -> Self {
        Self {
            damage,
            knockback,
            policy: TouchPolicy::OnEnter,
        }
    }

    /// Sets the policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: TouchPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Result of resolving one hit against one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitReport {
    /// Target
    pub target: EntityId,
    /// What happened to its health
    pub outcome: DamageOutcome,
    /// Knockback delivered (zero if the hit was ignored)
    pub knockback: Vec2,
}

impl HitReport {
    /// True if the hit killed the target.
    #[must_use]
    pub fn killed(&self) -> bool {
        self.outcome.is_lethal()
    }
}

// ============================================================================
// Storage seam
// ============================================================================

/// Access to the damageable actors, implemented by the simulation.
pub trait CombatStorage {
    /// Actor position.
    fn position(&self, entity: EntityId) -> Option<Vec2>;
    /// Actor health, for damage intake.
    fn health_mut(&mut self, entity: EntityId) -> Option<&mut Health>;
    /// Delivers a knockback impulse to the actor's own state machine.
    fn apply_knockback(&mut self, entity: EntityId, impulse: Vec2);
}

/// Applies damage and knockback to `target`.
///
/// Knockback is only delivered when the hit registers.
pub fn resolve_hit<S: CombatStorage>(
    storage: &mut S,
    target: EntityId,
    damage: f32,
    knockback: KnockbackProfile,
    direction_sign: f32,
    now: Seconds,
) -> Option<HitReport> {
    let health = storage.health_mut(target)?;
    let resistance = health.knockback_resistance();
    let outcome = health.apply_damage(damage, now);

    let impulse = if outcome.landed() && !knockback.is_none() {
        knockback.vector(direction_sign, resistance)
    } else {
        Vec2::ZERO
    };
    if outcome.landed() {
        storage.apply_knockback(target, impulse);
    }
    Some(HitReport {
        target,
        outcome,
        knockback: impulse,
    })
}

/// Resolves a melee strike against everything inside its hitbox.
pub fn resolve_melee<S: CombatStorage, Q: PhysicsQuery>(
    strike: &MeleeStrike,
    physics: &Q,
    storage: &mut S,
    now: Seconds,
) -> Vec<HitReport> {
    let targets = physics.overlap_circle(strike.center, strike.radius, strike.targets);
    let reports: Vec<HitReport> = targets
        .into_iter()
        .filter(|id| *id != strike.attacker)
        .filter_map(|id| {
            resolve_hit(storage, id, strike.damage, strike.knockback, strike.direction_sign, now)
        })
        .collect();
    debug!(attacker = %strike.attacker, hits = reports.len(), "melee resolved");
    reports
}

/// Resolves a projectile that reached a target. The projectile is already gone.
pub fn resolve_projectile_hit<S: CombatStorage>(
    hit: &ProjectileHit,
    storage: &mut S,
    now: Seconds,
) -> Option<HitReport> {
    let sign = direction_from_velocity(hit.velocity);
    resolve_hit(storage, hit.target, hit.damage, hit.knockback, sign, now)
}

/// Resolves a touch contact from `source` (at `source_position`) onto `target`.
/// Returns `None` if the contact phase does not qualify under the policy.
pub fn resolve_touch<S: CombatStorage>(
    touch: &TouchDamage,
    source_position: Vec2,
    target: EntityId,
    phase: ContactPhase,
    storage: &mut S,
    now: Seconds,
) -> Option<HitReport> {
    if !touch.policy.applies(phase) || touch.damage <= 0.0 {
        return None;
    }
    let target_position = storage.position(target)?;
    let sign = direction_from_positions(source_position, target_position);
    resolve_hit(storage, target, touch.damage, touch.knockback, sign, now)
}

// ============================================================================
// Rewards
// ============================================================================

/// Progression and inventory hooks invoked on enemy death.
pub trait RewardHooks {
    /// Grants XP to the player.
    fn grant_xp(&mut self, amount: u32);
    /// Rolls a loot table; returns the dropped item, if any.
    fn grant_loot(&mut self, table: &LootTable, position: Vec2) -> Option<ItemId>;
}

/// What a dead actor leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathReport {
    /// Dead actor
    pub actor: EntityId,
    /// Kind of actor
    pub kind: ActorKind,
    /// Where it died
    pub position: Vec2,
    /// XP reward
    pub xp: u32,
    /// Optional loot table
    pub loot: Option<LootTable>,
}

/// What the reward handoff produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardOutcome {
    /// XP granted
    pub xp: u32,
    /// Item dropped
    pub item: Option<ItemId>,
}

/// Hands the rewards of a death to the progression and loot hooks.
///
/// Both are best effort: with no hooks, nothing is granted. Boss deaths publish
/// [`GameEvent::BossDefeated`] instead of the generic rewards.
pub fn hand_off_rewards<H: RewardHooks>(
    death: &DeathReport,
    hooks: Option<&mut H>,
    events: &EventBus,
) -> RewardOutcome {
    match death.kind {
        ActorKind::Boss => {
            events.publish(GameEvent::BossDefeated { boss: death.actor });
            RewardOutcome::default()
        },
        ActorKind::Player => RewardOutcome::default(),
        ActorKind::Enemy => {
            let Some(hooks) = hooks else {
                warn!(actor = %death.actor, "no reward receiver; rewards skipped");
                return RewardOutcome::default();
            };
            if death.xp > 0 {
                hooks.grant_xp(death.xp);
            }
            let item = death
                .loot
                .as_ref()
                .and_then(|table| hooks.grant_loot(table, death.position));
            if let Some(item) = item {
                events.publish(GameEvent::LootDropped {
                    item,
                    position: death.position,
                    source: death.actor,
                });
            }
            RewardOutcome { xp: death.xp, item }
        },
    }
}

// ============================================================================
// Mocks
// ============================================================================

#[cfg(test)]
use ahash::AHashMap;

/// In-memory combat storage for testing resolution in isolation.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockCombatStorage {
    /// Health and position per actor
    pub actors: AHashMap<EntityId, (Health, Vec2)>,
    /// Knockbacks delivered, in order
    pub knockbacks: Vec<(EntityId, Vec2)>,
}

#[cfg(test)]
impl MockCombatStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an actor.
    pub fn add_actor(&mut self, id: EntityId, health: Health, position: Vec2) {
        self.actors.insert(id, (health, position));
    }

    /// Looks up an actor's health.
    #[must_use]
    pub fn health(&self, id: EntityId) -> Option<&Health> {
        self.actors.get(&id).map(|(health, _)| health)
    }
}

#[cfg(test)]
impl CombatStorage for MockCombatStorage {
    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.actors.get(&entity).map(|(_, pos)| *pos)
    }

    fn health_mut(&mut self, entity: EntityId) -> Option<&mut Health> {
        self.actors.get_mut(&entity).map(|(health, _)| health)
    }

    fn apply_knockback(&mut self, entity: EntityId, impulse: Vec2) {
        self.knockbacks.push((entity, impulse));
    }
}

/// Reward hooks that record what they were asked to grant.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockRewards {
    /// XP grants
    pub xp: Vec<u32>,
    /// Roll used for every loot table
    pub roll: f32,
}

#[cfg(test)]
impl RewardHooks for MockRewards {
    fn grant_xp(&mut self, amount: u32) {
        self.xp.push(amount);
    }

    fn grant_loot(&mut self, table: &LootTable, _position: Vec2) -> Option<ItemId> {
        table.pick(self.roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthConfig, IgnoreReason};
    use crate::physics::MockPhysics;
    use crate::projectile::Faction;
    use proptest::prelude::*;

    fn storage_with(id: EntityId, position: Vec2, config: HealthConfig) -> MockCombatStorage {
        let mut storage = MockCombatStorage::new();
        storage.add_actor(id, Health::new(config), position);
        storage
    }

    #[test]
    fn test_melee_hits_inside_range_only() {
        let attacker = EntityId::new();
        let near = EntityId::new();
        let far = EntityId::new();
        let mut physics = MockPhysics::new();
        physics.add_collider(near, Vec2::new(1.0, 0.0), 0.0, LayerMask::PLAYER);
        physics.add_collider(far, Vec2::new(4.0, 0.0), 0.0, LayerMask::PLAYER);

        let mut storage = MockCombatStorage::new();
        storage.add_actor(near, Health::new(HealthConfig::new(100.0)), Vec2::new(1.0, 0.0));
        storage.add_actor(far, Health::new(HealthConfig::new(100.0)), Vec2::new(4.0, 0.0));

        let strike = MeleeStrike {
            attacker,
            center: Vec2::new(0.5, 0.0),
            radius: 0.8,
            damage: 10.0,
            knockback: KnockbackProfile::new(4.0, 2.0),
            direction_sign: 1.0,
            targets: LayerMask::PLAYER,
        };
        let reports = resolve_melee(&strike, &physics, &mut storage, 0.0);

        assert_eq!(reports.len(), 1);
        assert_eq!(storage.health(near).map(Health::current_hp), Some(90.0));
        assert_eq!(storage.health(far).map(Health::current_hp), Some(100.0));
        assert_eq!(storage.knockbacks, vec![(near, Vec2::new(4.0, 2.0))]);
    }

    #[test]
    fn test_melee_skips_attacker() {
        let attacker = EntityId::new();
        let mut physics = MockPhysics::new();
        physics.add_collider(attacker, Vec2::ZERO, 0.5, LayerMask::ENEMY);
        let mut storage = storage_with(attacker, Vec2::ZERO, HealthConfig::new(50.0));
        let strike = MeleeStrike {
            attacker,
            center: Vec2::ZERO,
            radius: 1.0,
            damage: 10.0,
            knockback: KnockbackProfile::NONE,
            direction_sign: 1.0,
            targets: LayerMask::ENEMY,
        };
        assert!(resolve_melee(&strike, &physics, &mut storage, 0.0).is_empty());
    }

    #[test]
    fn test_resistance_scales_knockback() {
        let target = EntityId::new();
        let mut storage = storage_with(
            target,
            Vec2::ZERO,
            HealthConfig::new(100.0).with_knockback_resistance(0.75),
        );
        let report = resolve_hit(&mut storage, target, 5.0, KnockbackProfile::new(8.0, 4.0), -1.0, 0.0);
        assert_eq!(report.map(|r| r.knockback), Some(Vec2::new(-2.0, 1.0)));
    }

    #[test]
    fn test_invincible_target_gets_no_knockback() {
        let target = EntityId::new();
        let mut storage = storage_with(target, Vec2::ZERO, HealthConfig::new(100.0));
        if let Some(health) = storage.health_mut(target) {
            health.set_invincible(true);
        }
        let report = resolve_hit(&mut storage, target, 5.0, KnockbackProfile::new(8.0, 4.0), 1.0, 0.0);
        assert_eq!(
            report.map(|r| r.outcome),
            Some(DamageOutcome::Ignored(IgnoreReason::Invincible))
        );
        assert!(storage.knockbacks.is_empty());
    }

    #[test]
    fn test_projectile_knockback_follows_velocity() {
        let target = EntityId::new();
        let mut storage = storage_with(target, Vec2::ZERO, HealthConfig::new(100.0));
        let hit = ProjectileHit {
            projectile: EntityId::new(),
            owner: EntityId::new(),
            faction: Faction::Enemy,
            target,
            damage: 10.0,
            knockback: KnockbackProfile::new(5.0, 2.0),
            velocity: Vec2::new(-7.0, 0.0),
            position: Vec2::ZERO,
        };
        let report = resolve_projectile_hit(&hit, &mut storage, 0.0);
        assert_eq!(report.map(|r| r.knockback), Some(Vec2::new(-5.0, 2.0)));
        assert_eq!(storage.health(target).map(Health::current_hp), Some(90.0));
    }

    #[test]
    fn test_touch_once_per_entry() {
        let target = EntityId::new();
        let mut storage = storage_with(
            target,
            Vec2::new(1.0, 0.0),
            HealthConfig::new(100.0).with_mercy_time(0.0),
        );
        let touch = TouchDamage::new(5.0, KnockbackProfile::new(3.0, 1.0));

        let first = resolve_touch(&touch, Vec2::ZERO, target, ContactPhase::Began, &mut storage, 0.0);
        assert_eq!(first.map(|r| r.knockback), Some(Vec2::new(3.0, 1.0)));
        let held = resolve_touch(&touch, Vec2::ZERO, target, ContactPhase::Persisted, &mut storage, 0.5);
        assert!(held.is_none());
        assert_eq!(storage.health(target).map(Health::current_hp), Some(95.0));
    }

    #[test]
    fn test_sustained_touch_limited_by_mercy() {
        let target = EntityId::new();
        let mut storage = storage_with(
            target,
            Vec2::ZERO,
            HealthConfig::new(100.0).with_mercy_time(1.0),
        );
        let touch = TouchDamage::new(5.0, KnockbackProfile::NONE).with_policy(TouchPolicy::Sustained);
        for i in 0..8 {
            let now = i as Seconds * 0.25;
            resolve_touch(&touch, Vec2::ZERO, target, ContactPhase::Persisted, &mut storage, now);
        }
        // Hits land at t = 0 and t = 1.0 only.
        assert_eq!(storage.health(target).map(Health::current_hp), Some(90.0));
    }

    #[test]
    fn test_rewards_for_enemy() {
        let bus = EventBus::default();
        let mut hooks = MockRewards {
            roll: 10.0,
            ..MockRewards::default()
        };
        let death = DeathReport {
            actor: EntityId::new(),
            kind: ActorKind::Enemy,
            position: Vec2::new(3.0, 0.0),
            xp: 20,
            loot: Some(LootTable::new().with_entry(ItemId::POTION, 25.0)),
        };
        let outcome = hand_off_rewards(&death, Some(&mut hooks), &bus);
        assert_eq!(outcome, RewardOutcome { xp: 20, item: Some(ItemId::POTION) });
        assert_eq!(hooks.xp, vec![20]);
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, GameEvent::LootDropped { item, .. } if *item == ItemId::POTION)));
    }

    #[test]
    fn test_rewards_degrade_without_hooks() {
        let bus = EventBus::default();
        let death = DeathReport {
            actor: EntityId::new(),
            kind: ActorKind::Enemy,
            position: Vec2::ZERO,
            xp: 20,
            loot: None,
        };
        let outcome = hand_off_rewards::<MockRewards>(&death, None, &bus);
        assert_eq!(outcome, RewardOutcome::default());
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_boss_death_publishes_defeat_instead_of_rewards() {
        let bus = EventBus::default();
        let mut hooks = MockRewards::default();
        let boss = EntityId::new();
        let death = DeathReport {
            actor: boss,
            kind: ActorKind::Boss,
            position: Vec2::ZERO,
            xp: 500,
            loot: None,
        };
        hand_off_rewards(&death, Some(&mut hooks), &bus);
        assert!(hooks.xp.is_empty());
        assert_eq!(bus.drain(), vec![GameEvent::BossDefeated { boss }]);
    }

    proptest! {
        #[test]
        fn prop_touch_knockback_points_away(
            attacker_x in -50.0f32..50.0,
            offset in 0.01f32..20.0,
            left in any::<bool>(),
            horizontal in 0.1f32..20.0,
        ) {
            let target_x = if left { attacker_x - offset } else { attacker_x + offset };
            let target = EntityId::new();
            let mut storage = storage_with(target, Vec2::new(target_x, 0.0), HealthConfig::new(100.0));
            let touch = TouchDamage::new(1.0, KnockbackProfile::new(horizontal, 0.0));
            let report = resolve_touch(
                &touch,
                Vec2::new(attacker_x, 0.0),
                target,
                ContactPhase::Began,
                &mut storage,
                0.0,
            );
            let push = report.map_or(0.0, |r| r.knockback.x);
            prop_assert_eq!(push.signum(), (target_x - attacker_x).signum());
        }
    }
}
