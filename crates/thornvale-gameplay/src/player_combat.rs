//! Player weapons and attack timing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use thornvale_common::{EntityId, Facing, LayerMask, Vec2};

use crate::attack::{AttackDefinition, AttackRoutine};
use crate::combat::MeleeStrike;
use crate::knockback::KnockbackProfile;
use crate::projectile::{Faction, ProjectileSpec, SpawnRequest};
use crate::timers::{Cooldown, Seconds};

/// A weapon the player can wield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponData {
    /// Display name
    pub name: String,
    /// Damage, reach, cadence and knockback
    pub attack: AttackDefinition,
    /// Distance of the attack point (or muzzle) in front of the player
    pub reach_offset: f32,
    /// Projectile fired by ranged weapons
    pub projectile: Option<ProjectileSpec>,
}

impl Default for WeaponData {
    fn default() -> Self {
        Self::sword()
    }
}

impl WeaponData {
    /// Starting melee weapon.
    #[must_use]
    pub fn sword() -> Self {
        Self {
            name: "Sword".into(),
            attack: AttackDefinition::melee(20.0, 0.5, 2.0)
                .with_timing(0.0, 0.1, 0.15)
                .with_knockback(KnockbackProfile::new(4.0, 2.0)),
            reach_offset: 0.6,
            projectile: None,
        }
    }

    /// Basic ranged weapon.
    #[must_use]
    pub fn blaster() -> Self {
        let spec = ProjectileSpec::player_bullet();
        Self {
            name: "Blaster".into(),
            attack: AttackDefinition::ranged(spec.damage, 3.0, spec.speed).with_timing(0.0, 0.0, 0.1),
            reach_offset: 0.5,
            projectile: Some(spec),
        }
    }

    /// True for weapons that fire projectiles.
    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.attack.is_ranged
    }
}

/// What a player attack produced on the tick it struck.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStrike {
    /// Melee hitbox to resolve against enemies.
    Melee(MeleeStrike),
    /// Projectile to spawn.
    Ranged(SpawnRequest),
}

/// Weapon state of the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCombat {
    weapon: WeaponData,
    cooldown: Cooldown,
    routine: Option<AttackRoutine>,
}

impl Default for PlayerCombat {
    fn default() -> Self {
        Self::new(WeaponData::sword())
    }
}

impl PlayerCombat {
    /// Creates combat state wielding `weapon`.
    #[must_use]
    pub fn new(weapon: WeaponData) -> Self {
        Self {
            weapon,
            cooldown: Cooldown::ready(),
            routine: None,
        }
    }

    /// Equipped weapon.
    #[must_use]
    pub fn weapon(&self) -> &WeaponData {
        &self.weapon
    }

    /// Swaps weapons, dropping any attack in progress.
    pub fn equip(&mut self, mut weapon: WeaponData) {
        weapon.attack.validate();
        debug!(weapon = %weapon.name, "weapon equipped");
        self.weapon = weapon;
        self.routine = None;
    }

    /// True while an attack routine is running.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.routine.as_ref().is_some_and(|r| !r.is_finished())
    }

    /// True if an attack may start at `now`.
    #[must_use]
    pub fn can_attack(&self, now: Seconds) -> bool {
        self.cooldown.is_ready(now) && !self.is_attacking()
    }

    /// Drops any attack in progress (e.g. when knocked back).
    pub fn cancel(&mut self) {
        if let Some(routine) = self.routine.as_mut() {
            routine.cancel();
        }
    }

    /// Starts an attack if requested and allowed, then advances the routine.
    /// Attacks attempted during cooldown are silently ignored.
    pub fn tick(
        &mut self,
        owner: EntityId,
        attack_pressed: bool,
        position: Vec2,
        facing: Facing,
        now: Seconds,
    ) -> Option<PlayerStrike> {
        if attack_pressed && self.can_attack(now) {
            self.routine = Some(AttackRoutine::start(now, &self.weapon.attack));
            self.cooldown.trigger(now, self.weapon.attack.cooldown());
        }

        let step = self.routine.as_mut()?.advance(now);
        if !step.strike {
            return None;
        }

        let point = position + facing.as_vec2() * self.weapon.reach_offset;
        let strike = match &self.weapon.projectile {
            Some(spec) if self.weapon.is_ranged() => PlayerStrike::Ranged(SpawnRequest {
                owner,
                faction: Faction::Player,
                origin: point,
                direction: facing.as_vec2(),
                spec: ProjectileSpec {
                    damage: self.weapon.attack.damage,
                    speed: self.weapon.attack.projectile_speed.unwrap_or(spec.speed),
                    ..spec.clone()
                },
            }),
            _ => PlayerStrike::Melee(MeleeStrike {
                attacker: owner,
                center: point,
                radius: self.weapon.attack.range,
                damage: self.weapon.attack.damage,
                knockback: self.weapon.attack.knockback,
                direction_sign: facing.sign(),
                targets: LayerMask::ENEMY,
            }),
        };
        Some(strike)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sword_strikes_in_front() {
        let mut combat = PlayerCombat::default();
        let owner = EntityId::new();
        let strike = combat.tick(owner, true, Vec2::new(1.0, 0.0), Facing::Left, 0.0);
        match strike {
            Some(PlayerStrike::Melee(hit)) => {
                assert!((hit.center.x - 0.4).abs() < 1e-6);
                assert_eq!(hit.damage, 20.0);
                assert_eq!(hit.direction_sign, -1.0);
                assert_eq!(hit.targets, LayerMask::ENEMY);
            },
            other => panic!("expected melee strike, got {other:?}"),
        }
    }

    #[test]
    fn test_cooldown_blocks_spam() {
        let mut combat = PlayerCombat::default();
        let owner = EntityId::new();
        assert!(combat.tick(owner, true, Vec2::ZERO, Facing::Right, 0.0).is_some());
        assert!(combat.tick(owner, true, Vec2::ZERO, Facing::Right, 0.25).is_none());
        assert!(combat.tick(owner, false, Vec2::ZERO, Facing::Right, 0.375).is_none());
        assert!(combat.tick(owner, true, Vec2::ZERO, Facing::Right, 0.5).is_some());
    }

    #[test]
    fn test_ranged_weapon_fires_projectile() {
        let mut combat = PlayerCombat::new(WeaponData::blaster());
        let owner = EntityId::new();
        match combat.tick(owner, true, Vec2::ZERO, Facing::Right, 0.0) {
            Some(PlayerStrike::Ranged(request)) => {
                assert_eq!(request.faction, Faction::Player);
                assert_eq!(request.direction, Vec2::X);
                assert_eq!(request.spec.speed, 10.0);
                assert_eq!(request.origin, Vec2::new(0.5, 0.0));
            },
            other => panic!("expected projectile, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_drops_pending_strike() {
        let mut weapon = WeaponData::sword();
        weapon.attack.windup = 0.25;
        let mut combat = PlayerCombat::new(weapon);
        let owner = EntityId::new();
        assert!(combat.tick(owner, true, Vec2::ZERO, Facing::Right, 0.0).is_none());
        combat.cancel();
        assert!(combat.tick(owner, false, Vec2::ZERO, Facing::Right, 0.5).is_none());
        assert!(!combat.is_attacking());
    }
}
