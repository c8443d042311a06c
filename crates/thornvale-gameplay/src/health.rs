//! Health and invincibility component.
//!
//! Owned by every damageable actor. All HP changes go through
//! [`Health::apply_damage`] and [`Health::heal`]; the owning actor learns about
//! hits by draining [`HealthEvent`]s once per tick.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::knockback::final_damage;
use crate::timers::{blink_phase, Seconds, Timer};

/// Tunables for a health component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Maximum hit points
    pub max_hp: f32,
    /// Flat damage reduction
    pub defense: f32,
    /// Invincibility after a non-lethal hit
    pub mercy_time: Seconds,
    /// Toggle interval of the hit flash
    pub flash_interval: Seconds,
    /// Fraction of knockback ignored, in [0, 1]
    pub knockback_resistance: f32,
    /// Delay between death and removal from the simulation
    pub removal_delay: Seconds,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            defense: 0.0,
            mercy_time: 1.0,
            flash_interval: 0.1,
            knockback_resistance: 0.0,
            removal_delay: 2.0,
        }
    }
}

impl HealthConfig {
    /// Creates a config with the given max HP and default timings.
    #[must_use]
    pub fn new(max_hp: f32) -> Self {
        Self {
            max_hp,
            ..Self::default()
        }
    }

    /// Sets defense.
    #[must_use]
    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense = defense;
        self
    }

    /// Sets the mercy window length.
    #[must_use]
    pub fn with_mercy_time(mut self, mercy_time: Seconds) -> Self {
        self.mercy_time = mercy_time;
        self
    }

    /// Sets knockback resistance.
    #[must_use]
    pub fn with_knockback_resistance(mut self, resistance: f32) -> Self {
        self.knockback_resistance = resistance;
        self
    }

    /// Sets the removal delay after death.
    #[must_use]
    pub fn with_removal_delay(mut self, delay: Seconds) -> Self {
        self.removal_delay = delay;
        self
    }

    /// Clamps values to sane ranges.
    pub fn validate(&mut self) {
        self.max_hp = self.max_hp.max(1.0);
        self.defense = self.defense.max(0.0);
        self.mercy_time = self.mercy_time.max(0.0);
        self.flash_interval = self.flash_interval.max(0.0);
        self.knockback_resistance = self.knockback_resistance.clamp(0.0, 1.0);
        self.removal_delay = self.removal_delay.max(0.0);
    }
}

/// Why a damage call had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The actor is already dead.
    Dead,
    /// Mercy window or an external source holds invincibility.
    Invincible,
}

/// Result of a damage call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Nothing happened.
    Ignored(IgnoreReason),
    /// HP was reduced and the actor survived.
    Damaged {
        /// HP removed after defense
        dealt: f32,
        /// HP left
        remaining: f32,
    },
    /// This hit killed the actor.
    Killed {
        /// HP removed after defense
        dealt: f32,
    },
}

impl DamageOutcome {
    /// True if the hit registered (damaged or killed).
    #[must_use]
    pub fn landed(&self) -> bool {
        !matches!(self, Self::Ignored(_))
    }

    /// True if the hit killed the actor.
    #[must_use]
    pub fn is_lethal(&self) -> bool {
        matches!(self, Self::Killed { .. })
    }

    /// HP removed by the hit.
    #[must_use]
    pub fn dealt(&self) -> f32 {
        match self {
            Self::Ignored(_) => 0.0,
            Self::Damaged { dealt, .. } | Self::Killed { dealt } => *dealt,
        }
    }
}

/// Notification queued for the owning actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HealthEvent {
    /// A hit registered. Always queued before [`HealthEvent::Died`].
    Damaged {
        /// HP removed
        amount: f32,
        /// HP left
        remaining: f32,
    },
    /// HP reached zero.
    Died,
}

/// Health component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    config: HealthConfig,
    current_hp: f32,
    max_hp: f32,
    mercy: Timer,
    external_invincible: bool,
    died_at: Option<Seconds>,
    pending: Vec<HealthEvent>,
}

impl Health {
    /// Creates a component at full HP.
    #[must_use]
    pub fn new(mut config: HealthConfig) -> Self {
        config.validate();
        Self {
            current_hp: config.max_hp,
            max_hp: config.max_hp,
            config,
            mercy: Timer::idle(),
            external_invincible: false,
            died_at: None,
            pending: Vec::new(),
        }
    }

    /// Current hit points.
    #[must_use]
    pub fn current_hp(&self) -> f32 {
        self.current_hp
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max_hp(&self) -> f32 {
        self.max_hp
    }

    /// `current / max`, in [0, 1].
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current_hp / self.max_hp
    }

    /// Flat damage reduction.
    #[must_use]
    pub fn defense(&self) -> f32 {
        self.config.defense
    }

    /// Fraction of knockback ignored.
    #[must_use]
    pub fn knockback_resistance(&self) -> f32 {
        self.config.knockback_resistance
    }

    /// Component configuration.
    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// True once HP reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.died_at.is_some()
    }

    /// True while alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.died_at.is_none()
    }

    /// True while the mercy window is open.
    #[must_use]
    pub fn is_mercy_active(&self, now: Seconds) -> bool {
        self.mercy.is_running(now)
    }

    /// True if either the mercy window or an external source protects the actor.
    #[must_use]
    pub fn is_invincible(&self, now: Seconds) -> bool {
        self.external_invincible || self.is_mercy_active(now)
    }

    /// True if an external source (e.g. dashing) holds invincibility.
    #[must_use]
    pub fn is_externally_invincible(&self) -> bool {
        self.external_invincible
    }

    /// Visual flash flag for the presentation layer. Only toggles during mercy.
    #[must_use]
    pub fn is_flash_on(&self, now: Seconds) -> bool {
        match self.mercy.started_at() {
            Some(start) if self.mercy.is_running(now) => {
                blink_phase(start, now, self.config.flash_interval)
            },
            _ => false,
        }
    }

    /// Time of death, if dead.
    #[must_use]
    pub fn died_at(&self) -> Option<Seconds> {
        self.died_at
    }

    /// True once dead for longer than the removal delay.
    #[must_use]
    pub fn ready_for_removal(&self, now: Seconds) -> bool {
        self.died_at
            .is_some_and(|t| now - t >= self.config.removal_delay)
    }

    /// Applies a hit.
    ///
    /// Ignored when dead or invincible. Otherwise defense is subtracted, HP is
    /// clamped at zero, a [`HealthEvent::Damaged`] is queued, and then either
    /// death is entered (once) or the mercy window starts.
    pub fn apply_damage(&mut self, amount: f32, now: Seconds) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored(IgnoreReason::Dead);
        }
        if self.is_invincible(now) {
            return DamageOutcome::Ignored(IgnoreReason::Invincible);
        }

        let dealt = final_damage(amount, self.config.defense).min(self.current_hp);
        self.current_hp = (self.current_hp - dealt).max(0.0);
        self.pending.push(HealthEvent::Damaged {
            amount: dealt,
            remaining: self.current_hp,
        });

        if self.current_hp <= 0.0 {
            self.died_at = Some(now);
            self.mercy.cancel();
            self.pending.push(HealthEvent::Died);
            debug!("health depleted at t={now:.3}");
            return DamageOutcome::Killed { dealt };
        }

        self.mercy.start(now, self.config.mercy_time);
        DamageOutcome::Damaged {
            dealt,
            remaining: self.current_hp,
        }
    }

    /// Restores HP up to the maximum. Returns the amount healed; zero when dead.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.is_dead() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current_hp;
        self.current_hp = (self.current_hp + amount).min(self.max_hp);
        self.current_hp - before
    }

    /// Restores HP to the maximum. No effect when dead.
    pub fn heal_full(&mut self) {
        if self.is_alive() {
            self.current_hp = self.max_hp;
        }
    }

    /// External invincibility override. OR-composed with the mercy window.
    pub fn set_invincible(&mut self, invincible: bool) {
        self.external_invincible = invincible;
    }

    /// Raises max HP (level-up).
    pub fn raise_max(&mut self, amount: f32) {
        self.max_hp = (self.max_hp + amount).max(1.0);
        self.current_hp = self.current_hp.min(self.max_hp);
    }

    /// Brings a dead actor back at full HP. Clears all protection and queued events.
    pub fn revive(&mut self) {
        self.died_at = None;
        self.current_hp = self.max_hp;
        self.mercy.cancel();
        self.external_invincible = false;
        self.pending.clear();
    }

    /// Takes all queued notifications.
    pub fn drain_events(&mut self) -> Vec<HealthEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Number of queued notifications.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mercy_window_blocks_second_hit() {
        let mut health = Health::new(HealthConfig::new(100.0).with_mercy_time(1.0));

        let first = health.apply_damage(30.0, 0.0);
        assert_eq!(first, DamageOutcome::Damaged { dealt: 30.0, remaining: 70.0 });
        assert_eq!(health.current_hp(), 70.0);
        assert!(health.is_invincible(0.0));

        let second = health.apply_damage(30.0, 0.5);
        assert_eq!(second, DamageOutcome::Ignored(IgnoreReason::Invincible));
        assert_eq!(health.current_hp(), 70.0);

        assert!(!health.is_invincible(1.0));
        assert!(health.apply_damage(30.0, 1.0).landed());
        assert_eq!(health.current_hp(), 40.0);
    }

    #[test]
    fn test_defense_reduces_damage() {
        let mut health = Health::new(HealthConfig::new(100.0).with_defense(5.0));
        let outcome = health.apply_damage(12.0, 0.0);
        assert_eq!(outcome.dealt(), 7.0);
        assert_eq!(health.current_hp(), 93.0);
    }

    #[test]
    fn test_damage_event_precedes_death() {
        let mut health = Health::new(HealthConfig::new(10.0));
        let outcome = health.apply_damage(25.0, 3.0);
        assert!(outcome.is_lethal());
        assert_eq!(outcome.dealt(), 10.0);

        let events = health.drain_events();
        assert_eq!(
            events,
            vec![
                HealthEvent::Damaged { amount: 10.0, remaining: 0.0 },
                HealthEvent::Died
            ]
        );
        assert_eq!(health.died_at(), Some(3.0));
    }

    #[test]
    fn test_dead_actor_ignores_damage_and_heal() {
        let mut health = Health::new(HealthConfig::new(10.0));
        health.apply_damage(10.0, 0.0);
        health.drain_events();

        assert_eq!(health.apply_damage(5.0, 1.0), DamageOutcome::Ignored(IgnoreReason::Dead));
        assert_eq!(health.heal(50.0), 0.0);
        assert_eq!(health.current_hp(), 0.0);
        assert_eq!(health.pending_events(), 0);
    }

    #[test]
    fn test_external_invincibility_composes_with_mercy() {
        let mut health = Health::new(HealthConfig::new(100.0).with_mercy_time(1.0));
        health.apply_damage(10.0, 0.0);
        health.set_invincible(true);

        // Dropping the dash source keeps mercy protection.
        health.set_invincible(false);
        assert!(health.is_invincible(0.5));

        // Mercy lapsing while the dash source holds keeps protection.
        health.set_invincible(true);
        assert!(health.is_invincible(2.0));
        health.set_invincible(false);
        assert!(!health.is_invincible(2.0));
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut health = Health::new(HealthConfig::new(100.0));
        health.apply_damage(40.0, 0.0);
        assert_eq!(health.heal(25.0), 25.0);
        assert_eq!(health.heal(100.0), 15.0);
        assert_eq!(health.current_hp(), 100.0);
    }

    #[test]
    fn test_removal_delay() {
        let mut health = Health::new(HealthConfig::new(1.0).with_removal_delay(2.0));
        health.apply_damage(5.0, 1.0);
        assert!(!health.ready_for_removal(2.5));
        assert!(health.ready_for_removal(3.0));
    }

    #[test]
    fn test_flash_only_during_mercy() {
        let mut health = Health::new(HealthConfig::new(100.0).with_mercy_time(1.0));
        assert!(!health.is_flash_on(0.0));
        health.apply_damage(1.0, 0.0);
        assert!(health.is_flash_on(0.05));
        assert!(!health.is_flash_on(0.15));
        assert!(!health.is_flash_on(1.05));
    }

    #[test]
    fn test_revive_and_raise_max() {
        let mut health = Health::new(HealthConfig::new(50.0));
        health.apply_damage(60.0, 0.0);
        health.raise_max(20.0);
        health.revive();
        assert!(health.is_alive());
        assert_eq!(health.current_hp(), 70.0);
        assert_eq!(health.pending_events(), 0);
    }

    proptest! {
        #[test]
        fn prop_hp_stays_in_bounds(hits in proptest::collection::vec((-20.0f32..80.0, 0u8..3), 1..40)) {
            let mut health = Health::new(HealthConfig::new(100.0).with_mercy_time(0.0));
            let mut deaths = 0;
            let mut now = 0.0;
            for (amount, kind) in hits {
                now += 0.1;
                match kind {
                    0 => { health.apply_damage(amount, now); },
                    1 => { health.heal(amount); },
                    _ => { health.set_invincible(amount > 30.0); },
                }
                deaths += health
                    .drain_events()
                    .iter()
                    .filter(|e| matches!(e, HealthEvent::Died))
                    .count();
                prop_assert!(health.current_hp() >= 0.0);
                prop_assert!(health.current_hp() <= health.max_hp());
            }
            prop_assert!(deaths <= 1);
        }

        #[test]
        fn prop_damage_idempotent_once_dead(extra in proptest::collection::vec(0.0f32..100.0, 1..10)) {
            let mut health = Health::new(HealthConfig::new(10.0));
            health.apply_damage(10.0, 0.0);
            health.drain_events();
            for (i, amount) in extra.into_iter().enumerate() {
                let outcome = health.apply_damage(amount, 1.0 + i as f32);
                prop_assert_eq!(outcome, DamageOutcome::Ignored(IgnoreReason::Dead));
            }
            prop_assert_eq!(health.pending_events(), 0);
            prop_assert_eq!(health.died_at(), Some(0.0));
        }

        #[test]
        fn prop_invincibility_or_composed(
            dash_on in any::<bool>(),
            hit_at in 0.0f32..5.0,
            at in 0.0f32..8.0,
        ) {
            let mut health = Health::new(HealthConfig::new(1000.0).with_mercy_time(1.0));
            health.apply_damage(1.0, hit_at);
            health.set_invincible(dash_on);
            let mercy = health.is_mercy_active(at);
            prop_assert_eq!(health.is_invincible(at), dash_on || mercy);
        }
    }
}
