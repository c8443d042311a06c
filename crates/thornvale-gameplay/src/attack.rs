//! Attack definitions and the wind-up/active/recovery routine.
//!
//! An attack is an explicit phase machine whose boundaries are fixed when it
//! starts. Cancelling (e.g. on being hurt) is a phase reset.

use serde::{Deserialize, Serialize};

use crate::knockback::KnockbackProfile;
use crate::timers::Seconds;

// ============================================================================
// Attack Phases
// ============================================================================

/// Phase of an attack routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Telegraph before the strike.
    Windup,
    /// Damage window.
    Active,
    /// Recovering after the strike.
    Recovery,
    /// Attack complete.
    Complete,
    /// Attack was cancelled.
    Cancelled,
}

impl AttackPhase {
    /// Check if attack can deal damage.
    #[must_use]
    pub fn can_damage(&self) -> bool {
        *self == Self::Active
    }

    /// Check if attack is finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }

    /// Check if attack can be cancelled.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        !self.is_finished()
    }
}

// ============================================================================
// Attack Definition
// ============================================================================

/// Static description of an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackDefinition {
    /// Raw damage
    pub damage: f32,
    /// Reach of the hitbox (melee) or trigger distance
    pub range: f32,
    /// Attacks per second
    pub rate: f32,
    /// Telegraph duration
    pub windup: Seconds,
    /// Damage window duration
    pub active: Seconds,
    /// Recovery duration
    pub recovery: Seconds,
    /// Knockback applied to targets
    pub knockback: KnockbackProfile,
    /// Spawns a projectile instead of a hitbox
    pub is_ranged: bool,
    /// Projectile speed for ranged attacks
    pub projectile_speed: Option<f32>,
}

impl Default for AttackDefinition {
    fn default() -> Self {
        Self {
            damage: 10.0,
            range: 0.8,
            rate: 1.0,
            windup: 0.0,
            active: 0.1,
            recovery: 0.0,
            knockback: KnockbackProfile::new(5.0, 2.0),
            is_ranged: false,
            projectile_speed: None,
        }
    }
}

impl AttackDefinition {
    /// Creates a melee attack.
    #[must_use]
    pub fn melee(damage: f32, range: f32, rate: f32) -> Self {
        Self {
            damage,
            range,
            rate,
            ..Self::default()
        }
    }

    /// Creates a ranged attack.
    #[must_use]
    pub fn ranged(damage: f32, rate: f32, projectile_speed: f32) -> Self {
        Self {
            damage,
            rate,
            is_ranged: true,
            projectile_speed: Some(projectile_speed),
            ..Self::default()
        }
    }

    /// Sets phase timings.
    #[must_use]
    pub fn with_timing(mut self, windup: Seconds, active: Seconds, recovery: Seconds) -> Self {
        self.windup = windup.max(0.0);
        self.active = active.max(0.0);
        self.recovery = recovery.max(0.0);
        self
    }

    /// Sets knockback.
    #[must_use]
    pub fn with_knockback(mut self, knockback: KnockbackProfile) -> Self {
        self.knockback = knockback;
        self
    }

    /// Seconds between attacks (`1 / rate`).
    #[must_use]
    pub fn cooldown(&self) -> Seconds {
        1.0 / self.rate.max(1e-3)
    }

    /// Total routine length.
    #[must_use]
    pub fn total_duration(&self) -> Seconds {
        self.windup + self.active + self.recovery
    }

    /// Copy with cadence multiplied: faster rate and shorter phases.
    #[must_use]
    pub fn hastened(&self, factor: f32) -> Self {
        let factor = factor.max(0.1);
        Self {
            rate: self.rate * factor,
            windup: self.windup / factor,
            active: self.active / factor,
            recovery: self.recovery / factor,
            ..self.clone()
        }
    }

    /// Clamps values to sane ranges.
    pub fn validate(&mut self) {
        self.damage = self.damage.max(0.0);
        self.range = self.range.max(0.0);
        self.rate = self.rate.max(1e-3);
        self.windup = self.windup.max(0.0);
        self.active = self.active.max(0.0);
        self.recovery = self.recovery.max(0.0);
    }
}

// ============================================================================
// Attack Routine
// ============================================================================

/// Result of advancing a routine by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineStep {
    /// Phase after advancing
    pub phase: AttackPhase,
    /// True on the single tick the strike resolves
    pub strike: bool,
}

/// An in-progress attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackRoutine {
    started_at: Seconds,
    windup_end: Seconds,
    active_end: Seconds,
    recovery_end: Seconds,
    struck: bool,
    phase: AttackPhase,
}

impl AttackRoutine {
    /// Starts a routine for `definition` at `now`.
    #[must_use]
    pub fn start(now: Seconds, definition: &AttackDefinition) -> Self {
        Self::with_phases(now, definition.windup, definition.active, definition.recovery)
    }

    /// Starts a routine with explicit phase lengths.
    #[must_use]
    pub fn with_phases(now: Seconds, windup: Seconds, active: Seconds, recovery: Seconds) -> Self {
        let windup_end = now + windup.max(0.0);
        let active_end = windup_end + active.max(0.0);
        Self {
            started_at: now,
            windup_end,
            active_end,
            recovery_end: active_end + recovery.max(0.0),
            struck: false,
            phase: AttackPhase::Windup,
        }
    }

    /// Advances to `now`. The strike fires exactly once, on the first tick at or
    /// past the end of the wind-up, even if the active window was skipped over.
    pub fn advance(&mut self, now: Seconds) -> RoutineStep {
        if self.phase.is_finished() {
            return RoutineStep {
                phase: self.phase,
                strike: false,
            };
        }

        let strike = !self.struck && now >= self.windup_end;
        if strike {
            self.struck = true;
        }

        self.phase = if now < self.windup_end {
            AttackPhase::Windup
        } else if now < self.active_end {
            AttackPhase::Active
        } else if now < self.recovery_end {
            AttackPhase::Recovery
        } else {
            AttackPhase::Complete
        };

        RoutineStep {
            phase: self.phase,
            strike,
        }
    }

    /// Cancels the routine. A strike that has not fired never will.
    pub fn cancel(&mut self) {
        if self.phase.can_cancel() {
            self.phase = AttackPhase::Cancelled;
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// True once complete or cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    /// True once the strike has fired.
    #[must_use]
    pub fn has_struck(&self) -> bool {
        self.struck
    }

    /// Time the routine started.
    #[must_use]
    pub fn started_at(&self) -> Seconds {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_phase_queries() {
        assert!(AttackPhase::Active.can_damage());
        assert!(!AttackPhase::Windup.can_damage());
        assert!(AttackPhase::Cancelled.is_finished());
        assert!(AttackPhase::Recovery.can_cancel());
        assert!(!AttackPhase::Complete.can_cancel());
    }

    #[test]
    fn test_routine_phases_and_single_strike() {
        let def = AttackDefinition::melee(10.0, 0.8, 1.0).with_timing(0.5, 0.25, 0.5);
        let mut routine = AttackRoutine::start(1.0, &def);

        let step = routine.advance(1.25);
        assert_eq!(step.phase, AttackPhase::Windup);
        assert!(!step.strike);

        let step = routine.advance(1.5);
        assert_eq!(step.phase, AttackPhase::Active);
        assert!(step.strike);

        let step = routine.advance(1.625);
        assert!(!step.strike);

        assert_eq!(routine.advance(1.875).phase, AttackPhase::Recovery);
        assert_eq!(routine.advance(2.25).phase, AttackPhase::Complete);
        assert!(routine.is_finished());
    }

    #[test]
    fn test_zero_length_routine_strikes_immediately() {
        let def = AttackDefinition::melee(10.0, 0.8, 2.0).with_timing(0.0, 0.0, 0.0);
        let mut routine = AttackRoutine::start(0.0, &def);
        let step = routine.advance(0.0);
        assert!(step.strike);
        assert_eq!(step.phase, AttackPhase::Complete);
    }

    #[test]
    fn test_cancel_during_windup_never_strikes() {
        let def = AttackDefinition::melee(10.0, 0.8, 1.0).with_timing(0.4, 0.1, 0.5);
        let mut routine = AttackRoutine::start(0.0, &def);
        routine.advance(0.2);
        routine.cancel();
        let step = routine.advance(0.5);
        assert_eq!(step.phase, AttackPhase::Cancelled);
        assert!(!step.strike);
        assert!(!routine.has_struck());
    }

    #[test]
    fn test_definition_cooldown_and_haste() {
        let def = AttackDefinition::ranged(10.0, 2.0, 10.0).with_timing(0.4, 0.0, 0.2);
        assert!((def.cooldown() - 0.5).abs() < 1e-6);

        let fast = def.hastened(2.0);
        assert!((fast.cooldown() - 0.25).abs() < 1e-6);
        assert!((fast.windup - 0.2).abs() < 1e-6);
        assert_eq!(fast.damage, 10.0);
    }
}
