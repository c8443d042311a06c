//! Damage and knockback model.
//!
//! Pure functions that turn an attack and a target into a damage amount and a
//! force vector. Nothing here owns state.

use serde::{Deserialize, Serialize};
use thornvale_common::{horizontal_sign, Facing, Vec2};

/// Configured (horizontal, vertical) impulse of an attack before direction and
/// resistance are applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KnockbackProfile {
    /// Horizontal impulse magnitude
    pub horizontal: f32,
    /// Vertical impulse magnitude
    pub vertical: f32,
}

impl KnockbackProfile {
    /// No knockback.
    pub const NONE: Self = Self::new(0.0, 0.0);

    /// Creates a new profile.
    #[must_use]
    pub const fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// True if the profile produces no force.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.horizontal == 0.0 && self.vertical == 0.0
    }

    /// Force vector for the given direction sign and target resistance.
    #[must_use]
    pub fn vector(&self, direction_sign: f32, resistance: f32) -> Vec2 {
        knockback_vector(*self, direction_sign, resistance)
    }

    /// Profile with both components multiplied.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.horizontal * factor, self.vertical * factor)
    }
}

/// Damage left after the target's flat defense. Never negative.
#[must_use]
pub fn final_damage(amount: f32, defense: f32) -> f32 {
    (amount - defense).max(0.0)
}

/// `(profile.x * sign, profile.y) * (1 - resistance)`.
///
/// `direction_sign` is normalized to ±1 and resistance is clamped to [0, 1].
#[must_use]
pub fn knockback_vector(profile: KnockbackProfile, direction_sign: f32, resistance: f32) -> Vec2 {
    let sign = if direction_sign < 0.0 { -1.0 } else { 1.0 };
    let scale = 1.0 - resistance.clamp(0.0, 1.0);
    Vec2::new(profile.horizontal * sign, profile.vertical) * scale
}

/// Direction that pushes a target away from its attacker.
#[must_use]
pub fn direction_from_positions(attacker: Vec2, target: Vec2) -> f32 {
    horizontal_sign(attacker, target)
}

/// Direction derived from the attacker's facing, inverted for mirrored sprites.
#[must_use]
pub fn direction_from_facing(facing: Facing, mirrored: bool) -> f32 {
    if mirrored {
        -facing.sign()
    } else {
        facing.sign()
    }
}

/// Direction of travel of a projectile.
#[must_use]
pub fn direction_from_velocity(velocity: Vec2) -> f32 {
    if velocity.x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Damage and force delivered to a single target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitPayload {
    /// Raw damage before the target's defense
    pub damage: f32,
    /// Knockback force after resistance
    pub knockback: Vec2,
}

impl HitPayload {
    /// Builds the payload for a hit.
    #[must_use]
    pub fn new(damage: f32, profile: KnockbackProfile, direction_sign: f32, resistance: f32) -> Self {
        Self {
            damage,
            knockback: knockback_vector(profile, direction_sign, resistance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_final_damage_floors_at_zero() {
        assert_eq!(final_damage(30.0, 0.0), 30.0);
        assert_eq!(final_damage(30.0, 10.0), 20.0);
        assert_eq!(final_damage(5.0, 10.0), 0.0);
    }

    #[test]
    fn test_knockback_vector_resistance() {
        let profile = KnockbackProfile::new(8.0, 5.0);
        assert_eq!(profile.vector(1.0, 0.0), Vec2::new(8.0, 5.0));
        assert_eq!(profile.vector(-1.0, 0.0), Vec2::new(-8.0, 5.0));
        assert_eq!(profile.vector(1.0, 0.5), Vec2::new(4.0, 2.5));
        assert_eq!(profile.vector(1.0, 1.0), Vec2::ZERO);
        assert_eq!(profile.vector(1.0, 3.0), Vec2::ZERO);
    }

    #[test]
    fn test_direction_from_facing_mirrored() {
        assert_eq!(direction_from_facing(Facing::Right, false), 1.0);
        assert_eq!(direction_from_facing(Facing::Right, true), -1.0);
        assert_eq!(direction_from_facing(Facing::Left, true), 1.0);
    }

    #[test]
    fn test_direction_from_velocity() {
        assert_eq!(direction_from_velocity(Vec2::new(-7.0, 0.0)), -1.0);
        assert_eq!(direction_from_velocity(Vec2::new(7.0, 1.0)), 1.0);
    }

    proptest! {
        #[test]
        fn prop_knockback_pushes_away_from_attacker(
            attacker_x in -100.0f32..100.0,
            target_x in -100.0f32..100.0,
            horizontal in 0.1f32..50.0,
            resistance in 0.0f32..0.99,
        ) {
            prop_assume!((target_x - attacker_x).abs() > 1e-3);
            let sign = direction_from_positions(Vec2::new(attacker_x, 0.0), Vec2::new(target_x, 0.0));
            let force = knockback_vector(KnockbackProfile::new(horizontal, 2.0), sign, resistance);
            prop_assert_eq!(force.x.signum(), (target_x - attacker_x).signum());
        }

        #[test]
        fn prop_final_damage_never_negative(amount in -50.0f32..500.0, defense in 0.0f32..200.0) {
            prop_assert!(final_damage(amount, defense) >= 0.0);
        }
    }
}
