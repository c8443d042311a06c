//! Player experience and levels.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::health::Health;

/// Level curve and level-up rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Quadratic term of the XP curve
    pub quadratic: u32,
    /// Linear term of the XP curve
    pub linear: u32,
    /// Max HP gained per level
    pub hp_per_level: f32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            quadratic: 40,
            linear: 60,
            hp_per_level: 20.0,
        }
    }
}

/// Outcome of granting XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XpGain {
    /// Levels gained by this grant
    pub levels_gained: u32,
    /// Level after the grant
    pub level: u32,
    /// XP toward the next level after the grant
    pub xp: u32,
}

/// Level and XP of the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    level: u32,
    xp: u32,
    config: ProgressionConfig,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new(ProgressionConfig::default())
    }
}

impl Progression {
    /// Starts at level 1 with no XP.
    #[must_use]
    pub fn new(config: ProgressionConfig) -> Self {
        Self {
            level: 1,
            xp: 0,
            config,
        }
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// XP toward the next level.
    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    /// XP needed to leave `level`: `quadratic·L² + linear·L`.
    #[must_use]
    pub fn xp_required(&self, level: u32) -> u32 {
        let level = level.max(1);
        self.config
            .quadratic
            .saturating_mul(level.saturating_mul(level))
            .saturating_add(self.config.linear.saturating_mul(level))
    }

    /// XP needed to leave the current level.
    #[must_use]
    pub fn xp_to_next(&self) -> u32 {
        self.xp_required(self.level)
    }

    /// Adds XP, levelling up as many times as it covers. Leftover XP carries
    /// over; each level raises max HP and fully heals.
    pub fn grant_xp(&mut self, amount: u32, health: &mut Health) -> XpGain {
        self.xp = self.xp.saturating_add(amount);
        let mut levels_gained = 0;
        while self.xp >= self.xp_to_next() {
            self.xp -= self.xp_to_next();
            self.level += 1;
            levels_gained += 1;
            health.raise_max(self.config.hp_per_level);
            health.heal_full();
            info!(level = self.level, max_hp = health.max_hp(), "level up");
        }
        XpGain {
            levels_gained,
            level: self.level,
            xp: self.xp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthConfig;

    #[test]
    fn test_xp_curve() {
        let progression = Progression::default();
        assert_eq!(progression.xp_required(1), 100);
        assert_eq!(progression.xp_required(2), 280);
        assert_eq!(progression.xp_required(3), 540);
    }

    #[test]
    fn test_grant_without_level_up() {
        let mut progression = Progression::default();
        let mut health = Health::new(HealthConfig::new(100.0));
        let gain = progression.grant_xp(20, &mut health);
        assert_eq!(gain, XpGain { levels_gained: 0, level: 1, xp: 20 });
        assert_eq!(health.max_hp(), 100.0);
    }

    #[test]
    fn test_level_up_carries_leftover_and_heals() {
        let mut progression = Progression::default();
        let mut health = Health::new(HealthConfig::new(100.0));
        health.apply_damage(50.0, 0.0);

        let gain = progression.grant_xp(130, &mut health);
        assert_eq!(gain.levels_gained, 1);
        assert_eq!(progression.level(), 2);
        assert_eq!(progression.xp(), 30);
        assert_eq!(health.max_hp(), 120.0);
        assert_eq!(health.current_hp(), 120.0);
    }

    #[test]
    fn test_large_grant_gains_several_levels() {
        let mut progression = Progression::default();
        let mut health = Health::new(HealthConfig::new(100.0));
        let gain = progression.grant_xp(100 + 280 + 5, &mut health);
        assert_eq!(gain.levels_gained, 2);
        assert_eq!(gain.level, 3);
        assert_eq!(gain.xp, 5);
        assert_eq!(health.max_hp(), 140.0);
    }
}
