//! Last known safe footing, used to put the player back after pits and spikes.

use serde::{Deserialize, Serialize};
use thornvale_common::{LayerMask, Vec2};

use crate::physics::PhysicsQuery;
use crate::timers::{Cooldown, Seconds};

/// Sampling rules for safe ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeGroundConfig {
    /// Seconds between samples
    pub interval: Seconds,
    /// Max |vy| for a sample to count as standing still
    pub max_vertical_speed: f32,
    /// No hazard may be this close to a safe position
    pub hazard_clearance: f32,
    /// Input freeze after being put back
    pub respawn_freeze: Seconds,
}

impl Default for SafeGroundConfig {
    fn default() -> Self {
        Self {
            interval: 0.5,
            max_vertical_speed: 0.1,
            hazard_clearance: 1.0,
            respawn_freeze: 0.2,
        }
    }
}

/// Periodically records where the player stood safely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeGroundTracker {
    config: SafeGroundConfig,
    last_safe: Option<Vec2>,
    next_sample: Cooldown,
}

impl Default for SafeGroundTracker {
    fn default() -> Self {
        Self::new(SafeGroundConfig::default())
    }
}

impl SafeGroundTracker {
    /// Creates a tracker with no recorded position.
    #[must_use]
    pub fn new(config: SafeGroundConfig) -> Self {
        Self {
            config,
            last_safe: None,
            next_sample: Cooldown::ready(),
        }
    }

    /// Sampling rules.
    #[must_use]
    pub fn config(&self) -> &SafeGroundConfig {
        &self.config
    }

    /// Last recorded safe position.
    #[must_use]
    pub fn last_safe(&self) -> Option<Vec2> {
        self.last_safe
    }

    /// Forces the safe position (spawn points, checkpoints).
    pub fn set(&mut self, position: Vec2) {
        self.last_safe = Some(position);
    }

    /// Samples the current footing if the interval has elapsed. Returns true
    /// if a new safe position was recorded.
    pub fn update<Q: PhysicsQuery>(
        &mut self,
        now: Seconds,
        position: Vec2,
        velocity: Vec2,
        grounded: bool,
        physics: &Q,
    ) -> bool {
        if !self.next_sample.is_ready(now) {
            return false;
        }
        self.next_sample.trigger(now, self.config.interval);

        let steady = velocity.y.abs() <= self.config.max_vertical_speed;
        if !grounded || !steady {
            return false;
        }
        if !physics
            .overlap_circle(position, self.config.hazard_clearance, LayerMask::HAZARD)
            .is_empty()
        {
            return false;
        }
        self.last_safe = Some(position);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::MockPhysics;
    use thornvale_common::EntityId;

    #[test]
    fn test_records_when_grounded_and_still() {
        let physics = MockPhysics::new();
        let mut tracker = SafeGroundTracker::default();
        assert!(tracker.update(0.0, Vec2::new(3.0, 1.0), Vec2::ZERO, true, &physics));
        assert_eq!(tracker.last_safe(), Some(Vec2::new(3.0, 1.0)));
    }

    #[test]
    fn test_respects_interval() {
        let physics = MockPhysics::new();
        let mut tracker = SafeGroundTracker::default();
        tracker.update(0.0, Vec2::ZERO, Vec2::ZERO, true, &physics);
        assert!(!tracker.update(0.25, Vec2::new(1.0, 0.0), Vec2::ZERO, true, &physics));
        assert!(tracker.update(0.5, Vec2::new(2.0, 0.0), Vec2::ZERO, true, &physics));
        assert_eq!(tracker.last_safe(), Some(Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn test_rejects_airborne_moving_or_near_hazard() {
        let mut physics = MockPhysics::new();
        let mut tracker = SafeGroundTracker::default();
        assert!(!tracker.update(0.0, Vec2::ZERO, Vec2::ZERO, false, &physics));
        assert!(!tracker.update(1.0, Vec2::ZERO, Vec2::new(0.0, -3.0), true, &physics));

        physics.add_collider(EntityId::new(), Vec2::new(0.5, 0.0), 0.2, LayerMask::HAZARD);
        assert!(!tracker.update(2.0, Vec2::ZERO, Vec2::ZERO, true, &physics));
        assert_eq!(tracker.last_safe(), None);
    }
}
