//! Timed trapdoors.
//!
//! A trapdoor is a platform that starts counting down the first time the
//! player touches it. It blinks as a warning, loses its collision for a while,
//! then comes back ready to trigger again. Stepping off does not stop the
//! countdown.

use serde::{Deserialize, Serialize};
use tracing::debug;

use thornvale_common::EntityId;

use crate::physics::{Aabb, Body};
use crate::timers::{blink_phase, Seconds, Timer};

/// Gap within which a body counts as touching the platform.
const CONTACT_MARGIN: f32 = 0.05;

/// Trapdoor timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapdoorConfig {
    /// Countdown from the first touch to the warning
    pub disappear_time: Seconds,
    /// Blinking warning before the platform vanishes; zero skips it
    pub warning_time: Seconds,
    /// Blinks during the warning
    pub blink_count: u32,
    /// Time the platform stays gone
    pub respawn_delay: Seconds,
}

impl Default for TrapdoorConfig {
    fn default() -> Self {
        Self {
            disappear_time: 3.0,
            warning_time: 1.0,
            blink_count: 5,
            respawn_delay: 3.0,
        }
    }
}

impl TrapdoorConfig {
    /// Clamps values to sane ranges.
    pub fn validate(&mut self) {
        self.disappear_time = self.disappear_time.max(0.0);
        self.warning_time = self.warning_time.max(0.0);
        self.blink_count = self.blink_count.max(1);
        self.respawn_delay = self.respawn_delay.max(0.0);
    }
}

/// Where a trapdoor is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrapdoorState {
    /// Solid, waiting for the player
    #[default]
    Ready,
    /// Solid, counting down
    Counting,
    /// Solid and blinking
    Warning,
    /// No collision until it respawns
    Gone,
}

/// Collision change the physics world must apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapdoorChange {
    /// The platform lost its collision
    Vanished,
    /// The platform is solid again
    Restored,
}

/// A platform that gives way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trapdoor {
    id: EntityId,
    bounds: Aabb,
    config: TrapdoorConfig,
    state: TrapdoorState,
    timer: Timer,
}

impl Trapdoor {
    /// Creates a ready trapdoor.
    #[must_use]
    pub fn new(bounds: Aabb, mut config: TrapdoorConfig) -> Self {
        config.validate();
        Self {
            id: EntityId::new(),
            bounds,
            config,
            state: TrapdoorState::Ready,
            timer: Timer::idle(),
        }
    }

    /// Trapdoor ID, shared with its physics platform.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Platform bounds.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> TrapdoorState {
        self.state
    }

    /// True unless the platform is gone.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        self.state != TrapdoorState::Gone
    }

    /// True if `body` rests on or presses against the platform.
    #[must_use]
    pub fn is_touched_by(&self, body: &Body) -> bool {
        self.is_solid() && self.bounds.expanded(CONTACT_MARGIN).overlaps(&body.aabb())
    }

    /// Starts the countdown if the trapdoor is ready.
    pub fn step_on(&mut self, now: Seconds) {
        if self.state == TrapdoorState::Ready {
            self.state = TrapdoorState::Counting;
            self.timer.start(now, self.config.disappear_time);
            debug!(trapdoor = %self.id, "trapdoor countdown started");
        }
    }

    /// Advances the cycle. Returns the collision change to apply, if any.
    pub fn tick(&mut self, now: Seconds) -> Option<TrapdoorChange> {
        if !self.timer.take_finished(now) {
            return None;
        }
        match self.state {
            TrapdoorState::Counting if self.config.warning_time > 0.0 => {
                self.state = TrapdoorState::Warning;
                self.timer.start(now, self.config.warning_time);
                None
            },
            TrapdoorState::Counting | TrapdoorState::Warning => {
                self.state = TrapdoorState::Gone;
                self.timer.start(now, self.config.respawn_delay);
                debug!(trapdoor = %self.id, "trapdoor vanished");
                Some(TrapdoorChange::Vanished)
            },
            TrapdoorState::Gone => {
                self.state = TrapdoorState::Ready;
                debug!(trapdoor = %self.id, "trapdoor restored");
                Some(TrapdoorChange::Restored)
            },
            TrapdoorState::Ready => None,
        }
    }

    /// Visibility flag for the renderer: off while gone and on alternate
    /// blinks during the warning.
    #[must_use]
    pub fn is_visible(&self, now: Seconds) -> bool {
        match (self.state, self.timer.started_at()) {
            (TrapdoorState::Gone, _) => false,
            (TrapdoorState::Warning, Some(start)) => {
                let interval = self.config.warning_time / (self.config.blink_count * 2) as f32;
                now < start || blink_phase(start, now, interval)
            },
            _ => true,
        }
    }

    /// Countdown progress in [0, 1], used to tint the platform.
    #[must_use]
    pub fn warning_progress(&self, now: Seconds) -> f32 {
        match self.state {
            TrapdoorState::Counting if self.config.disappear_time > 0.0 => {
                1.0 - self.timer.remaining(now) / self.config.disappear_time
            },
            TrapdoorState::Counting | TrapdoorState::Warning => 1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thornvale_common::{LayerMask, Vec2};

    fn platform() -> Trapdoor {
        Trapdoor::new(
            Aabb::new(Vec2::new(0.0, -0.5), Vec2::new(2.0, 0.0)),
            TrapdoorConfig::default(),
        )
    }

    #[test]
    fn test_full_cycle() {
        let mut trapdoor = platform();
        assert_eq!(trapdoor.tick(10.0), None);
        trapdoor.step_on(0.0);
        assert_eq!(trapdoor.state(), TrapdoorState::Counting);

        // Touching again does not restart the countdown.
        trapdoor.step_on(2.0);
        assert!((trapdoor.warning_progress(1.5) - 0.5).abs() < 1e-5);

        assert_eq!(trapdoor.tick(2.9), None);
        assert_eq!(trapdoor.tick(3.0), None);
        assert_eq!(trapdoor.state(), TrapdoorState::Warning);
        assert!(trapdoor.is_solid());

        assert_eq!(trapdoor.tick(4.0), Some(TrapdoorChange::Vanished));
        assert!(!trapdoor.is_solid());
        trapdoor.step_on(5.0);
        assert_eq!(trapdoor.state(), TrapdoorState::Gone);

        assert_eq!(trapdoor.tick(6.9), None);
        assert_eq!(trapdoor.tick(7.0), Some(TrapdoorChange::Restored));
        assert_eq!(trapdoor.state(), TrapdoorState::Ready);
        assert_eq!(trapdoor.tick(20.0), None);
    }

    #[test]
    fn test_warning_blinks() {
        let mut trapdoor = platform();
        trapdoor.step_on(0.0);
        trapdoor.tick(3.0);
        // Ten half-blinks of 0.1s each
        assert!(trapdoor.is_visible(3.05));
        assert!(!trapdoor.is_visible(3.15));
        assert!(trapdoor.is_visible(3.25));
        trapdoor.tick(4.0);
        assert!(!trapdoor.is_visible(4.05));
    }

    #[test]
    fn test_zero_warning_vanishes_directly() {
        let mut trapdoor = Trapdoor::new(
            Aabb::new(Vec2::ZERO, Vec2::ONE),
            TrapdoorConfig {
                warning_time: 0.0,
                ..TrapdoorConfig::default()
            },
        );
        trapdoor.step_on(0.0);
        assert_eq!(trapdoor.tick(3.0), Some(TrapdoorChange::Vanished));
    }

    #[test]
    fn test_touch_detection() {
        let trapdoor = platform();
        let standing = Body::new(Vec2::new(1.0, 0.5), Vec2::splat(0.5), LayerMask::PLAYER);
        let above = Body::new(Vec2::new(1.0, 1.0), Vec2::splat(0.5), LayerMask::PLAYER);
        let beside = Body::new(Vec2::new(3.0, 0.5), Vec2::splat(0.5), LayerMask::PLAYER);
        assert!(trapdoor.is_touched_by(&standing));
        assert!(!trapdoor.is_touched_by(&above));
        assert!(!trapdoor.is_touched_by(&beside));
    }
}
