//! Wind and force-field zones.
//!
//! A zone pushes every simulated body whose center lies inside it. The push is
//! strongest at the center and fades to nothing at the edge. The simulation
//! hands it to physics as the body's drift for one tick.

use serde::{Deserialize, Serialize};
use tracing::debug;

use thornvale_common::{EntityId, Vec2};

use crate::physics::Aabb;
use crate::timers::{Seconds, Timer};

/// Length of a one-shot gust.
pub const GUST_DURATION: Seconds = 0.2;

/// Region a zone covers and the way it blows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindShape {
    /// Box blowing along a fixed direction
    Directional {
        /// Covered area
        bounds: Aabb,
        /// Unit direction of the push
        direction: Vec2,
    },
    /// Circle blowing toward or away from its center
    Radial {
        /// Center of the circle
        center: Vec2,
        /// Radius of the circle
        radius: f32,
        /// Pull toward the center instead of pushing away
        inward: bool,
    },
}

/// How the strength varies over time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WindPattern {
    /// Fixed strength
    #[default]
    Constant,
    /// Oscillates between 30% and 100% of the strength
    Pulsing {
        /// Pulses per second
        frequency: f32,
    },
}

/// How strongly an actor reacts to wind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindResponse {
    /// Fraction of the force that gets through
    pub resistance: f32,
    /// Divides the force
    pub weight: f32,
    /// Immune to wind when false
    pub can_be_blown: bool,
}

impl Default for WindResponse {
    fn default() -> Self {
        Self {
            resistance: 0.8,
            weight: 1.0,
            can_be_blown: true,
        }
    }
}

impl WindResponse {
    /// Pushes weaker than this are ignored.
    pub const MIN_PUSH: f32 = 0.1;

    /// Clamps values to sane ranges.
    pub fn validate(&mut self) {
        self.resistance = self.resistance.max(0.0);
        self.weight = self.weight.max(0.1);
    }

    /// Velocity an actor picks up from `force` this tick.
    #[must_use]
    pub fn push(&self, force: Vec2) -> Vec2 {
        if !self.can_be_blown {
            return Vec2::ZERO;
        }
        let push = force * self.resistance / self.weight;
        if push.length() < Self::MIN_PUSH {
            Vec2::ZERO
        } else {
            push
        }
    }
}

/// A volume of wind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindZone {
    id: EntityId,
    shape: WindShape,
    pattern: WindPattern,
    strength: f32,
    max_strength: f32,
    gust: Timer,
    gust_strength: f32,
    affects_enemies: bool,
}

impl WindZone {
    /// Default cap for [`WindZone::set_strength`].
    pub const DEFAULT_MAX_STRENGTH: f32 = 20.0;

    fn with_shape(shape: WindShape, strength: f32) -> Self {
        Self {
            id: EntityId::new(),
            shape,
            pattern: WindPattern::Constant,
            strength: strength.max(0.0),
            max_strength: Self::DEFAULT_MAX_STRENGTH.max(strength),
            gust: Timer::idle(),
            gust_strength: 0.0,
            affects_enemies: true,
        }
    }

    /// A box of wind blowing along `direction`.
    #[must_use]
    pub fn directional(bounds: Aabb, direction: Vec2, strength: f32) -> Self {
        Self::with_shape(
            WindShape::Directional {
                bounds,
                direction: direction.normalize_or_zero(),
            },
            strength,
        )
    }

    /// A circle of wind around `center`.
    #[must_use]
    pub fn radial(center: Vec2, radius: f32, inward: bool, strength: f32) -> Self {
        Self::with_shape(
            WindShape::Radial {
                center,
                radius: radius.max(0.01),
                inward,
            },
            strength,
        )
    }

    /// Sets the strength pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: WindPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Leaves enemies alone.
    #[must_use]
    pub fn player_only(mut self) -> Self {
        self.affects_enemies = false;
        self
    }

    /// Zone ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Covered region.
    #[must_use]
    pub fn shape(&self) -> WindShape {
        self.shape
    }

    /// True if enemies are pushed too.
    #[must_use]
    pub fn affects_enemies(&self) -> bool {
        self.affects_enemies
    }

    /// Base strength.
    #[must_use]
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Changes the base strength, clamped to `[0, max]`.
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength.clamp(0.0, self.max_strength);
    }

    /// Blows at `strength` for [`GUST_DURATION`], then returns to the pattern.
    pub fn gust(&mut self, strength: f32, now: Seconds) {
        self.gust_strength = strength.max(0.0);
        self.gust.start(now, GUST_DURATION);
        debug!(zone = %self.id, strength, "gust");
    }

    /// Strength at time `now`.
    #[must_use]
    pub fn current_strength(&self, now: Seconds) -> f32 {
        if self.gust.is_running(now) {
            return self.gust_strength;
        }
        match self.pattern {
            WindPattern::Constant => self.strength,
            WindPattern::Pulsing { frequency } => {
                let pulse = ((now * frequency * std::f32::consts::TAU).sin() + 1.0) * 0.5;
                let low = self.strength * 0.3;
                low + (self.strength - low) * pulse
            },
        }
    }

    /// Force on a body centered at `position`. Zero outside the zone.
    #[must_use]
    pub fn force_at(&self, position: Vec2, now: Seconds) -> Vec2 {
        let (direction, t) = match self.shape {
            WindShape::Directional { bounds, direction } => {
                let local = (position - bounds.center()).abs();
                let half = bounds.half_extents().max(Vec2::splat(1e-4));
                if local.x > half.x || local.y > half.y {
                    return Vec2::ZERO;
                }
                (direction, (local / half).max_element())
            },
            WindShape::Radial { center, radius, inward } => {
                let distance = position.distance(center);
                if distance > radius {
                    return Vec2::ZERO;
                }
                let outward = (position - center).normalize_or_zero();
                (if inward { -outward } else { outward }, distance / radius)
            },
        };
        direction * self.current_strength(now) * falloff(t)
    }
}

/// Ease from 1 at the center to 0 at the edge.
fn falloff(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn corridor() -> WindZone {
        WindZone::directional(Aabb::new(Vec2::new(-5.0, -1.0), Vec2::new(5.0, 1.0)), Vec2::X, 10.0)
    }

    #[test]
    fn test_directional_falloff() {
        let zone = corridor();
        assert_eq!(zone.force_at(Vec2::ZERO, 0.0), Vec2::new(10.0, 0.0));
        let halfway = zone.force_at(Vec2::new(2.5, 0.0), 0.0);
        assert!((halfway.x - 5.0).abs() < 1e-4);
        assert!(zone.force_at(Vec2::new(5.0, 0.0), 0.0).length() < 1e-5);
        assert_eq!(zone.force_at(Vec2::new(6.0, 0.0), 0.0), Vec2::ZERO);
        assert_eq!(zone.force_at(Vec2::new(0.0, 1.5), 0.0), Vec2::ZERO);
    }

    #[test]
    fn test_radial_pulls_toward_center() {
        let vortex = WindZone::radial(Vec2::new(3.0, 0.0), 3.0, true, 10.0);
        let pull = vortex.force_at(Vec2::new(1.5, 0.0), 0.0);
        assert!(pull.x > 0.0);
        assert!(pull.y.abs() < 1e-5);

        let fan = WindZone::radial(Vec2::new(3.0, 0.0), 3.0, false, 10.0);
        assert!(fan.force_at(Vec2::new(1.5, 0.0), 0.0).x < 0.0);
        assert_eq!(fan.force_at(Vec2::new(-1.0, 0.0), 0.0), Vec2::ZERO);
    }

    #[test]
    fn test_pulsing_strength_range() {
        let zone = corridor().with_pattern(WindPattern::Pulsing { frequency: 2.0 });
        // sin peaks a quarter period in, troughs three quarters in
        assert!((zone.current_strength(0.125) - 10.0).abs() < 1e-3);
        assert!((zone.current_strength(0.375) - 3.0).abs() < 1e-3);
        assert!((zone.current_strength(0.0) - 6.5).abs() < 1e-3);
    }

    #[test]
    fn test_gust_overrides_briefly() {
        let mut zone = corridor();
        zone.gust(18.0, 1.0);
        assert_eq!(zone.current_strength(1.1), 18.0);
        assert_eq!(zone.current_strength(1.25), 10.0);
    }

    #[test]
    fn test_set_strength_clamps() {
        let mut zone = corridor();
        zone.set_strength(50.0);
        assert_eq!(zone.strength(), 20.0);
        zone.set_strength(-1.0);
        assert_eq!(zone.strength(), 0.0);
    }

    #[test]
    fn test_response_scales_and_ignores_weak_pushes() {
        let response = WindResponse::default();
        assert_eq!(response.push(Vec2::new(10.0, 0.0)), Vec2::new(8.0, 0.0));
        assert_eq!(response.push(Vec2::new(0.1, 0.0)), Vec2::ZERO);

        let heavy = WindResponse {
            weight: 4.0,
            ..WindResponse::default()
        };
        assert_eq!(heavy.push(Vec2::new(10.0, 0.0)), Vec2::new(2.0, 0.0));

        let anchored = WindResponse {
            can_be_blown: false,
            ..WindResponse::default()
        };
        assert_eq!(anchored.push(Vec2::new(10.0, 0.0)), Vec2::ZERO);
    }

    proptest! {
        #[test]
        fn prop_force_never_exceeds_strength(
            x in -8.0f32..8.0,
            y in -3.0f32..3.0,
            now in 0.0f32..10.0,
        ) {
            let zone = corridor().with_pattern(WindPattern::Pulsing { frequency: 1.5 });
            let force = zone.force_at(Vec2::new(x, y), now);
            prop_assert!(force.length() <= zone.strength() + 1e-3);
            prop_assert!(force.x >= 0.0);
        }
    }
}
