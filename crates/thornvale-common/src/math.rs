//! 2D math helpers on top of `glam`.
//!
//! The simulation is y-up: positive y is "up", gravity pulls toward negative y.

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Horizontal facing of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Facing negative x.
    Left,
    /// Facing positive x.
    #[default]
    Right,
}

impl Facing {
    /// Returns -1.0 for left, 1.0 for right.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Facing from the sign of a horizontal value. Zero yields `None`.
    #[must_use]
    pub fn from_axis(value: f32) -> Option<Self> {
        if value > 0.0 {
            Some(Self::Right)
        } else if value < 0.0 {
            Some(Self::Left)
        } else {
            None
        }
    }

    /// Facing toward `target` from `origin`. Equal x resolves to `Right`.
    #[must_use]
    pub fn toward(origin: Vec2, target: Vec2) -> Self {
        if target.x < origin.x {
            Self::Left
        } else {
            Self::Right
        }
    }

    /// The opposite facing.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit vector along the facing.
    #[must_use]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.sign(), 0.0)
    }
}

/// Sign of `target.x - origin.x`, with zero treated as positive.
#[must_use]
pub fn horizontal_sign(origin: Vec2, target: Vec2) -> f32 {
    if target.x - origin.x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Rotates a vector by `degrees` counter-clockwise.
#[must_use]
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_facing_from_axis() {
        assert_eq!(Facing::from_axis(0.3), Some(Facing::Right));
        assert_eq!(Facing::from_axis(-1.0), Some(Facing::Left));
        assert_eq!(Facing::from_axis(0.0), None);
        assert_eq!(Facing::Left.flipped(), Facing::Right);
    }

    #[test]
    fn test_horizontal_sign() {
        let origin = Vec2::new(2.0, 0.0);
        assert_eq!(horizontal_sign(origin, Vec2::new(5.0, 3.0)), 1.0);
        assert_eq!(horizontal_sign(origin, Vec2::new(-1.0, 0.0)), -1.0);
        assert_eq!(horizontal_sign(origin, origin), 1.0);
    }

    #[test]
    fn test_rotate_degrees() {
        let v = rotate_degrees(Vec2::X, 90.0);
        assert!(v.x.abs() < 1e-5);
        assert!((v.y - 1.0).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_rotation_preserves_length(
            x in -50.0f32..50.0,
            y in -50.0f32..50.0,
            degrees in -360.0f32..360.0,
        ) {
            let v = Vec2::new(x, y);
            let rotated = rotate_degrees(v, degrees);
            prop_assert!((rotated.length() - v.length()).abs() <= 1e-3 * (1.0 + v.length()));
            let back = rotate_degrees(rotated, -degrees);
            prop_assert!((back - v).length() <= 1e-3 * (1.0 + v.length()));
        }
    }
}
