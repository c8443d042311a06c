//! Collision layer masks used to filter physics queries.

use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// Bit set of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Static level geometry (floors, platforms).
    pub const GROUND: Self = Self(1);
    /// Vertical walls that support wall sliding.
    pub const WALL: Self = Self(1 << 1);
    /// The player actor.
    pub const PLAYER: Self = Self(1 << 2);
    /// Enemy actors.
    pub const ENEMY: Self = Self(1 << 3);
    /// Projectiles.
    pub const PROJECTILE: Self = Self(1 << 4);
    /// Damage zones, pits and spikes.
    pub const HAZARD: Self = Self(1 << 5);
    /// Chests and other interactables.
    pub const INTERACTABLE: Self = Self(1 << 6);
    /// Everything a body can stand on or bump into.
    pub const SOLID: Self = Self(Self::GROUND.0 | Self::WALL.0);
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if any layer in `other` is also in `self`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every layer in `other` is in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the mask with `other` removed.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// True if no layer is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_ops() {
        let mask = LayerMask::PLAYER | LayerMask::HAZARD;
        assert!(mask.intersects(LayerMask::PLAYER));
        assert!(!mask.intersects(LayerMask::ENEMY));
        assert!(mask.contains(LayerMask::HAZARD));
        assert!(!mask.without(LayerMask::HAZARD).intersects(LayerMask::HAZARD));
        assert!(LayerMask::SOLID.contains(LayerMask::WALL));
    }
}
