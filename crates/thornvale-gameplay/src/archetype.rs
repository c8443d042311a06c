//! Enemy archetype configuration.
//!
//! An archetype is plain data: ranges, timings, a movement policy and an attack
//! policy. The enemy interpreter in [`crate::enemy`] runs the same state
//! machine for every archetype and only consults these policies for how to
//! move and how to strike.

use std::collections::BTreeMap;
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use thornvale_common::{ItemId, Vec2};

use crate::attack::AttackDefinition;
use crate::combat::TouchDamage;
use crate::config::{from_ron_str, load_ron, ConfigError, ConfigResult};
use crate::events::ActorKind;
use crate::health::HealthConfig;
use crate::knockback::KnockbackProfile;
use crate::loot::LootTable;
use crate::projectile::ProjectileSpec;
use crate::timers::Seconds;

/// Broad family of an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArchetypeKind {
    /// Ground melee
    #[default]
    Melee,
    /// Ground ranged
    Ranged,
    /// Airborne, ignores gravity
    Flying,
    /// Boss with a second phase
    Boss,
}

/// How an enemy moves while patrolling.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PatrolPolicy {
    /// Stands still.
    #[default]
    Stationary,
    /// Walks back and forth within `radius` of the spawn point.
    Radius {
        /// Distance from spawn
        radius: f32,
        /// Fraction of the movement speed used while patrolling
        speed_factor: f32,
        /// Pause at each end
        wait: Seconds,
    },
    /// Visits points in order, looping.
    Points {
        /// Waypoints
        points: Vec<Vec2>,
        /// Fraction of the movement speed used while patrolling
        speed_factor: f32,
        /// Pause at each point
        wait: Seconds,
    },
}

impl PatrolPolicy {
    /// Pause at each end or waypoint.
    #[must_use]
    pub fn wait(&self) -> Seconds {
        match self {
            Self::Stationary => 0.0,
            Self::Radius { wait, .. } | Self::Points { wait, .. } => *wait,
        }
    }

    /// Fraction of the movement speed used while patrolling.
    #[must_use]
    pub fn speed_factor(&self) -> f32 {
        match self {
            Self::Stationary => 0.0,
            Self::Radius { speed_factor, .. } | Self::Points { speed_factor, .. } => *speed_factor,
        }
    }
}

/// How an enemy moves while chasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MovementPolicy {
    /// Walks straight at the player.
    Walk {
        /// Horizontal speed
        speed: f32,
    },
    /// Holds a standoff distance on the ground.
    Kite {
        /// Horizontal speed
        speed: f32,
        /// Preferred distance
        standoff: f32,
        /// Slack around the standoff before approaching
        tolerance: f32,
        /// Backs off below this distance
        retreat_range: f32,
    },
    /// Flies toward the player and hovers at a distance.
    Fly {
        /// Flight speed
        speed: f32,
        /// Stops approaching inside this distance
        stop_distance: f32,
        /// Backs off below this distance
        retreat_range: f32,
        /// Maximum height above the player
        max_height: f32,
        /// Vertical factor applied while backing off
        vertical_damping: f32,
    },
}

impl Default for MovementPolicy {
    fn default() -> Self {
        Self::Walk { speed: 3.0 }
    }
}

impl MovementPolicy {
    /// Base movement speed.
    #[must_use]
    pub fn speed(&self) -> f32 {
        match self {
            Self::Walk { speed } | Self::Kite { speed, .. } | Self::Fly { speed, .. } => *speed,
        }
    }

    /// Distance under which a kiting enemy backs off, if any.
    #[must_use]
    pub fn retreat_range(&self) -> Option<f32> {
        match self {
            Self::Walk { .. } => None,
            Self::Kite { retreat_range, .. } | Self::Fly { retreat_range, .. } => Some(*retreat_range),
        }
    }
}

/// A short dash toward the player during wind-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lunge {
    /// Lunge speed
    pub speed: f32,
    /// Only lunges when farther than this
    pub min_distance: f32,
}

/// How an enemy strikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttackPolicy {
    /// Circle hitbox in front of the enemy. The radius is `attack.range`.
    Melee {
        /// Damage, timing and knockback
        attack: AttackDefinition,
        /// Distance of the hitbox center in front of the enemy
        hitbox_offset: f32,
        /// Optional lunge
        lunge: Option<Lunge>,
    },
    /// Fires projectiles at the player.
    Shoot {
        /// Cadence and timing
        attack: AttackDefinition,
        /// Projectile fired
        projectile: ProjectileSpec,
        /// Angle offsets in degrees, one projectile each
        spread: Vec<f32>,
        /// Muzzle distance in front of the enemy
        muzzle_offset: f32,
    },
}

impl Default for AttackPolicy {
    fn default() -> Self {
        Self::Melee {
            attack: AttackDefinition::default(),
            hitbox_offset: 0.5,
            lunge: None,
        }
    }
}

impl AttackPolicy {
    /// Timing and damage of the attack.
    #[must_use]
    pub fn definition(&self) -> &AttackDefinition {
        match self {
            Self::Melee { attack, .. } | Self::Shoot { attack, .. } => attack,
        }
    }

    /// Copy with cadence multiplied.
    #[must_use]
    pub fn hastened(&self, factor: f32) -> Self {
        let mut policy = self.clone();
        match &mut policy {
            Self::Melee { attack, .. } | Self::Shoot { attack, .. } => *attack = attack.hastened(factor),
        }
        policy
    }
}

/// Boss-only settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    /// Phase 2 starts once HP is at or below this fraction of max HP
    pub phase2_threshold: f32,
    /// Movement speed multiplier in phase 2
    pub speed_multiplier: f32,
    /// Attack cadence multiplier in phase 2
    pub cadence_multiplier: f32,
    /// Attack used in phase 2 instead of the hastened base attack
    pub phase2_attack: Option<AttackPolicy>,
    /// Impulse pushing the player away on phase 2 entry
    pub phase2_push: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            phase2_threshold: 0.5,
            speed_multiplier: 1.5,
            cadence_multiplier: 1.5,
            phase2_attack: None,
            phase2_push: 10.0,
        }
    }
}

/// Floor and wall sensors for ground archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundSensor {
    /// Horizontal distance ahead of the collider edge
    pub ahead: f32,
    /// Depth of the downward ray
    pub depth: f32,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self {
            ahead: 0.2,
            depth: 0.5,
        }
    }
}

/// Complete description of an enemy archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeConfig {
    /// Name used in logs and libraries
    pub name: String,
    /// Family
    pub kind: ArchetypeKind,
    /// Health settings
    pub health: HealthConfig,
    /// Contact damage
    pub touch: TouchDamage,
    /// Player detection radius
    pub detection_range: f32,
    /// Max vertical distance for detection, if gated
    pub vertical_gate: Option<f32>,
    /// Distance at which an attack starts
    pub attack_range: f32,
    /// Gives up when farther than `detection_range * give_up_factor`
    pub give_up_factor: f32,
    /// Patrol movement
    pub patrol: PatrolPolicy,
    /// Chase movement
    pub movement: MovementPolicy,
    /// Attack
    pub attack: AttackPolicy,
    /// Stagger after a hit
    pub hurt_duration: Seconds,
    /// Knockback the enemy applies to itself when hit, away from the player
    pub self_knockback: KnockbackProfile,
    /// Pursuit guarantee after a hit
    pub provocation_time: Seconds,
    /// XP granted on death
    pub xp_reward: u32,
    /// Drops on death
    pub loot: Option<LootTable>,
    /// Collider half size
    pub half_extents: Vec2,
    /// Floor/wall sensors; required unless flying
    pub ground_sensor: Option<GroundSensor>,
    /// Sprite art faces left by default
    pub mirrored_sprite: bool,
    /// Boss settings; required for bosses
    pub boss: Option<BossConfig>,
}

impl Default for ArchetypeConfig {
    fn default() -> Self {
        Self::melee_grunt()
    }
}

// ============================================================================
// Presets
// ============================================================================

impl ArchetypeConfig {
    /// Basic melee enemy.
    #[must_use]
    pub fn melee_grunt() -> Self {
        Self {
            name: "melee_grunt".into(),
            kind: ArchetypeKind::Melee,
            health: HealthConfig::new(100.0).with_mercy_time(0.2),
            touch: TouchDamage::new(5.0, KnockbackProfile::new(5.0, 3.0)),
            detection_range: 6.0,
            vertical_gate: Some(3.0),
            attack_range: 1.5,
            give_up_factor: 1.5,
            patrol: PatrolPolicy::Radius {
                radius: 4.0,
                speed_factor: 0.5,
                wait: 2.0,
            },
            movement: MovementPolicy::Walk { speed: 3.0 },
            attack: AttackPolicy::Melee {
                attack: AttackDefinition::melee(10.0, 0.8, 1.0 / 1.5)
                    .with_timing(0.4, 0.1, 0.5)
                    .with_knockback(KnockbackProfile::new(5.0, 2.0)),
                hitbox_offset: 0.7,
                lunge: Some(Lunge {
                    speed: 5.0,
                    min_distance: 1.0,
                }),
            },
            hurt_duration: 0.5,
            self_knockback: KnockbackProfile::new(3.0, 0.0),
            provocation_time: 3.0,
            xp_reward: 20,
            loot: Some(LootTable::new().with_entry(ItemId::POTION, 25.0)),
            half_extents: Vec2::new(0.4, 0.5),
            ground_sensor: Some(GroundSensor::default()),
            mirrored_sprite: false,
            boss: None,
        }
    }

    /// Slow, heavy melee enemy that barely moves when hit.
    #[must_use]
    pub fn tank() -> Self {
        let mut config = Self::melee_grunt();
        config.name = "tank".into();
        config.health = config.health.with_knockback_resistance(0.8);
        if let AttackPolicy::Melee { attack, lunge, .. } = &mut config.attack {
            attack.recovery = 1.0;
            *lunge = None;
        }
        config.xp_reward = 35;
        config
    }

    /// Ground gunner that keeps its distance.
    #[must_use]
    pub fn ranged_gunner() -> Self {
        let bullet = ProjectileSpec::enemy_bullet();
        Self {
            name: "ranged_gunner".into(),
            kind: ArchetypeKind::Ranged,
            health: HealthConfig::new(60.0).with_mercy_time(0.2),
            touch: TouchDamage::new(5.0, KnockbackProfile::new(4.0, 2.0)),
            detection_range: 8.0,
            vertical_gate: Some(3.0),
            attack_range: 5.0,
            give_up_factor: 1.5,
            patrol: PatrolPolicy::Stationary,
            movement: MovementPolicy::Kite {
                speed: 2.5,
                standoff: 5.0,
                tolerance: 0.0,
                retreat_range: 2.0,
            },
            attack: AttackPolicy::Shoot {
                attack: AttackDefinition::ranged(bullet.damage, 1.0 / 1.5, bullet.speed)
                    .with_timing(0.25, 0.0, 0.25),
                projectile: bullet,
                spread: vec![0.0],
                muzzle_offset: 0.6,
            },
            hurt_duration: 0.5,
            self_knockback: KnockbackProfile::new(3.0, 0.0),
            provocation_time: 4.0,
            xp_reward: 25,
            loot: Some(LootTable::new().with_entry(ItemId::POTION, 30.0)),
            half_extents: Vec2::new(0.4, 0.5),
            ground_sensor: Some(GroundSensor::default()),
            mirrored_sprite: false,
            boss: None,
        }
    }

    /// Hovering drone that shoots from above.
    #[must_use]
    pub fn flying_drone() -> Self {
        let bullet = ProjectileSpec::enemy_bullet();
        Self {
            name: "flying_drone".into(),
            kind: ArchetypeKind::Flying,
            health: HealthConfig::new(40.0).with_mercy_time(0.2),
            touch: TouchDamage::new(5.0, KnockbackProfile::new(4.0, 2.0)),
            detection_range: 8.0,
            vertical_gate: None,
            attack_range: 6.0,
            give_up_factor: 1.5,
            patrol: PatrolPolicy::Radius {
                radius: 3.0,
                speed_factor: 0.5,
                wait: 1.0,
            },
            movement: MovementPolicy::Fly {
                speed: 3.0,
                stop_distance: 4.0,
                retreat_range: 2.5,
                max_height: 2.5,
                vertical_damping: 0.2,
            },
            attack: AttackPolicy::Shoot {
                attack: AttackDefinition::ranged(bullet.damage, 0.5, bullet.speed).with_timing(0.3, 0.0, 0.2),
                projectile: bullet,
                spread: vec![0.0],
                muzzle_offset: 0.4,
            },
            hurt_duration: 0.4,
            self_knockback: KnockbackProfile::new(3.0, 1.0),
            provocation_time: 5.0,
            xp_reward: 30,
            loot: Some(LootTable::new().with_entry(ItemId::POTION, 20.0)),
            half_extents: Vec2::new(0.4, 0.3),
            ground_sensor: None,
            mirrored_sprite: false,
            boss: None,
        }
    }

    /// Brute boss that slams the ground in front of it.
    #[must_use]
    pub fn village_boss() -> Self {
        Self {
            name: "village_boss".into(),
            kind: ArchetypeKind::Boss,
            health: HealthConfig::new(400.0)
                .with_mercy_time(0.3)
                .with_knockback_resistance(1.0)
                .with_removal_delay(3.0),
            touch: TouchDamage::new(10.0, KnockbackProfile::new(6.0, 3.0)),
            detection_range: 15.0,
            vertical_gate: None,
            attack_range: 2.5,
            give_up_factor: 1.5,
            patrol: PatrolPolicy::Stationary,
            movement: MovementPolicy::Walk { speed: 2.0 },
            attack: AttackPolicy::Melee {
                attack: AttackDefinition::melee(20.0, 1.5, 0.25)
                    .with_timing(1.0, 0.2, 2.0)
                    .with_knockback(KnockbackProfile::new(8.0, 4.0)),
                hitbox_offset: 1.2,
                lunge: None,
            },
            hurt_duration: 0.2,
            self_knockback: KnockbackProfile::NONE,
            provocation_time: 3.0,
            xp_reward: 0,
            loot: None,
            half_extents: Vec2::new(1.0, 1.2),
            ground_sensor: Some(GroundSensor::default()),
            mirrored_sprite: true,
            boss: Some(BossConfig::default()),
        }
    }

    /// Gunner boss that keeps its distance and fires a spread in phase 2.
    #[must_use]
    pub fn jungle_boss() -> Self {
        let bullet = ProjectileSpec::enemy_bullet();
        let base = AttackDefinition::ranged(bullet.damage, 1.0 / 1.5, bullet.speed).with_timing(0.4, 0.0, 0.3);
        let enraged = AttackDefinition::ranged(bullet.damage, 1.0 / 0.8, bullet.speed).with_timing(0.4, 0.0, 0.2);
        Self {
            name: "jungle_boss".into(),
            kind: ArchetypeKind::Boss,
            health: HealthConfig::new(300.0)
                .with_mercy_time(0.3)
                .with_knockback_resistance(1.0)
                .with_removal_delay(3.0),
            touch: TouchDamage::new(10.0, KnockbackProfile::new(6.0, 3.0)),
            detection_range: 15.0,
            vertical_gate: None,
            attack_range: 15.0,
            give_up_factor: 1.5,
            patrol: PatrolPolicy::Stationary,
            movement: MovementPolicy::Kite {
                speed: 3.0,
                standoff: 6.0,
                tolerance: 1.0,
                retreat_range: 5.0,
            },
            attack: AttackPolicy::Shoot {
                attack: base,
                projectile: bullet.clone(),
                spread: vec![0.0],
                muzzle_offset: 1.0,
            },
            hurt_duration: 0.2,
            self_knockback: KnockbackProfile::NONE,
            provocation_time: 3.0,
            xp_reward: 0,
            loot: None,
            half_extents: Vec2::new(0.8, 1.0),
            ground_sensor: Some(GroundSensor::default()),
            mirrored_sprite: false,
            boss: Some(BossConfig {
                speed_multiplier: 1.2,
                phase2_attack: Some(AttackPolicy::Shoot {
                    attack: enraged,
                    projectile: bullet,
                    spread: vec![-15.0, 0.0, 15.0],
                    muzzle_offset: 1.0,
                }),
                ..BossConfig::default()
            }),
        }
    }

    /// All presets, in a fixed order.
    #[must_use]
    pub fn presets() -> Vec<Self> {
        vec![
            Self::melee_grunt(),
            Self::tank(),
            Self::ranged_gunner(),
            Self::flying_drone(),
            Self::village_boss(),
            Self::jungle_boss(),
        ]
    }

    /// Actor kind reported on death.
    #[must_use]
    pub fn actor_kind(&self) -> ActorKind {
        if self.kind == ArchetypeKind::Boss {
            ActorKind::Boss
        } else {
            ActorKind::Enemy
        }
    }

    /// True if the archetype ignores gravity.
    #[must_use]
    pub fn is_flying(&self) -> bool {
        self.kind == ArchetypeKind::Flying || matches!(self.movement, MovementPolicy::Fly { .. })
    }

    /// Distance beyond which a chase is abandoned.
    #[must_use]
    pub fn give_up_range(&self) -> f32 {
        self.detection_range * self.give_up_factor
    }

    /// Clamps soft values and rejects authoring errors.
    pub fn validate(&mut self) -> ConfigResult<()> {
        let name = self.name.clone();
        if !is_positive(self.detection_range) {
            return Err(ConfigError::invalid(&name, "detection range must be positive"));
        }
        if !is_positive(self.attack_range) || self.attack_range > self.detection_range {
            return Err(ConfigError::invalid(
                &name,
                format!(
                    "attack range {} must be in (0, detection range {}]",
                    self.attack_range, self.detection_range
                ),
            ));
        }
        if !self.is_flying() && self.ground_sensor.is_none() {
            return Err(ConfigError::invalid(&name, "ground archetype has no ground sensor"));
        }
        if let AttackPolicy::Shoot { spread, .. } = &self.attack {
            if spread.is_empty() {
                return Err(ConfigError::invalid(&name, "projectile spread is empty"));
            }
        }
        match (self.kind, &mut self.boss) {
            (ArchetypeKind::Boss, None) => {
                return Err(ConfigError::invalid(&name, "boss archetype has no boss settings"));
            },
            (ArchetypeKind::Boss, Some(boss)) => {
                if !is_positive(boss.phase2_threshold) || boss.phase2_threshold >= 1.0 {
                    return Err(ConfigError::invalid(&name, "phase 2 threshold must be in (0, 1)"));
                }
                if let Some(AttackPolicy::Shoot { spread, .. }) = &boss.phase2_attack {
                    if spread.is_empty() {
                        return Err(ConfigError::invalid(&name, "phase 2 projectile spread is empty"));
                    }
                }
                boss.speed_multiplier = boss.speed_multiplier.max(0.1);
                boss.cadence_multiplier = boss.cadence_multiplier.max(0.1);
                boss.phase2_push = boss.phase2_push.max(0.0);
            },
            (_, Some(_)) => {
                warn!(archetype = %name, "boss settings ignored on a non-boss archetype");
                self.boss = None;
            },
            (_, None) => {},
        }
        if let MovementPolicy::Kite { standoff, retreat_range, .. } = &mut self.movement {
            *retreat_range = retreat_range.min(*standoff).max(0.0);
        }

        self.health.validate();
        self.give_up_factor = self.give_up_factor.max(1.0);
        self.hurt_duration = self.hurt_duration.max(0.0);
        self.provocation_time = self.provocation_time.max(0.0);
        self.half_extents = self.half_extents.max(Vec2::splat(0.05));
        self.touch.damage = self.touch.damage.max(0.0);
        match &mut self.attack {
            AttackPolicy::Melee { attack, .. } | AttackPolicy::Shoot { attack, .. } => attack.validate(),
        }
        Ok(())
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

// ============================================================================
// Library
// ============================================================================

/// Named collection of archetypes.
#[derive(Debug, Clone, Default)]
pub struct ArchetypeLibrary {
    archetypes: AHashMap<String, ArchetypeConfig>,
}

impl ArchetypeLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding every preset.
    #[must_use]
    pub fn with_presets() -> Self {
        let mut library = Self::new();
        for preset in ArchetypeConfig::presets() {
            library.archetypes.insert(preset.name.clone(), preset);
        }
        library
    }

    /// Parses a RON map of `name: archetype`. Every entry is validated; names
    /// are taken from the map keys.
    pub fn from_ron(text: &str) -> ConfigResult<Self> {
        let raw: BTreeMap<String, ArchetypeConfig> = from_ron_str(text)?;
        let mut library = Self::new();
        for (name, mut config) in raw {
            config.name.clone_from(&name);
            library.insert(config)?;
        }
        Ok(library)
    }

    /// Loads a RON library file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw: BTreeMap<String, ArchetypeConfig> = load_ron(path)?;
        let mut library = Self::new();
        for (name, mut config) in raw {
            config.name.clone_from(&name);
            library.insert(config)?;
        }
        info!(count = library.len(), "archetype library loaded");
        Ok(library)
    }

    /// Validates and adds an archetype, replacing any with the same name.
    pub fn insert(&mut self, mut config: ArchetypeConfig) -> ConfigResult<()> {
        config.validate()?;
        self.archetypes.insert(config.name.clone(), config);
        Ok(())
    }

    /// Looks up an archetype.
    pub fn get(&self, name: &str) -> ConfigResult<&ArchetypeConfig> {
        self.archetypes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownArchetype(name.to_string()))
    }

    /// Number of archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// True if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Archetype names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.archetypes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
