//! Player ability state machine.
//!
//! Each tick the player drains its health notifications, resolves timed states
//! (dash, stun, wall-jump lock), reads intents and physics queries, and writes
//! the resulting velocity and gravity scale into its [`Body`]. Integration is
//! left to the physics step that follows.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use thornvale_common::{EntityId, Facing, LayerMask, Vec2};

use crate::events::{ActorKind, EventBus, FlashKind, GameEvent};
use crate::force_field::WindResponse;
use crate::health::{Health, HealthConfig, HealthEvent};
use crate::input::Intent;
use crate::inventory::{PotionBelt, PotionConfig};
use crate::physics::{Body, PhysicsQuery};
use crate::player_combat::{PlayerCombat, PlayerStrike, WeaponData};
use crate::progression::{Progression, ProgressionConfig};
use crate::safe_ground::{SafeGroundConfig, SafeGroundTracker};
use crate::timers::{Cooldown, Seconds, Timer};

/// Errors that can occur in the player system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// Respawn requested for a living player
    #[error("cannot respawn: player is alive")]
    NotDead,
}

/// Result type for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Locomotion state of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerAbilityState {
    /// On the ground
    #[default]
    Grounded,
    /// Jumping or falling
    Airborne,
    /// Sliding down a wall
    WallSliding,
    /// Mid-dash
    Dashing,
    /// Launched off a wall, horizontal input locked
    WallJumping,
    /// Stunned by a hit
    KnockedBack,
    /// Dead until respawned
    Dead,
}

impl PlayerAbilityState {
    /// Animation trigger name for entering this state.
    #[must_use]
    pub const fn animation(self) -> &'static str {
        match self {
            Self::Grounded => "land",
            Self::Airborne => "air",
            Self::WallSliding => "wall_slide",
            Self::Dashing => "dash",
            Self::WallJumping => "wall_jump",
            Self::KnockedBack => "hurt",
            Self::Dead => "die",
        }
    }

    /// True if intents are processed in this state.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        !matches!(self, Self::Dashing | Self::KnockedBack | Self::Dead)
    }
}

/// Abilities gated behind progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityUnlocks {
    /// Second jump in mid-air
    pub double_jump: bool,
    /// Jump off walls while sliding
    pub wall_jump: bool,
    /// Dash
    pub dash: bool,
}

impl Default for AbilityUnlocks {
    fn default() -> Self {
        Self {
            double_jump: false,
            wall_jump: false,
            dash: true,
        }
    }
}

impl AbilityUnlocks {
    /// Everything unlocked.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            double_jump: true,
            wall_jump: true,
            dash: true,
        }
    }
}

/// Movement feel and player stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Run speed
    pub move_speed: f32,
    /// Upward speed of a ground jump
    pub jump_impulse: f32,
    /// Upward speed of a mid-air jump
    pub double_jump_impulse: f32,
    /// Gravity multiplier while falling
    pub fall_gravity_multiplier: f32,
    /// Gravity multiplier while rising without jump held
    pub low_jump_gravity_multiplier: f32,
    /// Max downward speed while wall sliding
    pub wall_slide_speed: f32,
    /// Launch velocity of a wall jump (x away from the wall, y up)
    pub wall_jump_impulse: Vec2,
    /// Horizontal input lock after a wall jump
    pub wall_jump_lock: Seconds,
    /// Horizontal dash speed
    pub dash_speed: f32,
    /// Dash length
    pub dash_duration: Seconds,
    /// Cooldown after a dash ends
    pub dash_cooldown: Seconds,
    /// Input suppression after a hit
    pub knockback_stun: Seconds,
    /// Collider half size
    pub half_extents: Vec2,
    /// Radius of ground and wall checks
    pub sensor_radius: f32,
    /// Health settings
    pub health: HealthConfig,
    /// Potion settings
    pub potions: PotionConfig,
    /// XP curve
    pub progression: ProgressionConfig,
    /// Safe ground sampling
    pub safe_ground: SafeGroundConfig,
    /// Reaction to wind zones
    pub wind: WindResponse,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            jump_impulse: 12.0,
            double_jump_impulse: 10.0,
            fall_gravity_multiplier: 2.5,
            low_jump_gravity_multiplier: 2.0,
            wall_slide_speed: 2.0,
            wall_jump_impulse: Vec2::new(7.0, 12.0),
            wall_jump_lock: 0.2,
            dash_speed: 15.0,
            dash_duration: 0.2,
            dash_cooldown: 1.0,
            knockback_stun: 0.3,
            half_extents: Vec2::new(0.4, 0.9),
            sensor_radius: 0.1,
            health: HealthConfig::new(100.0).with_mercy_time(1.0),
            potions: PotionConfig::default(),
            progression: ProgressionConfig::default(),
            safe_ground: SafeGroundConfig::default(),
            wind: WindResponse::default(),
        }
    }
}

impl PlayerTuning {
    /// Clamps values to sane ranges.
    pub fn validate(&mut self) {
        self.move_speed = self.move_speed.max(0.0);
        self.jump_impulse = self.jump_impulse.max(0.0);
        self.double_jump_impulse = self.double_jump_impulse.max(0.0);
        self.fall_gravity_multiplier = self.fall_gravity_multiplier.max(0.0);
        self.low_jump_gravity_multiplier = self.low_jump_gravity_multiplier.max(0.0);
        self.wall_slide_speed = self.wall_slide_speed.max(0.0);
        self.wall_jump_lock = self.wall_jump_lock.max(0.0);
        self.dash_speed = self.dash_speed.max(0.0);
        self.dash_duration = self.dash_duration.max(0.0);
        self.dash_cooldown = self.dash_cooldown.max(0.0);
        self.knockback_stun = self.knockback_stun.max(0.0);
        self.half_extents = self.half_extents.max(Vec2::splat(0.05));
        self.sensor_radius = self.sensor_radius.max(0.01);
        self.health.validate();
        self.wind.validate();
    }
}

/// What the player produced this tick, for the simulation to act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerTickOutput {
    /// Attack that struck this tick
    pub strike: Option<PlayerStrike>,
    /// Interact was pressed while able to act
    pub interact: bool,
}

/// The player actor.
#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    body: Body,
    facing: Facing,
    state: PlayerAbilityState,
    tuning: PlayerTuning,
    unlocks: AbilityUnlocks,
    health: Health,
    combat: PlayerCombat,
    potions: PotionBelt,
    progression: Progression,
    safe_ground: SafeGroundTracker,
    double_jump_available: bool,
    wall_side: f32,
    dash: Timer,
    dash_cooldown: Cooldown,
    wall_jump_lock: Timer,
    stun: Timer,
    freeze: Timer,
    pending_knockback: Option<Vec2>,
}

impl Player {
    /// Spawns a player at `position`.
    #[must_use]
    pub fn new(position: Vec2, mut tuning: PlayerTuning) -> Self {
        tuning.validate();
        let mut safe_ground = SafeGroundTracker::new(tuning.safe_ground.clone());
        safe_ground.set(position);
        Self {
            id: EntityId::new(),
            body: Body::new(position, tuning.half_extents, LayerMask::PLAYER),
            facing: Facing::Right,
            state: PlayerAbilityState::Grounded,
            unlocks: AbilityUnlocks::default(),
            health: Health::new(tuning.health.clone()),
            combat: PlayerCombat::default(),
            potions: PotionBelt::new(tuning.potions.clone()),
            progression: Progression::new(tuning.progression.clone()),
            safe_ground,
            double_jump_available: true,
            wall_side: 0.0,
            dash: Timer::idle(),
            dash_cooldown: Cooldown::ready(),
            wall_jump_lock: Timer::idle(),
            stun: Timer::idle(),
            freeze: Timer::idle(),
            pending_knockback: None,
            tuning,
        }
    }

    /// Sets ability unlocks.
    #[must_use]
    pub fn with_unlocks(mut self, unlocks: AbilityUnlocks) -> Self {
        self.unlocks = unlocks;
        self
    }

    /// Sets the starting weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: WeaponData) -> Self {
        self.combat.equip(weapon);
        self
    }

    /// Player ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PlayerAbilityState {
        self.state
    }

    /// Physics body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable physics body, for the physics step.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Facing direction.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Health component.
    #[must_use]
    pub fn health(&self) -> &Health {
        &self.health
    }

    /// Mutable health component (damage entry point).
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Weapon state.
    #[must_use]
    pub fn combat(&self) -> &PlayerCombat {
        &self.combat
    }

    /// Mutable weapon state (equipping).
    pub fn combat_mut(&mut self) -> &mut PlayerCombat {
        &mut self.combat
    }

    /// Potion belt.
    #[must_use]
    pub fn potions(&self) -> &PotionBelt {
        &self.potions
    }

    /// Mutable potion belt (pickups).
    pub fn potions_mut(&mut self) -> &mut PotionBelt {
        &mut self.potions
    }

    /// Level and XP.
    #[must_use]
    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    /// Safe ground tracker.
    #[must_use]
    pub fn safe_ground(&self) -> &SafeGroundTracker {
        &self.safe_ground
    }

    /// Unlocked abilities.
    #[must_use]
    pub fn unlocks(&self) -> AbilityUnlocks {
        self.unlocks
    }

    /// Unlocks or locks abilities at runtime.
    pub fn set_unlocks(&mut self, unlocks: AbilityUnlocks) {
        self.unlocks = unlocks;
    }

    /// Tuning in use.
    #[must_use]
    pub fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    /// True if a mid-air jump is available.
    #[must_use]
    pub fn double_jump_available(&self) -> bool {
        self.double_jump_available
    }

    /// True if a dash could start at `now`, ignoring state.
    #[must_use]
    pub fn dash_ready(&self, now: Seconds) -> bool {
        self.unlocks.dash && self.dash_cooldown.is_ready(now)
    }

    /// Queues a knockback impulse. Consumed on the next tick, which enters
    /// `KnockedBack`.
    pub fn apply_knockback(&mut self, impulse: Vec2) {
        if self.health.is_alive() {
            self.pending_knockback = Some(impulse);
        }
    }

    /// Grants XP through the progression component, publishing reward events.
    pub fn grant_xp(&mut self, amount: u32, events: &EventBus) {
        let gain = self.progression.grant_xp(amount, &mut self.health);
        events.publish(GameEvent::XpGranted {
            amount,
            xp: gain.xp,
            level: gain.level,
        });
        if gain.levels_gained > 0 {
            events.publish(GameEvent::LevelUp {
                level: gain.level,
                max_hp: self.health.max_hp(),
            });
        }
    }

    /// Advances the state machine by one tick.
    pub fn tick<Q: PhysicsQuery>(
        &mut self,
        intent: &Intent,
        physics: &Q,
        now: Seconds,
        events: &EventBus,
    ) -> PlayerTickOutput {
        self.react_to_health(now, events);
        if self.state == PlayerAbilityState::Dead {
            return PlayerTickOutput::default();
        }

        if self.freeze.is_started() {
            if !self.freeze.take_finished(now) {
                self.body.velocity = Vec2::ZERO;
                return PlayerTickOutput::default();
            }
            self.body.simulated = true;
        }

        let grounded = physics.is_grounded(self.body.feet(), self.tuning.sensor_radius, LayerMask::SOLID);
        self.safe_ground
            .update(now, self.body.position, self.body.velocity, grounded, physics);

        match self.state {
            PlayerAbilityState::Dashing => {
                if self.dash.is_finished(now) {
                    self.end_dash(now);
                    self.set_state(Self::implied_state(grounded), events);
                } else {
                    self.body.velocity = Vec2::new(self.facing.sign() * self.tuning.dash_speed, 0.0);
                    return PlayerTickOutput::default();
                }
            },
            PlayerAbilityState::KnockedBack => {
                if self.stun.take_finished(now) {
                    self.set_state(Self::implied_state(grounded), events);
                } else {
                    self.apply_gravity_scale(false);
                    return PlayerTickOutput::default();
                }
            },
            _ => {},
        }

        if intent.heal_pressed {
            if let Some(healed) = self.potions.drink(&mut self.health) {
                events.publish(GameEvent::PotionUsed {
                    healed,
                    remaining: self.potions.count(),
                });
                events.publish(GameEvent::FlashRequested {
                    actor: self.id,
                    kind: FlashKind::Heal,
                });
            }
        }

        let input_locked = self.state == PlayerAbilityState::WallJumping && self.wall_jump_lock.is_running(now);
        if !input_locked {
            if let Some(facing) = Facing::from_axis(intent.move_sign()) {
                self.facing = facing;
            }
        }
        let touching_wall =
            physics.touching_wall(self.body.side(self.facing.sign()), self.tuning.sensor_radius, LayerMask::SOLID);

        if intent.dash_pressed && self.dash_ready(now) {
            self.start_dash(now, events);
            return PlayerTickOutput::default();
        }

        self.step_locomotion(intent, grounded, touching_wall, now, events);
        self.apply_gravity_scale(intent.jump_held);

        let strike = self
            .combat
            .tick(self.id, intent.attack_pressed, self.body.position, self.facing, now);
        PlayerTickOutput {
            strike,
            interact: intent.interact_pressed,
        }
    }

    fn step_locomotion(
        &mut self,
        intent: &Intent,
        grounded: bool,
        touching_wall: bool,
        now: Seconds,
        events: &EventBus,
    ) {
        let run = intent.move_axis * self.tuning.move_speed;
        match self.state {
            PlayerAbilityState::Grounded => {
                self.double_jump_available = true;
                self.body.velocity.x = run;
                if intent.jump_pressed && grounded {
                    self.body.velocity.y = self.tuning.jump_impulse;
                    events.publish(GameEvent::animation(self.id, "jump"));
                    self.set_state(PlayerAbilityState::Airborne, events);
                } else if !grounded {
                    self.set_state(PlayerAbilityState::Airborne, events);
                }
            },
            PlayerAbilityState::Airborne => {
                self.body.velocity.x = run;
                if grounded && self.body.velocity.y <= 0.0 {
                    self.double_jump_available = true;
                    self.set_state(PlayerAbilityState::Grounded, events);
                } else if intent.jump_pressed && self.unlocks.double_jump && self.double_jump_available {
                    self.double_jump_available = false;
                    self.body.velocity.y = self.tuning.double_jump_impulse;
                    events.publish(GameEvent::animation(self.id, "double_jump"));
                } else if touching_wall
                    && self.body.velocity.y < 0.0
                    && intent.move_sign() != 0.0
                    && intent.move_sign() == self.facing.sign()
                {
                    self.wall_side = self.facing.sign();
                    self.double_jump_available = true;
                    self.set_state(PlayerAbilityState::WallSliding, events);
                    self.clamp_slide();
                }
            },
            PlayerAbilityState::WallSliding => {
                if grounded {
                    self.set_state(PlayerAbilityState::Grounded, events);
                } else if intent.jump_pressed && self.unlocks.wall_jump {
                    self.wall_jump(now, events);
                } else if !touching_wall || intent.move_sign() != self.wall_side {
                    self.body.velocity.x = run;
                    self.set_state(PlayerAbilityState::Airborne, events);
                } else {
                    self.body.velocity.x = run;
                    self.clamp_slide();
                }
            },
            PlayerAbilityState::WallJumping => {
                if self.wall_jump_lock.take_finished(now) {
                    self.body.velocity.x = run;
                    self.set_state(PlayerAbilityState::Airborne, events);
                } else if grounded && self.body.velocity.y <= 0.0 {
                    self.wall_jump_lock.cancel();
                    self.set_state(PlayerAbilityState::Grounded, events);
                }
            },
            PlayerAbilityState::Dashing | PlayerAbilityState::KnockedBack | PlayerAbilityState::Dead => {},
        }
    }

    fn clamp_slide(&mut self) {
        self.body.velocity.y = self.body.velocity.y.max(-self.tuning.wall_slide_speed);
    }

    fn wall_jump(&mut self, now: Seconds, events: &EventBus) {
        let away = -self.wall_side;
        self.body.velocity = Vec2::new(away * self.tuning.wall_jump_impulse.x, self.tuning.wall_jump_impulse.y);
        if let Some(facing) = Facing::from_axis(away) {
            self.facing = facing;
        }
        self.wall_jump_lock.start(now, self.tuning.wall_jump_lock);
        self.set_state(PlayerAbilityState::WallJumping, events);
    }

    fn start_dash(&mut self, now: Seconds, events: &EventBus) {
        self.combat.cancel();
        self.health.set_invincible(true);
        self.body.ignored_layers |= LayerMask::ENEMY;
        self.body.gravity_scale = 0.0;
        self.body.velocity = Vec2::new(self.facing.sign() * self.tuning.dash_speed, 0.0);
        self.dash.start(now, self.tuning.dash_duration);
        self.wall_jump_lock.cancel();
        self.set_state(PlayerAbilityState::Dashing, events);
    }

    fn end_dash(&mut self, now: Seconds) {
        self.dash.cancel();
        self.health.set_invincible(false);
        self.body.ignored_layers = self.body.ignored_layers.without(LayerMask::ENEMY);
        self.body.gravity_scale = 1.0;
        self.body.velocity.x = 0.0;
        self.dash_cooldown.trigger(now, self.tuning.dash_cooldown);
    }

    /// Falling gets heavier gravity; rising without jump held gets the
    /// low-jump multiplier; otherwise 1.
    fn apply_gravity_scale(&mut self, jump_held: bool) {
        self.body.gravity_scale = if self.body.velocity.y < 0.0 {
            self.tuning.fall_gravity_multiplier
        } else if self.body.velocity.y > 0.0 && !jump_held {
            self.tuning.low_jump_gravity_multiplier
        } else {
            1.0
        };
    }

    fn react_to_health(&mut self, now: Seconds, events: &EventBus) {
        let mut damaged = false;
        let mut died = false;
        for event in self.health.drain_events() {
            match event {
                HealthEvent::Damaged { amount, remaining } => {
                    damaged = true;
                    events.publish(GameEvent::ActorDamaged {
                        actor: self.id,
                        amount,
                        remaining,
                    });
                    events.publish(GameEvent::FlashRequested {
                        actor: self.id,
                        kind: FlashKind::Hit,
                    });
                },
                HealthEvent::Died => died = true,
            }
        }

        let push = self.pending_knockback.take();
        if died {
            self.enter_dead(now, events);
        } else if damaged || push.is_some() {
            self.enter_knockback(now, push.unwrap_or(Vec2::ZERO), events);
        }
    }

    fn enter_knockback(&mut self, now: Seconds, impulse: Vec2, events: &EventBus) {
        if self.state == PlayerAbilityState::Dead {
            return;
        }
        if self.state == PlayerAbilityState::Dashing {
            self.end_dash(now);
        }
        self.combat.cancel();
        self.wall_jump_lock.cancel();
        // A hit ends a hazard freeze so the stun plays out in full.
        if self.freeze.is_started() {
            self.freeze.cancel();
            self.body.simulated = true;
        }
        self.body.velocity = impulse;
        self.body.gravity_scale = 1.0;
        self.stun.start(now, self.tuning.knockback_stun);
        self.set_state(PlayerAbilityState::KnockedBack, events);
    }

    fn enter_dead(&mut self, now: Seconds, events: &EventBus) {
        if self.state == PlayerAbilityState::Dashing {
            self.end_dash(now);
        }
        self.combat.cancel();
        self.stun.cancel();
        self.wall_jump_lock.cancel();
        self.freeze.cancel();
        self.body.disable();
        self.set_state(PlayerAbilityState::Dead, events);
        info!(player = %self.id, "player died");
        events.publish(GameEvent::ActorDied {
            actor: self.id,
            kind: ActorKind::Player,
            position: self.body.position,
        });
    }

    /// Brings a dead player back at `position` with full health.
    pub fn respawn(&mut self, position: Vec2, events: &EventBus) -> PlayerResult<()> {
        if self.health.is_alive() {
            return Err(PlayerError::NotDead);
        }
        self.health.revive();
        self.body.position = position;
        self.body.velocity = Vec2::ZERO;
        self.body.ignored_layers = LayerMask::NONE;
        self.body.gravity_scale = 1.0;
        self.body.enable();
        self.dash.cancel();
        self.dash_cooldown.reset();
        self.pending_knockback = None;
        self.double_jump_available = true;
        self.safe_ground.set(position);
        self.set_state(PlayerAbilityState::Airborne, events);
        events.publish(GameEvent::PlayerRespawned { position });
        Ok(())
    }

    /// Puts a living player back on `position` and freezes them briefly
    /// (pits and spikes).
    pub fn return_to(&mut self, position: Vec2, now: Seconds, events: &EventBus) {
        // The hazard's own hit is settled here, not after the freeze starts.
        self.react_to_health(now, events);
        if self.health.is_dead() {
            return;
        }
        if self.state == PlayerAbilityState::Dashing {
            self.end_dash(now);
        }
        self.body.position = position;
        self.body.velocity = Vec2::ZERO;
        self.body.simulated = false;
        self.freeze.start(now, self.tuning.safe_ground.respawn_freeze);
        self.pending_knockback = None;
        self.stun.cancel();
        self.set_state(PlayerAbilityState::Airborne, events);
        events.publish(GameEvent::PlayerRespawned { position });
    }

    fn implied_state(grounded: bool) -> PlayerAbilityState {
        if grounded {
            PlayerAbilityState::Grounded
        } else {
            PlayerAbilityState::Airborne
        }
    }

    fn set_state(&mut self, next: PlayerAbilityState, events: &EventBus) {
        if next == self.state {
            return;
        }
        debug!(player = %self.id, from = ?self.state, to = ?next, "player state");
        self.state = next;
        events.publish(GameEvent::animation(self.id, next.animation()));
    }
}
