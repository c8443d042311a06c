//! Enemy behavior state machine.
//!
//! One interpreter runs every archetype. Each tick an enemy:
//! 1. Drains its health notifications (death, hurt, boss phase 2)
//! 2. Runs the current state (`Patrol`, `Chase`, `Attack`, `Hurt`)
//! 3. Writes its velocity into its [`Body`] and returns any strike or
//!    projectiles for the simulation to resolve
//!
//! When several exits are possible on the same tick the priority is
//! death, hurt, attack, give up, keep chasing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use thornvale_common::{horizontal_sign, rotate_degrees, EntityId, Facing, LayerMask, Vec2};

use crate::archetype::{ArchetypeConfig, ArchetypeKind, AttackPolicy, MovementPolicy, PatrolPolicy};
use crate::attack::{AttackDefinition, AttackPhase, AttackRoutine};
use crate::combat::{DeathReport, MeleeStrike, TouchDamage};
use crate::config::ConfigResult;
use crate::events::{EventBus, FlashKind, GameEvent};
use crate::health::{Health, HealthEvent};
use crate::knockback::direction_from_facing;
use crate::physics::{Body, PhysicsQuery};
use crate::projectile::{Faction, ProjectileSpec, SpawnRequest};
use crate::timers::{Seconds, Timer};

/// Behavior state of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyBehaviorState {
    /// Wandering, looking for the player
    #[default]
    Patrol,
    /// Pursuing the player
    Chase,
    /// Running an attack routine
    Attack,
    /// Staggered by a hit
    Hurt,
    /// Dead, waiting for removal
    Dead,
}

impl EnemyBehaviorState {
    /// Animation trigger name for entering this state.
    #[must_use]
    pub const fn animation(self) -> &'static str {
        match self {
            Self::Patrol => "walk",
            Self::Chase => "run",
            Self::Attack => "attack",
            Self::Hurt => "hurt",
            Self::Dead => "die",
        }
    }
}

/// Boss phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossPhase {
    /// Opening phase
    One,
    /// Enraged: faster movement and attacks
    Two,
}

/// What an enemy sees of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    /// Player ID
    pub id: EntityId,
    /// Player position
    pub position: Vec2,
    /// False once the player died
    pub alive: bool,
}

/// What an enemy produced this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnemyTickOutput {
    /// Melee hitbox to resolve
    pub strike: Option<MeleeStrike>,
    /// Projectiles to spawn
    pub projectiles: Vec<SpawnRequest>,
    /// Impulse to deliver to the player (boss phase 2 entry)
    pub push_player: Option<Vec2>,
}

/// A live enemy.
#[derive(Debug, Clone)]
pub struct Enemy {
    id: EntityId,
    config: ArchetypeConfig,
    body: Body,
    facing: Facing,
    spawn: Vec2,
    state: EnemyBehaviorState,
    health: Health,
    attack: AttackPolicy,
    speed: f32,
    routine: Option<AttackRoutine>,
    lunging: bool,
    next_attack_time: Seconds,
    hurt: Timer,
    provocation: Timer,
    patrol_dir: f32,
    patrol_wait: Timer,
    patrol_index: usize,
    pending_knockback: Option<Vec2>,
    target: Option<EntityId>,
    boss_phase: Option<BossPhase>,
    death: Option<DeathReport>,
}

impl Enemy {
    /// Spawns an enemy of `archetype` at `position`.
    ///
    /// Fails if the archetype does not validate; an invalid archetype never
    /// produces a live actor.
    pub fn spawn(archetype: &ArchetypeConfig, position: Vec2) -> ConfigResult<Self> {
        let mut config = archetype.clone();
        config.validate()?;

        let gravity = if config.is_flying() { 0.0 } else { 1.0 };
        let body = Body::new(position, config.half_extents, LayerMask::ENEMY).with_gravity_scale(gravity);
        let boss_phase = (config.kind == ArchetypeKind::Boss).then_some(BossPhase::One);
        let enemy = Self {
            id: EntityId::new(),
            body,
            facing: Facing::Right,
            spawn: position,
            state: EnemyBehaviorState::Patrol,
            health: Health::new(config.health.clone()),
            attack: config.attack.clone(),
            speed: config.movement.speed(),
            routine: None,
            lunging: false,
            next_attack_time: 0.0,
            hurt: Timer::idle(),
            provocation: Timer::idle(),
            patrol_dir: 1.0,
            patrol_wait: Timer::idle(),
            patrol_index: 0,
            pending_knockback: None,
            target: None,
            boss_phase,
            death: None,
            config,
        };
        debug!(enemy = %enemy.id, archetype = %enemy.config.name, "enemy spawned");
        Ok(enemy)
    }

    /// Enemy ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current behavior state (debug and animation).
    #[must_use]
    pub fn current_state(&self) -> EnemyBehaviorState {
        self.state
    }

    /// Boss phase, `None` for regular enemies.
    #[must_use]
    pub fn boss_phase(&self) -> Option<BossPhase> {
        self.boss_phase
    }

    /// Archetype in use.
    #[must_use]
    pub fn config(&self) -> &ArchetypeConfig {
        &self.config
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

    /// Logical facing.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Facing as the sprite art sees it.
    #[must_use]
    pub fn sprite_facing(&self) -> Facing {
        if self.config.mirrored_sprite {
            self.facing.flipped()
        } else {
            self.facing
        }
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

    /// Contact damage while alive.
    #[must_use]
    pub fn touch_damage(&self) -> Option<TouchDamage> {
        self.health.is_alive().then_some(self.config.touch)
    }

    /// Current chase speed.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Attack policy in use.
    #[must_use]
    pub fn attack_policy(&self) -> &AttackPolicy {
        &self.attack
    }

    /// Earliest time the next attack may start.
    #[must_use]
    pub fn next_attack_time(&self) -> Seconds {
        self.next_attack_time
    }

    /// True while a hit guarantees pursuit.
    #[must_use]
    pub fn is_provoked(&self, now: Seconds) -> bool {
        self.provocation.is_running(now)
    }

    /// Player acquired as target, if any.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Queues a knockback impulse from combat. Used on the next hurt entry.
    pub fn apply_knockback(&mut self, impulse: Vec2) {
        if self.health.is_alive() {
            self.pending_knockback = Some(impulse);
        }
    }

    /// Takes the death report, once, after death.
    pub fn take_death_report(&mut self) -> Option<DeathReport> {
        self.death.take()
    }

    /// True once dead for longer than the removal delay.
    #[must_use]
    pub fn ready_for_removal(&self, now: Seconds) -> bool {
        self.health.ready_for_removal(now)
    }

    /// Advances the state machine by one tick.
    pub fn tick<Q: PhysicsQuery>(
        &mut self,
        player: Option<&PlayerView>,
        physics: &Q,
        now: Seconds,
        events: &EventBus,
    ) -> EnemyTickOutput {
        let mut out = EnemyTickOutput::default();
        if self.state == EnemyBehaviorState::Dead {
            return out;
        }

        let (damaged, died) = self.drain_health(events);
        if died {
            self.enter_dead(events);
            return out;
        }
        if damaged {
            self.check_phase_two(player, events, &mut out);
            self.enter_hurt(now, player, events);
            return out;
        }

        let target = player.filter(|p| p.alive);
        match self.state {
            EnemyBehaviorState::Hurt => self.tick_hurt(now, events),
            EnemyBehaviorState::Patrol => self.tick_patrol(target, physics, now, events),
            EnemyBehaviorState::Chase => self.tick_chase(target, physics, now, events),
            EnemyBehaviorState::Attack => self.tick_attack(target, now, events, &mut out),
            EnemyBehaviorState::Dead => {},
        }
        out
    }

    // ------------------------------------------------------------------------
    // Health reactions
    // ------------------------------------------------------------------------

    fn drain_health(&mut self, events: &EventBus) -> (bool, bool) {
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
                },
                HealthEvent::Died => died = true,
            }
        }
        (damaged, died)
    }

    fn check_phase_two(&mut self, player: Option<&PlayerView>, events: &EventBus, out: &mut EnemyTickOutput) {
        if self.boss_phase != Some(BossPhase::One) {
            return;
        }
        let Some(boss) = self.config.boss.clone() else {
            return;
        };
        if self.health.fraction() > boss.phase2_threshold {
            return;
        }

        self.boss_phase = Some(BossPhase::Two);
        self.speed = self.config.movement.speed() * boss.speed_multiplier;
        self.attack = boss
            .phase2_attack
            .unwrap_or_else(|| self.config.attack.hastened(boss.cadence_multiplier));
        info!(boss = %self.id, archetype = %self.config.name, "boss entered phase 2");
        events.publish(GameEvent::BossPhaseTwo { boss: self.id });
        events.publish(GameEvent::FlashRequested {
            actor: self.id,
            kind: FlashKind::Enraged,
        });
        events.publish(GameEvent::animation(self.id, "enrage"));

        if let Some(player) = player.filter(|p| p.alive) {
            let away = (player.position - self.body.position).normalize_or_zero();
            out.push_player = Some(away * boss.phase2_push);
        }
    }

    fn enter_hurt(&mut self, now: Seconds, player: Option<&PlayerView>, events: &EventBus) {
        if let Some(routine) = self.routine.as_mut() {
            routine.cancel();
        }
        self.routine = None;
        self.lunging = false;
        self.patrol_wait.cancel();

        let delivered = self.pending_knockback.take().filter(|v| *v != Vec2::ZERO);
        self.body.velocity = delivered.unwrap_or_else(|| {
            let away = player.map_or(-self.facing.sign(), |p| horizontal_sign(p.position, self.body.position));
            self.config
                .self_knockback
                .vector(away, self.health.knockback_resistance())
        });

        if let Some(player) = player {
            self.target = Some(player.id);
        }
        self.hurt.start(now, self.config.hurt_duration);
        events.publish(GameEvent::FlashRequested {
            actor: self.id,
            kind: FlashKind::Hit,
        });
        self.set_state(EnemyBehaviorState::Hurt, events);
    }

    fn enter_dead(&mut self, events: &EventBus) {
        if let Some(routine) = self.routine.as_mut() {
            routine.cancel();
        }
        self.routine = None;
        self.lunging = false;
        self.body.disable();
        self.set_state(EnemyBehaviorState::Dead, events);

        let kind = self.config.actor_kind();
        info!(enemy = %self.id, archetype = %self.config.name, "enemy died");
        events.publish(GameEvent::ActorDied {
            actor: self.id,
            kind,
            position: self.body.position,
        });
        self.death = Some(DeathReport {
            actor: self.id,
            kind,
            position: self.body.position,
            xp: self.config.xp_reward,
            loot: self.config.loot.clone(),
        });
    }

    // ------------------------------------------------------------------------
    // States
    // ------------------------------------------------------------------------

    fn tick_hurt(&mut self, now: Seconds, events: &EventBus) {
        if self.hurt.take_finished(now) {
            self.provocation.start(now, self.config.provocation_time);
            self.set_state(EnemyBehaviorState::Chase, events);
        }
    }

    fn detects(&self, player: &PlayerView) -> bool {
        let offset = player.position - self.body.position;
        if offset.length() > self.config.detection_range {
            return false;
        }
        self.config
            .vertical_gate
            .map_or(true, |gate| offset.y.abs() <= gate)
    }

    fn tick_patrol<Q: PhysicsQuery>(
        &mut self,
        target: Option<&PlayerView>,
        physics: &Q,
        now: Seconds,
        events: &EventBus,
    ) {
        if let Some(player) = target.filter(|p| self.detects(p)) {
            self.target = Some(player.id);
            self.patrol_wait.cancel();
            self.set_state(EnemyBehaviorState::Chase, events);
            return;
        }

        let patrol_speed = self.config.movement.speed() * self.config.patrol.speed_factor();
        let velocity = match &self.config.patrol {
            PatrolPolicy::Stationary => Vec2::ZERO,
            PatrolPolicy::Radius { radius, wait, .. } => {
                let (radius, wait) = (*radius, *wait);
                if self.waiting(now, false) {
                    Vec2::ZERO
                } else if (self.body.position.x - self.spawn.x) * self.patrol_dir >= radius {
                    self.patrol_wait.start(now, wait);
                    Vec2::ZERO
                } else {
                    Vec2::new(self.patrol_dir * patrol_speed, 0.0)
                }
            },
            PatrolPolicy::Points { points, wait, .. } => {
                let wait = *wait;
                let Some(goal) = points.get(self.patrol_index % points.len().max(1)).copied() else {
                    self.body.velocity = Vec2::ZERO;
                    return;
                };
                let flying = self.config.is_flying();
                let mut delta = goal - self.body.position;
                if !flying {
                    delta.y = 0.0;
                }
                if self.waiting(now, true) {
                    Vec2::ZERO
                } else if delta.length() <= 0.1 {
                    self.patrol_wait.start(now, wait);
                    Vec2::ZERO
                } else {
                    delta.normalize_or_zero() * patrol_speed
                }
            },
        };

        if let Some(facing) = Facing::from_axis(velocity.x) {
            self.facing = facing;
        }
        self.body.velocity = self.keep_vertical(velocity);
        if self.path_blocked(physics) {
            self.body.velocity.x = 0.0;
            if matches!(self.config.patrol, PatrolPolicy::Radius { .. }) {
                self.patrol_dir = -self.patrol_dir;
                self.facing = self.facing.flipped();
            }
        }
    }

    /// True while pausing at a patrol end. When the pause ends, turns around
    /// (radius patrol) or moves on to the next waypoint.
    fn waiting(&mut self, now: Seconds, waypoints: bool) -> bool {
        if !self.patrol_wait.is_started() {
            return false;
        }
        if !self.patrol_wait.take_finished(now) {
            return true;
        }
        if waypoints {
            self.patrol_index = self.patrol_index.wrapping_add(1);
        } else {
            self.patrol_dir = -self.patrol_dir;
        }
        false
    }

    fn tick_chase<Q: PhysicsQuery>(
        &mut self,
        target: Option<&PlayerView>,
        physics: &Q,
        now: Seconds,
        events: &EventBus,
    ) {
        let Some(player) = target else {
            self.target = None;
            self.body.velocity = self.keep_vertical(Vec2::ZERO);
            self.set_state(EnemyBehaviorState::Patrol, events);
            return;
        };
        self.target = Some(player.id);
        self.facing = Facing::toward(self.body.position, player.position);
        let distance = self.body.position.distance(player.position);

        if distance <= self.config.attack_range && now >= self.next_attack_time {
            self.start_attack(now, player, events);
            return;
        }
        let gives_up = self.config.kind != ArchetypeKind::Boss
            && distance > self.config.give_up_range()
            && !self.is_provoked(now);
        if gives_up {
            debug!(enemy = %self.id, distance, "lost the player");
            self.target = None;
            self.body.velocity = self.keep_vertical(Vec2::ZERO);
            self.set_state(EnemyBehaviorState::Patrol, events);
            return;
        }

        let velocity = self.chase_velocity(player, distance);
        self.body.velocity = self.keep_vertical(velocity);
        if self.path_blocked(physics) {
            self.body.velocity.x = 0.0;
        }
    }

    fn chase_velocity(&self, player: &PlayerView, distance: f32) -> Vec2 {
        let toward = horizontal_sign(self.body.position, player.position);
        match self.config.movement {
            MovementPolicy::Walk { .. } => {
                if distance <= self.config.attack_range {
                    Vec2::ZERO
                } else {
                    Vec2::new(toward * self.speed, 0.0)
                }
            },
            MovementPolicy::Kite {
                standoff,
                tolerance,
                retreat_range,
                ..
            } => {
                if distance < retreat_range {
                    Vec2::new(-toward * self.speed, 0.0)
                } else if distance > standoff + tolerance {
                    Vec2::new(toward * self.speed, 0.0)
                } else {
                    Vec2::ZERO
                }
            },
            MovementPolicy::Fly {
                stop_distance,
                retreat_range,
                max_height,
                vertical_damping,
                ..
            } => {
                let direction = (player.position - self.body.position).normalize_or_zero();
                let mut velocity = if distance > stop_distance {
                    direction * self.speed
                } else if distance < retreat_range {
                    let away = -direction * self.speed;
                    Vec2::new(away.x, away.y * vertical_damping)
                } else {
                    Vec2::ZERO
                };
                if self.body.position.y - player.position.y > max_height {
                    velocity.y = velocity.y.min(0.0);
                }
                velocity
            },
        }
    }

    fn start_attack(&mut self, now: Seconds, player: &PlayerView, events: &EventBus) {
        let definition = self.attack.definition();
        self.routine = Some(AttackRoutine::start(now, definition));
        self.facing = Facing::toward(self.body.position, player.position);
        self.lunging = false;
        // Shot cadence counts from the start of the routine.
        if matches!(self.attack, AttackPolicy::Shoot { .. }) {
            self.next_attack_time = now + definition.cooldown();
        }
        self.body.velocity = self.keep_vertical(Vec2::ZERO);
        self.set_state(EnemyBehaviorState::Attack, events);
    }

    fn lunge_velocity(&self, target: Option<&PlayerView>) -> Option<Vec2> {
        let AttackPolicy::Melee { lunge: Some(lunge), .. } = &self.attack else {
            return None;
        };
        let player = target?;
        (self.body.position.distance(player.position) > lunge.min_distance)
            .then(|| Vec2::new(self.facing.sign() * lunge.speed, 0.0))
    }

    fn lunge_reached(&self, target: Option<&PlayerView>) -> bool {
        let AttackPolicy::Melee { lunge: Some(lunge), .. } = &self.attack else {
            return true;
        };
        target.map_or(true, |p| self.body.position.distance(p.position) <= lunge.min_distance)
    }

    fn tick_attack(
        &mut self,
        target: Option<&PlayerView>,
        now: Seconds,
        events: &EventBus,
        out: &mut EnemyTickOutput,
    ) {
        let Some(routine) = self.routine.as_mut() else {
            self.set_state(EnemyBehaviorState::Chase, events);
            return;
        };
        let step = routine.advance(now);

        // The lunge starts when the wind-up ends and carries the swing with it.
        if step.strike {
            match self.lunge_velocity(target) {
                Some(velocity) => {
                    self.body.velocity = self.keep_vertical(velocity);
                    self.lunging = true;
                },
                None => {
                    self.body.velocity = self.keep_vertical(Vec2::ZERO);
                    self.strike(target, events, out);
                },
            }
        }
        if self.lunging && (self.lunge_reached(target) || step.phase != AttackPhase::Active) {
            self.lunging = false;
            self.body.velocity = self.keep_vertical(Vec2::ZERO);
            self.strike(target, events, out);
        }

        if step.phase.is_finished() {
            if matches!(self.attack, AttackPolicy::Melee { .. }) {
                self.next_attack_time = now + self.attack.definition().cooldown();
            }
            self.routine = None;
            self.set_state(EnemyBehaviorState::Chase, events);
        }
    }

    fn strike(&self, target: Option<&PlayerView>, events: &EventBus, out: &mut EnemyTickOutput) {
        let forward = self.facing.as_vec2();
        match &self.attack {
            AttackPolicy::Melee {
                attack, hitbox_offset, ..
            } => {
                let center = self.body.position + forward * *hitbox_offset;
                out.strike = Some(MeleeStrike {
                    attacker: self.id,
                    center,
                    radius: attack.range,
                    damage: attack.damage,
                    knockback: attack.knockback,
                    direction_sign: direction_from_facing(self.sprite_facing(), self.config.mirrored_sprite),
                    targets: LayerMask::PLAYER,
                });
                events.publish(GameEvent::sound("enemy_slash", center));
            },
            AttackPolicy::Shoot {
                attack,
                projectile,
                spread,
                muzzle_offset,
            } => {
                let origin = self.body.position + forward * *muzzle_offset;
                let aim = target
                    .map(|p| (p.position - origin).normalize_or_zero())
                    .filter(|v| *v != Vec2::ZERO)
                    .unwrap_or(forward);
                let spec = shot_spec(attack, projectile);
                out.projectiles.extend(spread.iter().map(|angle| SpawnRequest {
                    owner: self.id,
                    faction: Faction::Enemy,
                    origin,
                    direction: rotate_degrees(aim, *angle),
                    spec: spec.clone(),
                }));
                events.publish(GameEvent::sound("enemy_shot", origin));
            },
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Ground archetypes keep the vertical velocity from physics.
    fn keep_vertical(&self, velocity: Vec2) -> Vec2 {
        if self.config.is_flying() {
            velocity
        } else {
            Vec2::new(velocity.x, self.body.velocity.y)
        }
    }

    /// True if there is no floor or there is a wall ahead in the direction of
    /// travel.
    fn path_blocked<Q: PhysicsQuery>(&self, physics: &Q) -> bool {
        let Some(sensor) = self.config.ground_sensor else {
            return false;
        };
        let direction = self.body.velocity.x;
        if direction == 0.0 || self.config.is_flying() {
            return false;
        }
        let sign = direction.signum();
        let reach = self.body.half_extents.x + sensor.ahead;
        let front = self.body.position + Vec2::new(sign * reach, -self.body.half_extents.y);
        let floor_ahead = physics.raycast(front, Vec2::NEG_Y, sensor.depth, LayerMask::SOLID);
        let wall_ahead = physics.raycast(self.body.position, Vec2::new(sign, 0.0), reach, LayerMask::SOLID);
        !floor_ahead || wall_ahead
    }

    fn set_state(&mut self, next: EnemyBehaviorState, events: &EventBus) {
        if next == self.state {
            return;
        }
        debug!(enemy = %self.id, from = ?self.state, to = ?next, "enemy state");
        self.state = next;
        events.publish(GameEvent::animation(self.id, next.animation()));
    }
}

fn shot_spec(attack: &AttackDefinition, projectile: &ProjectileSpec) -> ProjectileSpec {
    ProjectileSpec {
        damage: attack.damage,
        speed: attack.projectile_speed.unwrap_or(projectile.speed),
        ..projectile.clone()
    }
}
