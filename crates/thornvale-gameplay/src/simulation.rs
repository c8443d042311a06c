//! Fixed-step simulation loop.
//!
//! One [`Simulation::step`] runs the tick schedule:
//! 1. State machines (player, then enemies in arena order); interactions
//! 2. Wind pushes, then physics integration
//! 3. Trapdoor countdowns, then the projectile step
//! 4. Hit dispatch: melee strikes, projectile hits, touch and hazard contacts
//! 5. Rewards for enemies that died this tick
//! 6. Item and weapon pickups, then removal of corpses past their delay
//!
//! Everything is single-threaded and deterministic for a given seed and
//! intent sequence.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace};

use thornvale_common::{ActorError, EntityId, ItemId, LayerMask, Vec2};

use crate::archetype::ArchetypeConfig;
use crate::arena::EnemyArena;
use crate::campfire::Campfire;
use crate::combat::{
    hand_off_rewards, resolve_melee, resolve_projectile_hit, resolve_touch, CombatStorage, DeathReport, HitReport,
    MeleeStrike, RewardHooks, RewardOutcome, TouchDamage,
};
use crate::config::ConfigError;
use crate::enemy::{Enemy, PlayerView};
use crate::events::{EventBus, GameEvent};
use crate::flat_world::FlatWorld;
use crate::force_field::WindZone;
use crate::hazard::HazardZone;
use crate::health::Health;
use crate::input::{Intent, IntentSource};
use crate::loot::{LootTable, Pickup, TreasureChest, WeaponPickup};
use crate::physics::{Aabb, ContactPhase, PhysicsWorld};
use crate::player::{Player, PlayerError, PlayerTuning};
use crate::player_combat::{PlayerStrike, WeaponData};
use crate::projectile::ProjectileSystem;
use crate::timers::{Seconds, SimClock, DEFAULT_TICK};
use crate::trapdoor::{Trapdoor, TrapdoorChange, TrapdoorConfig};

/// Errors raised while setting up or driving a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Invalid archetype
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Actor storage error
    #[error("actor error: {0}")]
    Actor(#[from] ActorError),

    /// Player state error
    #[error("player error: {0}")]
    Player(#[from] PlayerError),

    /// Operation needs a player
    #[error("no player in the simulation")]
    NoPlayer,
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed timestep
    pub dt: Seconds,
    /// Seed of the loot RNG
    pub loot_seed: u64,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_TICK,
            loot_seed: 0x5448_4f52,
            event_capacity: 4096,
        }
    }
}

impl SimulationConfig {
    /// Clamps values to sane ranges.
    pub fn validate(&mut self) {
        self.dt = self.dt.clamp(1.0 / 480.0, 0.1);
        self.event_capacity = self.event_capacity.max(64);
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick number
    pub tick: u64,
    /// Simulation time at this tick
    pub now: Seconds,
    /// Hits that were resolved (landed or ignored)
    pub hits: Vec<HitReport>,
    /// Enemies that died
    pub deaths: Vec<DeathReport>,
    /// Rewards handed out for those deaths
    pub rewards: Vec<RewardOutcome>,
    /// Chests opened
    pub opened_chests: Vec<EntityId>,
    /// Campfire the player rested at
    pub rested_at: Option<EntityId>,
    /// Items picked up
    pub collected: Vec<ItemId>,
    /// Names of weapons picked up and equipped
    pub equipped: Vec<String>,
    /// Trapdoors that lost their collision
    pub vanished: Vec<EntityId>,
    /// Trapdoors that became solid again
    pub restored: Vec<EntityId>,
    /// Corpses removed
    pub removed: Vec<EntityId>,
    /// The player was put back on safe ground
    pub returned_to_safe: bool,
}

impl TickReport {
    /// Hits that registered.
    pub fn landed_hits(&self) -> impl Iterator<Item = &HitReport> {
        self.hits.iter().filter(|hit| hit.outcome.landed())
    }
}

/// Owns every actor and system of a level.
#[derive(Debug)]
pub struct Simulation<W: PhysicsWorld = FlatWorld> {
    config: SimulationConfig,
    clock: SimClock,
    world: W,
    player: Option<Player>,
    player_spawn: Vec2,
    enemies: EnemyArena,
    projectiles: ProjectileSystem,
    hazards: Vec<HazardZone>,
    wind_zones: Vec<WindZone>,
    trapdoors: Vec<Trapdoor>,
    chests: Vec<TreasureChest>,
    campfires: Vec<Campfire>,
    pickups: Vec<Pickup>,
    weapon_pickups: Vec<WeaponPickup>,
    collected: Vec<ItemId>,
    rng: fastrand::Rng,
    events: EventBus,
}

impl<W: PhysicsWorld> Simulation<W> {
    /// Creates an empty simulation over `world`.
    #[must_use]
    pub fn new(world: W, mut config: SimulationConfig) -> Self {
        config.validate();
        Self {
            clock: SimClock::new(config.dt),
            world,
            player: None,
            player_spawn: Vec2::ZERO,
            enemies: EnemyArena::new(),
            projectiles: ProjectileSystem::new(),
            hazards: Vec::new(),
            wind_zones: Vec::new(),
            trapdoors: Vec::new(),
            chests: Vec::new(),
            campfires: Vec::new(),
            pickups: Vec::new(),
            weapon_pickups: Vec::new(),
            collected: Vec::new(),
            rng: fastrand::Rng::with_seed(config.loot_seed),
            events: EventBus::new(config.event_capacity),
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Places the player, replacing any previous one.
    pub fn spawn_player(&mut self, position: Vec2, tuning: PlayerTuning) -> EntityId {
        self.set_player(Player::new(position, tuning))
    }

    /// Installs a configured player.
    pub fn set_player(&mut self, player: Player) -> EntityId {
        if let Some(old) = self.player.take() {
            self.world.remove_body(old.id());
        }
        let id = player.id();
        self.player_spawn = player.position();
        self.world.sync_body(id, player.body());
        self.player = Some(player);
        id
    }

    /// Spawns an enemy. Invalid archetypes are rejected.
    pub fn spawn_enemy(&mut self, archetype: &ArchetypeConfig, position: Vec2) -> SimulationResult<EntityId> {
        let enemy = Enemy::spawn(archetype, position)?;
        self.world.sync_body(enemy.id(), enemy.body());
        let id = self.enemies.insert(enemy)?;
        Ok(id)
    }

    /// Adds a hazard zone.
    pub fn add_hazard(&mut self, hazard: HazardZone) -> EntityId {
        let id = hazard.id();
        self.world.add_trigger(id, hazard.bounds(), LayerMask::HAZARD);
        self.hazards.push(hazard);
        id
    }

    /// Adds a wind zone.
    pub fn add_wind_zone(&mut self, zone: WindZone) -> EntityId {
        let id = zone.id();
        self.wind_zones.push(zone);
        id
    }

    /// Adds a trapdoor platform.
    pub fn add_trapdoor(&mut self, bounds: Aabb, config: TrapdoorConfig) -> EntityId {
        let trapdoor = Trapdoor::new(bounds, config);
        let id = trapdoor.id();
        self.world.add_platform(id, bounds);
        self.trapdoors.push(trapdoor);
        id
    }

    /// Adds a campfire.
    pub fn add_campfire(&mut self, position: Vec2) -> EntityId {
        let campfire = Campfire::new(position);
        let id = campfire.id();
        self.campfires.push(campfire);
        id
    }

    /// Adds a closed chest.
    pub fn add_chest(&mut self, position: Vec2, contents: LootTable) -> EntityId {
        let chest = TreasureChest::new(position, contents);
        let id = chest.id();
        self.chests.push(chest);
        id
    }

    /// Drops an item into the world.
    pub fn add_pickup(&mut self, item: ItemId, position: Vec2) -> EntityId {
        let pickup = Pickup::new(item, position);
        let id = pickup.id;
        self.pickups.push(pickup);
        id
    }

    /// Drops a weapon into the world.
    pub fn add_weapon_pickup(&mut self, weapon: WeaponData, position: Vec2) -> EntityId {
        let pickup = WeaponPickup::new(weapon, position);
        let id = pickup.id;
        self.weapon_pickups.push(pickup);
        id
    }

    /// Respawns a dead player at their last safe position.
    pub fn respawn_player(&mut self) -> SimulationResult<()> {
        let player = self.player.as_mut().ok_or(SimulationError::NoPlayer)?;
        let position = player.safe_ground().last_safe().unwrap_or(self.player_spawn);
        player.respawn(position, &self.events)?;
        self.world.sync_body(player.id(), player.body());
        info!(player = %player.id(), ?position, "player respawned");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> Seconds {
        self.clock.now()
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.clock.tick()
    }

    /// The physics world.
    #[must_use]
    pub fn world(&self) -> &W {
        &self.world
    }

    /// The player, if placed.
    #[must_use]
    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    /// The player, mutably.
    pub fn player_mut(&mut self) -> Option<&mut Player> {
        self.player.as_mut()
    }

    /// Live enemies.
    #[must_use]
    pub fn enemies(&self) -> &EnemyArena {
        &self.enemies
    }

    /// Looks up an enemy.
    pub fn enemy(&self, id: EntityId) -> SimulationResult<&Enemy> {
        Ok(self.enemies.get(id)?)
    }

    /// Looks up an enemy mutably.
    pub fn enemy_mut(&mut self, id: EntityId) -> SimulationResult<&mut Enemy> {
        Ok(self.enemies.get_mut(id)?)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &ProjectileSystem {
        &self.projectiles
    }

    /// Hazard zones.
    #[must_use]
    pub fn hazards(&self) -> &[HazardZone] {
        &self.hazards
    }

    /// Wind zones.
    #[must_use]
    pub fn wind_zones(&self) -> &[WindZone] {
        &self.wind_zones
    }

    /// Looks up a wind zone to change its strength or start a gust.
    pub fn wind_zone_mut(&mut self, id: EntityId) -> Option<&mut WindZone> {
        self.wind_zones.iter_mut().find(|zone| zone.id() == id)
    }

    /// Trapdoors.
    #[must_use]
    pub fn trapdoors(&self) -> &[Trapdoor] {
        &self.trapdoors
    }

    /// Chests.
    #[must_use]
    pub fn chests(&self) -> &[TreasureChest] {
        &self.chests
    }

    /// Campfires.
    #[must_use]
    pub fn campfires(&self) -> &[Campfire] {
        &self.campfires
    }

    /// Items lying in the world.
    #[must_use]
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Weapons lying in the world.
    #[must_use]
    pub fn weapon_pickups(&self) -> &[WeaponPickup] {
        &self.weapon_pickups
    }

    /// Every item the player picked up, in order.
    #[must_use]
    pub fn collected_items(&self) -> &[ItemId] {
        &self.collected
    }

    /// The presentation event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drains pending presentation events.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }

    // ------------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------------

    /// Runs `ticks` ticks with intents from `source`.
    pub fn run<S: IntentSource>(&mut self, source: &mut S, ticks: usize) -> Vec<TickReport> {
        (0..ticks).map(|_| self.step(&source.next_intent())).collect()
    }

    /// Advances the simulation by one fixed tick.
    pub fn step(&mut self, intent: &Intent) -> TickReport {
        let now = self.clock.advance();
        let dt = self.clock.dt();
        let mut report = TickReport {
            tick: self.clock.tick(),
            now,
            ..TickReport::default()
        };
        let mut strikes: Vec<MeleeStrike> = Vec::new();

        // State machines
        let mut interact_at = None;
        if let Some(player) = self.player.as_mut() {
            let out = player.tick(intent, &self.world, now, &self.events);
            match out.strike {
                Some(PlayerStrike::Melee(strike)) => strikes.push(strike),
                Some(PlayerStrike::Ranged(request)) => {
                    self.projectiles.spawn(&request, now);
                },
                None => {},
            }
            if out.interact {
                interact_at = Some(player.position());
            }
        }
        if let Some(position) = interact_at {
            self.interact(position, &mut report);
        }

        let view = self.player.as_ref().map(|p| PlayerView {
            id: p.id(),
            position: p.position(),
            alive: p.health().is_alive(),
        });
        let mut push = None;
        for enemy in self.enemies.iter_mut() {
            let out = enemy.tick(view.as_ref(), &self.world, now, &self.events);
            strikes.extend(out.strike);
            for request in &out.projectiles {
                self.projectiles.spawn(request, now);
            }
            push = out.push_player.or(push);
        }
        if let (Some(impulse), Some(player)) = (push, self.player.as_mut()) {
            player.apply_knockback(impulse);
        }

        // Physics
        self.apply_wind(now);
        if let Some(player) = self.player.as_mut() {
            let id = player.id();
            self.world.integrate(id, player.body_mut(), dt);
        }
        for enemy in self.enemies.iter_mut() {
            let id = enemy.id();
            self.world.integrate(id, enemy.body_mut(), dt);
        }
        self.tick_trapdoors(now, &mut report);
        let projectile_hits = self.projectiles.step(now, dt, &self.world);
        let contacts = self.world.collect_contacts();

        // Hits
        let mut touches: Vec<(TouchDamage, Vec2, ContactPhase)> = Vec::new();
        let mut return_to_safe = false;
        if let Some(player_id) = self.player.as_ref().map(Player::id) {
            for contact in &contacts {
                let Some(other) = contact.other(player_id) else {
                    continue;
                };
                if let Some(hazard) = self.hazards.iter().find(|h| h.id() == other) {
                    let effect = hazard.on_contact(contact.phase);
                    if effect.damage {
                        touches.push((*hazard.touch(), hazard.center(), contact.phase));
                    }
                    return_to_safe |= effect.return_to_safe;
                } else if let Ok(enemy) = self.enemies.get(other) {
                    if let Some(touch) = enemy.touch_damage() {
                        touches.push((touch, enemy.position(), contact.phase));
                    }
                }
            }

            let mut storage = ActorStorage {
                player: self.player.as_mut(),
                enemies: &mut self.enemies,
            };
            for (touch, source, phase) in &touches {
                report
                    .hits
                    .extend(resolve_touch(touch, *source, player_id, *phase, &mut storage, now));
            }
        }

        let mut storage = ActorStorage {
            player: self.player.as_mut(),
            enemies: &mut self.enemies,
        };
        for strike in &strikes {
            report.hits.extend(resolve_melee(strike, &self.world, &mut storage, now));
        }
        for hit in &projectile_hits {
            report.hits.extend(resolve_projectile_hit(hit, &mut storage, now));
        }

        if return_to_safe {
            if let Some(player) = self.player.as_mut().filter(|p| p.health().is_alive()) {
                let target = player.safe_ground().last_safe().unwrap_or(self.player_spawn);
                player.return_to(target, now, &self.events);
                self.world.sync_body(player.id(), player.body());
                report.returned_to_safe = true;
            }
        }

        // Rewards
        let deaths: Vec<DeathReport> = self.enemies.iter_mut().filter_map(Enemy::take_death_report).collect();
        for death in deaths {
            let outcome = match self.player.as_mut() {
                Some(player) => {
                    let mut hooks = PlayerRewards {
                        player,
                        rng: &mut self.rng,
                        events: &self.events,
                    };
                    hand_off_rewards(&death, Some(&mut hooks), &self.events)
                },
                None => hand_off_rewards::<PlayerRewards<'_>>(&death, None, &self.events),
            };
            if let Some(item) = outcome.item {
                self.pickups.push(Pickup::new(item, death.position));
            }
            report.rewards.push(outcome);
            report.deaths.push(death);
        }

        // Pickups and removal
        self.collect_pickups(&mut report);
        let expired: Vec<EntityId> = self
            .enemies
            .iter()
            .filter(|enemy| enemy.ready_for_removal(now))
            .map(Enemy::id)
            .collect();
        for id in expired {
            if self.enemies.remove(id).is_ok() {
                self.world.remove_body(id);
                debug!(enemy = %id, "corpse removed");
                report.removed.push(id);
            }
        }
        let ended = self.projectiles.drain_ended();
        if !ended.is_empty() {
            trace!(count = ended.len(), "projectiles ended");
        }

        report
    }

    /// Opens the first closed chest in reach of `actor`, or else rests at the
    /// first campfire in reach. Nothing in reach is a no-op.
    fn interact(&mut self, actor: Vec2, report: &mut TickReport) {
        if self.open_chest(actor, report) {
            return;
        }
        let Some(player) = self.player.as_mut() else {
            return;
        };
        for campfire in &self.campfires {
            if let Some(healed) = campfire.rest(actor, player.health_mut()) {
                self.events.publish(GameEvent::Rested {
                    campfire: campfire.id(),
                    healed,
                });
                report.rested_at = Some(campfire.id());
                return;
            }
        }
    }

    fn open_chest(&mut self, actor: Vec2, report: &mut TickReport) -> bool {
        for chest in &mut self.chests {
            let Some(drop) = chest.try_open(actor, &mut self.rng) else {
                continue;
            };
            self.events.publish(GameEvent::ChestOpened { chest: chest.id() });
            report.opened_chests.push(chest.id());
            if let Some(item) = drop {
                self.events.publish(GameEvent::LootDropped {
                    item,
                    position: chest.position(),
                    source: chest.id(),
                });
                self.pickups.push(Pickup::new(item, chest.position()));
            }
            return true;
        }
        false
    }

    /// Sets this tick's wind drift on every body inside a zone.
    fn apply_wind(&mut self, now: Seconds) {
        if self.wind_zones.is_empty() {
            return;
        }
        let zones = &self.wind_zones;
        if let Some(player) = self.player.as_mut() {
            let force = zones
                .iter()
                .fold(Vec2::ZERO, |acc, zone| acc + zone.force_at(player.position(), now));
            let push = player.tuning().wind.push(force);
            player.body_mut().drift += push;
        }
        for enemy in self.enemies.iter_mut() {
            let force = zones
                .iter()
                .filter(|zone| zone.affects_enemies())
                .fold(Vec2::ZERO, |acc, zone| acc + zone.force_at(enemy.position(), now));
            enemy.body_mut().drift += force;
        }
    }

    /// Starts countdowns under the player and applies vanish/restore changes.
    fn tick_trapdoors(&mut self, now: Seconds, report: &mut TickReport) {
        let player = self.player.as_ref().filter(|p| p.health().is_alive());
        for trapdoor in &mut self.trapdoors {
            if player.is_some_and(|p| trapdoor.is_touched_by(p.body())) {
                trapdoor.step_on(now);
            }
            let id = trapdoor.id();
            match trapdoor.tick(now) {
                Some(TrapdoorChange::Vanished) => {
                    self.world.set_platform_enabled(id, false);
                    self.events.publish(GameEvent::PlatformVanished { platform: id });
                    report.vanished.push(id);
                },
                Some(TrapdoorChange::Restored) => {
                    self.world.set_platform_enabled(id, true);
                    self.events.publish(GameEvent::PlatformRestored { platform: id });
                    report.restored.push(id);
                },
                None => {},
            }
        }
    }

    fn collect_pickups(&mut self, report: &mut TickReport) {
        let Some(player) = self.player.as_mut().filter(|p| p.health().is_alive()) else {
            return;
        };
        let position = player.position();
        let collected = &mut self.collected;
        self.pickups.retain(|pickup| {
            if !pickup.reachable_from(position) {
                return true;
            }
            // A full belt leaves the potion on the ground.
            if pickup.item == ItemId::POTION && !player.potions_mut().add() {
                return true;
            }
            collected.push(pickup.item);
            report.collected.push(pickup.item);
            false
        });

        let mut taken = Vec::new();
        self.weapon_pickups.retain(|pickup| {
            if pickup.reachable_from(position) {
                taken.push(pickup.weapon.clone());
                false
            } else {
                true
            }
        });
        for weapon in taken {
            self.events.publish(GameEvent::WeaponEquipped {
                actor: player.id(),
                weapon: weapon.name.clone(),
            });
            report.equipped.push(weapon.name.clone());
            player.combat_mut().equip(weapon);
        }
    }
}

impl Simulation<FlatWorld> {
    /// Creates a simulation over an endless floor with its top at `floor_y`.
    #[must_use]
    pub fn with_floor(floor_y: f32, config: SimulationConfig) -> Self {
        Self::new(FlatWorld::with_floor(floor_y), config)
    }
}

// ============================================================================
// Collaborator adapters
// ============================================================================

/// Combat view over the player and the enemy arena.
struct ActorStorage<'a> {
    player: Option<&'a mut Player>,
    enemies: &'a mut EnemyArena,
}

impl CombatStorage for ActorStorage<'_> {
    fn position(&self, entity: EntityId) -> Option<Vec2> {
        match self.player.as_deref() {
            Some(player) if player.id() == entity => Some(player.position()),
            _ => self.enemies.get(entity).ok().map(Enemy::position),
        }
    }

    fn health_mut(&mut self, entity: EntityId) -> Option<&mut Health> {
        if let Some(player) = self.player.as_deref_mut() {
            if player.id() == entity {
                return Some(player.health_mut());
            }
        }
        self.enemies.get_mut(entity).ok().map(Enemy::health_mut)
    }

    fn apply_knockback(&mut self, entity: EntityId, impulse: Vec2) {
        if let Some(player) = self.player.as_deref_mut() {
            if player.id() == entity {
                player.apply_knockback(impulse);
                return;
            }
        }
        if let Ok(enemy) = self.enemies.get_mut(entity) {
            enemy.apply_knockback(impulse);
        }
    }
}

/// Routes enemy rewards to the player and the loot RNG.
struct PlayerRewards<'a> {
    player: &'a mut Player,
    rng: &'a mut fastrand::Rng,
    events: &'a EventBus,
}

impl RewardHooks for PlayerRewards<'_> {
    fn grant_xp(&mut self, amount: u32) {
        self.player.grant_xp(amount, self.events);
    }

    fn grant_loot(&mut self, table: &LootTable, _position: Vec2) -> Option<ItemId> {
        table.roll(self.rng)
    }
}
