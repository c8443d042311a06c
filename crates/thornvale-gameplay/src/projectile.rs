//! Projectiles.
//!
//! Projectiles move kinematically, ignore gravity and are destroyed on
//! lifetime expiry, on touching solid geometry, or on their first hit.

use serde::{Deserialize, Serialize};
use tracing::trace;

use thornvale_common::{EntityId, LayerMask, Vec2};

use crate::knockback::KnockbackProfile;
use crate::physics::PhysicsQuery;
use crate::timers::Seconds;

/// Side a projectile was fired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Fired by the player; hits enemies.
    Player,
    /// Fired by an enemy; hits the player.
    Enemy,
}

impl Faction {
    /// Layers this faction's projectiles can hit.
    #[must_use]
    pub const fn target_mask(self) -> LayerMask {
        match self {
            Self::Player => LayerMask::ENEMY,
            Self::Enemy => LayerMask::PLAYER,
        }
    }
}

/// Ballistics of a projectile type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSpec {
    /// Speed in units/second
    pub speed: f32,
    /// Raw damage on hit
    pub damage: f32,
    /// Knockback on hit
    pub knockback: KnockbackProfile,
    /// Seconds before self-destruction
    pub lifetime: Seconds,
    /// Collision radius
    pub radius: f32,
}

impl Default for ProjectileSpec {
    fn default() -> Self {
        Self {
            speed: 10.0,
            damage: 10.0,
            knockback: KnockbackProfile::NONE,
            lifetime: 2.0,
            radius: 0.15,
        }
    }
}

impl ProjectileSpec {
    /// The player's default bullet.
    #[must_use]
    pub fn player_bullet() -> Self {
        Self::default()
    }

    /// The standard enemy bullet.
    #[must_use]
    pub fn enemy_bullet() -> Self {
        Self {
            speed: 7.0,
            damage: 10.0,
            knockback: KnockbackProfile::new(5.0, 2.0),
            lifetime: 5.0,
            radius: 0.15,
        }
    }
}

/// Request to fire a projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Actor that fired
    pub owner: EntityId,
    /// Side it was fired for
    pub faction: Faction,
    /// Muzzle position
    pub origin: Vec2,
    /// Direction of travel (normalized on spawn)
    pub direction: Vec2,
    /// Ballistics
    pub spec: ProjectileSpec,
}

/// A live projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique ID
    pub id: EntityId,
    /// Actor that fired
    pub owner: EntityId,
    /// Side it was fired for
    pub faction: Faction,
    /// Current position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Raw damage on hit
    pub damage: f32,
    /// Knockback on hit
    pub knockback: KnockbackProfile,
    /// Collision radius
    pub radius: f32,
    /// Spawn time
    pub spawned_at: Seconds,
    /// Removal time if nothing is hit
    pub expires_at: Seconds,
}

impl Projectile {
    /// Creates a projectile from a request.
    #[must_use]
    pub fn new(request: &SpawnRequest, now: Seconds) -> Self {
        let direction = request.direction.normalize_or_zero();
        let direction = if direction == Vec2::ZERO { Vec2::X } else { direction };
        Self {
            id: EntityId::new(),
            owner: request.owner,
            faction: request.faction,
            position: request.origin,
            velocity: direction * request.spec.speed,
            damage: request.spec.damage,
            knockback: request.spec.knockback,
            radius: request.spec.radius,
            spawned_at: now,
            expires_at: now + request.spec.lifetime.max(0.0),
        }
    }

    /// True once the lifetime has run out.
    #[must_use]
    pub fn is_expired(&self, now: Seconds) -> bool {
        now >= self.expires_at
    }
}

/// Why a projectile left the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileEnd {
    /// Lifetime ran out.
    Expired,
    /// Touched solid geometry.
    HitWorld,
    /// Hit a target.
    HitTarget(EntityId),
}

/// A projectile striking a target, handed to combat resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileHit {
    /// Projectile ID (already removed)
    pub projectile: EntityId,
    /// Actor that fired
    pub owner: EntityId,
    /// Side it was fired for
    pub faction: Faction,
    /// Actor struck
    pub target: EntityId,
    /// Raw damage
    pub damage: f32,
    /// Knockback profile
    pub knockback: KnockbackProfile,
    /// Velocity at impact (gives the knockback direction)
    pub velocity: Vec2,
    /// Impact position
    pub position: Vec2,
}

/// Owns and advances every live projectile.
#[derive(Debug, Clone, Default)]
pub struct ProjectileSystem {
    projectiles: Vec<Projectile>,
    ended: Vec<(EntityId, ProjectileEnd)>,
}

impl ProjectileSystem {
    /// Creates an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires a projectile. Returns its ID.
    pub fn spawn(&mut self, request: &SpawnRequest, now: Seconds) -> EntityId {
        let projectile = Projectile::new(request, now);
        let id = projectile.id;
        trace!(%id, owner = %request.owner, "projectile spawned");
        self.projectiles.push(projectile);
        id
    }

    /// Live projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Number of live projectiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    /// True if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Looks up a projectile.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Projectile> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    /// Takes the record of projectiles removed since the last call.
    pub fn drain_ended(&mut self) -> Vec<(EntityId, ProjectileEnd)> {
        std::mem::take(&mut self.ended)
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.ended.clear();
    }

    /// Advances all projectiles to `now` by `dt` and returns target hits.
    ///
    /// Expiry is checked before moving, so a projectile with lifetime `L`
    /// spawned at `t` is gone on the first tick at or after `t + L`.
    pub fn step<Q: PhysicsQuery>(&mut self, now: Seconds, dt: Seconds, physics: &Q) -> Vec<ProjectileHit> {
        let mut hits = Vec::new();
        let mut ended = Vec::new();

        self.projectiles.retain_mut(|projectile| {
            if projectile.is_expired(now) {
                ended.push((projectile.id, ProjectileEnd::Expired));
                return false;
            }

            let travel = projectile.velocity * dt;
            let distance = travel.length();
            let blocked = physics.raycast(projectile.position, projectile.velocity, distance, LayerMask::SOLID)
                || physics.overlaps_geometry(projectile.position + travel, projectile.radius, LayerMask::SOLID);
            projectile.position += travel;
            if blocked {
                ended.push((projectile.id, ProjectileEnd::HitWorld));
                return false;
            }

            let target = physics
                .overlap_circle(projectile.position, projectile.radius, projectile.faction.target_mask())
                .into_iter()
                .find(|id| *id != projectile.owner);
            if let Some(target) = target {
                hits.push(ProjectileHit {
                    projectile: projectile.id,
                    owner: projectile.owner,
                    faction: projectile.faction,
                    target,
                    damage: projectile.damage,
                    knockback: projectile.knockback,
                    velocity: projectile.velocity,
                    position: projectile.position,
                });
                ended.push((projectile.id, ProjectileEnd::HitTarget(target)));
                return false;
            }
            true
        });

        self.ended.extend(ended);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::MockPhysics;
    use crate::timers::SimClock;

    fn open_air() -> MockPhysics {
        MockPhysics {
            grounded: false,
            ground_ahead: false,
            wall_ahead: false,
            ..MockPhysics::default()
        }
    }

    fn request(faction: Faction) -> SpawnRequest {
        SpawnRequest {
            owner: EntityId::new(),
            faction,
            origin: Vec2::ZERO,
            direction: Vec2::X,
            spec: ProjectileSpec {
                speed: 10.0,
                lifetime: 2.0,
                ..ProjectileSpec::default()
            },
        }
    }

    #[test]
    fn test_removed_exactly_at_lifetime() {
        let physics = open_air();
        let mut clock = SimClock::new(1.0 / 64.0);
        let mut system = ProjectileSystem::new();
        let id = system.spawn(&request(Faction::Enemy), clock.now());

        while clock.tick() < 127 {
            let now = clock.advance();
            system.step(now, clock.dt(), &physics);
        }
        assert_eq!(system.len(), 1);
        assert!(clock.now() < 2.0);

        let now = clock.advance();
        assert_eq!(now, 2.0);
        system.step(now, clock.dt(), &physics);
        assert!(system.is_empty());
        assert_eq!(system.drain_ended(), vec![(id, ProjectileEnd::Expired)]);
    }

    #[test]
    fn test_projectile_travels_at_speed() {
        let physics = open_air();
        let mut system = ProjectileSystem::new();
        system.spawn(&request(Faction::Player), 0.0);
        system.step(0.5, 0.5, &physics);
        assert_eq!(system.projectiles()[0].position, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_world_collision_destroys() {
        let mut physics = open_air();
        physics.wall_ahead = true;
        let mut system = ProjectileSystem::new();
        let id = system.spawn(&request(Faction::Enemy), 0.0);
        let hits = system.step(0.1, 0.1, &physics);
        assert!(hits.is_empty());
        assert!(system.is_empty());
        assert_eq!(system.drain_ended(), vec![(id, ProjectileEnd::HitWorld)]);
    }

    #[test]
    fn test_hits_target_of_opposing_faction_only() {
        let mut physics = open_air();
        let player = EntityId::new();
        let enemy = EntityId::new();
        physics.add_collider(player, Vec2::new(1.0, 0.0), 0.5, LayerMask::PLAYER);
        physics.add_collider(enemy, Vec2::new(1.0, 0.0), 0.5, LayerMask::ENEMY);

        let mut system = ProjectileSystem::new();
        system.spawn(&request(Faction::Enemy), 0.0);
        let hits = system.step(0.1, 0.1, &physics);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, player);
        assert_eq!(hits[0].faction, Faction::Enemy);
        assert!(system.is_empty());
    }

    #[test]
    fn test_owner_is_never_hit() {
        let mut physics = open_air();
        let mut req = request(Faction::Player);
        let owner = EntityId::new();
        req.owner = owner;
        physics.add_collider(owner, Vec2::new(0.5, 0.0), 0.5, LayerMask::ENEMY);

        let mut system = ProjectileSystem::new();
        system.spawn(&req, 0.0);
        assert!(system.step(0.05, 0.05, &physics).is_empty());
        assert_eq!(system.len(), 1);
    }
}
