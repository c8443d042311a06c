//! Reference physics world: static AABB geometry, gravity, and overlap
//! contacts. Small enough for tests and the headless runner; a game embeds its
//! own [`PhysicsWorld`].

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use thornvale_common::{EntityId, LayerMask, Vec2};

use crate::physics::{Aabb, Body, Contact, ContactPhase, PhysicsQuery, PhysicsWorld};

/// World-wide physics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatWorldConfig {
    /// Gravity along y (negative is down)
    pub gravity: f32,
    /// Cap on downward speed
    pub max_fall_speed: f32,
}

impl Default for FlatWorldConfig {
    fn default() -> Self {
        Self {
            gravity: -30.0,
            max_fall_speed: 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Solid {
    bounds: Aabb,
    layer: LayerMask,
    /// Set for switchable platforms
    platform: Option<EntityId>,
    enabled: bool,
}

impl Solid {
    fn fixed(bounds: Aabb, layer: LayerMask) -> Self {
        Self {
            bounds,
            layer,
            platform: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Collider {
    bounds: Aabb,
    layer: LayerMask,
    ignored: LayerMask,
    enabled: bool,
}

/// A world of static boxes plus dynamic actor colliders.
#[derive(Debug, Clone, Default)]
pub struct FlatWorld {
    config: FlatWorldConfig,
    solids: Vec<Solid>,
    colliders: AHashMap<EntityId, Collider>,
    triggers: Vec<(EntityId, Aabb, LayerMask)>,
    touching: AHashSet<(EntityId, EntityId)>,
}

impl FlatWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(config: FlatWorldConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Creates a world with an endless floor whose top is at `floor_y`.
    #[must_use]
    pub fn with_floor(floor_y: f32) -> Self {
        let mut world = Self::new(FlatWorldConfig::default());
        world.add_ground(Aabb::new(
            Vec2::new(-10_000.0, floor_y - 50.0),
            Vec2::new(10_000.0, floor_y),
        ));
        world
    }

    /// Adds a floor or platform block.
    pub fn add_ground(&mut self, bounds: Aabb) {
        self.solids.push(Solid::fixed(bounds, LayerMask::GROUND));
    }

    /// Adds a wall block.
    pub fn add_wall(&mut self, bounds: Aabb) {
        self.solids.push(Solid::fixed(bounds, LayerMask::WALL));
    }

    /// Physics settings.
    #[must_use]
    pub fn config(&self) -> &FlatWorldConfig {
        &self.config
    }

    fn active_solids(&self) -> impl Iterator<Item = &Solid> {
        self.solids.iter().filter(|s| s.enabled)
    }

    /// Pushes `body` out of solids along one axis. `motion` is the signed
    /// movement that caused the overlap.
    fn resolve_axis(&self, body: &mut Body, horizontal: bool, motion: f32) {
        for solid in self.active_solids() {
            let bounds = body.aabb();
            if !bounds.overlaps(&solid.bounds) {
                continue;
            }
            if horizontal {
                if motion > 0.0 {
                    body.position.x = solid.bounds.min.x - body.half_extents.x;
                } else if motion < 0.0 {
                    body.position.x = solid.bounds.max.x + body.half_extents.x;
                }
                body.velocity.x = 0.0;
            } else {
                if motion < 0.0 {
                    body.position.y = solid.bounds.max.y + body.half_extents.y;
                } else if motion > 0.0 {
                    body.position.y = solid.bounds.min.y - body.half_extents.y;
                }
                body.velocity.y = 0.0;
            }
        }
    }

    fn pair_touches(a: &Collider, b: &Collider) -> bool {
        a.enabled
            && b.enabled
            && !a.ignored.intersects(b.layer)
            && !b.ignored.intersects(a.layer)
            && a.bounds.overlaps(&b.bounds)
    }
}

impl PhysicsQuery for FlatWorld {
    fn overlaps_geometry(&self, center: Vec2, radius: f32, mask: LayerMask) -> bool {
        self.active_solids()
            .any(|s| mask.intersects(s.layer) && s.bounds.intersects_circle(center, radius))
    }

    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<EntityId> {
        let mut hits: Vec<EntityId> = self
            .colliders
            .iter()
            .filter(|(_, c)| c.enabled && mask.intersects(c.layer))
            .filter(|(_, c)| c.bounds.intersects_circle(center, radius))
            .map(|(id, _)| *id)
            .chain(
                self.triggers
                    .iter()
                    .filter(|(_, b, layer)| mask.intersects(*layer) && b.intersects_circle(center, radius))
                    .map(|(id, ..)| *id),
            )
            .collect();
        hits.sort();
        hits.dedup();
        hits
    }

    fn raycast(&self, origin: Vec2, direction: Vec2, distance: f32, mask: LayerMask) -> bool {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return false;
        }
        self.active_solids()
            .any(|s| mask.intersects(s.layer) && s.bounds.ray_hit(origin, direction, distance).is_some())
    }
}

impl PhysicsWorld for FlatWorld {
    fn sync_body(&mut self, id: EntityId, body: &Body) {
        self.colliders.insert(
            id,
            Collider {
                bounds: body.aabb(),
                layer: body.layer,
                ignored: body.ignored_layers,
                enabled: body.collision_enabled,
            },
        );
    }

    fn remove_body(&mut self, id: EntityId) {
        self.colliders.remove(&id);
        self.touching.retain(|(a, b)| *a != id && *b != id);
    }

    fn add_trigger(&mut self, id: EntityId, bounds: Aabb, layer: LayerMask) {
        self.triggers.push((id, bounds, layer));
    }

    fn add_platform(&mut self, id: EntityId, bounds: Aabb) {
        self.solids.push(Solid {
            platform: Some(id),
            ..Solid::fixed(bounds, LayerMask::GROUND)
        });
    }

    fn set_platform_enabled(&mut self, id: EntityId, enabled: bool) {
        for solid in self.solids.iter_mut().filter(|s| s.platform == Some(id)) {
            solid.enabled = enabled;
        }
    }

    fn integrate(&mut self, id: EntityId, body: &mut Body, dt: f32) {
        if body.simulated {
            body.velocity.y = (body.velocity.y + self.config.gravity * body.gravity_scale * dt)
                .max(-self.config.max_fall_speed);

            let motion = body.velocity + body.drift;
            body.position.x += motion.x * dt;
            if body.collision_enabled {
                self.resolve_axis(body, true, motion.x);
            }
            body.position.y += motion.y * dt;
            if body.collision_enabled {
                self.resolve_axis(body, false, motion.y);
            }
        }
        body.drift = Vec2::ZERO;
        self.sync_body(id, body);
    }

    fn collect_contacts(&mut self) -> Vec<Contact> {
        let mut ids: Vec<EntityId> = self.colliders.keys().copied().collect();
        ids.sort();

        let mut current = AHashSet::new();
        for (i, first) in ids.iter().enumerate() {
            let Some(a) = self.colliders.get(first).copied() else {
                continue;
            };
            for second in &ids[i + 1..] {
                if self.colliders.get(second).is_some_and(|b| Self::pair_touches(&a, b)) {
                    current.insert((*first, *second));
                }
            }
            if !a.enabled {
                continue;
            }
            for (trigger, bounds, layer) in &self.triggers {
                if !a.ignored.intersects(*layer) && a.bounds.overlaps(bounds) {
                    let pair = if first <= trigger { (*first, *trigger) } else { (*trigger, *first) };
                    current.insert(pair);
                }
            }
        }

        let mut contacts: Vec<Contact> = current
            .iter()
            .map(|(a, b)| {
                let phase = if self.touching.contains(&(*a, *b)) {
                    ContactPhase::Persisted
                } else {
                    ContactPhase::Began
                };
                Contact::new(*a, *b, phase)
            })
            .collect();
        contacts.sort_by_key(|c| (c.a, c.b));
        self.touching = current;
        contacts
    }
}
