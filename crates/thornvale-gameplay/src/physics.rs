//! Physics seam.
//!
//! The core does not integrate rigid bodies itself. It reads and writes a
//! [`Body`] per actor (the physics command) and asks a [`PhysicsQuery`]
//! provider about the world. A [`PhysicsWorld`] additionally integrates bodies
//! and reports contacts; [`crate::flat_world::FlatWorld`] is the reference one.

use serde::{Deserialize, Serialize};
use thornvale_common::{EntityId, LayerMask, Vec2};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Creates a new AABB from corners.
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    /// Creates an AABB from center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Returns the center of the AABB.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns half the size.
    #[must_use]
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Checks if this AABB overlaps with another.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Checks if a point lies inside (edges inclusive).
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Checks if a circle touches the box.
    #[must_use]
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    /// Distance from `point` to the closest point of the box.
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        point.clamp(self.min, self.max).distance(point)
    }

    /// Returns the AABB translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Expands the AABB by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        Self::new(self.min - Vec2::splat(margin), self.max + Vec2::splat(margin))
    }

    /// Entry distance of a ray into the box, if it hits within `max_distance`.
    #[must_use]
    pub fn ray_hit(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;
        for axis in 0..2 {
            let (o, d, lo, hi) = (origin[axis], direction[axis], self.min[axis], self.max[axis]);
            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
            } else {
                let inv = 1.0 / d;
                let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return None;
                }
            }
        }
        Some(t_min)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::from_center(Vec2::ZERO, Vec2::splat(0.5))
    }
}

/// Kinematic state of an actor, written by the state machines and integrated
/// by the physics step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Center position
    pub position: Vec2,
    /// Velocity in units/second
    pub velocity: Vec2,
    /// Half size of the collider
    pub half_extents: Vec2,
    /// Multiplier on world gravity
    pub gravity_scale: f32,
    /// Integrated by physics when true
    pub simulated: bool,
    /// Participates in collisions and contacts when true
    pub collision_enabled: bool,
    /// Layer this body lives on
    pub layer: LayerMask,
    /// Layers this body currently passes through
    pub ignored_layers: LayerMask,
    /// Push from the environment added to the next integration, then cleared
    #[serde(default)]
    pub drift: Vec2,
}

impl Body {
    /// Creates a simulated, colliding body at rest.
    #[must_use]
    pub fn new(position: Vec2, half_extents: Vec2, layer: LayerMask) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            half_extents,
            gravity_scale: 1.0,
            simulated: true,
            collision_enabled: true,
            layer,
            ignored_layers: LayerMask::NONE,
            drift: Vec2::ZERO,
        }
    }

    /// Sets the gravity scale.
    #[must_use]
    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    /// Collider bounds.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents)
    }

    /// Bottom-center point, used for ground checks.
    #[must_use]
    pub fn feet(&self) -> Vec2 {
        self.position - Vec2::new(0.0, self.half_extents.y)
    }

    /// Point just outside the collider on the given side (±1).
    #[must_use]
    pub fn side(&self, direction_sign: f32) -> Vec2 {
        self.position + Vec2::new(direction_sign.signum() * self.half_extents.x, 0.0)
    }

    /// Stops all motion and physics reactivity (death, freezes).
    pub fn disable(&mut self) {
        self.velocity = Vec2::ZERO;
        self.simulated = false;
        self.collision_enabled = false;
    }

    /// Restores physics reactivity.
    pub fn enable(&mut self) {
        self.simulated = true;
        self.collision_enabled = true;
    }
}

/// World queries the state machines rely on.
///
/// All queries take a position/shape and a layer filter.
pub trait PhysicsQuery {
    /// True if a circle overlaps static geometry on `mask`.
    fn overlaps_geometry(&self, center: Vec2, radius: f32, mask: LayerMask) -> bool;

    /// Ground check at the feet.
    fn is_grounded(&self, feet: Vec2, radius: f32, mask: LayerMask) -> bool {
        self.overlaps_geometry(feet, radius, mask)
    }

    /// Wall check beside the body.
    fn touching_wall(&self, side: Vec2, radius: f32, mask: LayerMask) -> bool {
        self.overlaps_geometry(side, radius, mask)
    }

    /// Bodies and triggers on `mask` touching a circle, sorted by id.
    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<EntityId>;

    /// True if a ray hits static geometry on `mask` within `distance`.
    fn raycast(&self, origin: Vec2, direction: Vec2, distance: f32, mask: LayerMask) -> bool;
}

/// Phase of a contact between two colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactPhase {
    /// First tick of overlap.
    Began,
    /// Overlap continued from the previous tick.
    Persisted,
}

/// Overlap between two colliders reported after a physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contact {
    /// Lower id of the pair
    pub a: EntityId,
    /// Higher id of the pair
    pub b: EntityId,
    /// Began or persisted
    pub phase: ContactPhase,
}

impl Contact {
    /// Creates a contact with the pair ordered by id.
    #[must_use]
    pub fn new(first: EntityId, second: EntityId, phase: ContactPhase) -> Self {
        let (a, b) = if first <= second { (first, second) } else { (second, first) };
        Self { a, b, phase }
    }

    /// The other side of the contact, if `id` is part of it.
    #[must_use]
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// A physics world the simulation can drive.
pub trait PhysicsWorld: PhysicsQuery {
    /// Registers or updates an actor collider from its body.
    fn sync_body(&mut self, id: EntityId, body: &Body);

    /// Removes an actor collider.
    fn remove_body(&mut self, id: EntityId);

    /// Registers a static trigger volume (hazards, chests).
    fn add_trigger(&mut self, id: EntityId, bounds: Aabb, layer: LayerMask);

    /// Registers a ground platform that can be switched off (trapdoors).
    fn add_platform(&mut self, id: EntityId, bounds: Aabb);

    /// Switches a platform's collision on or off. Unknown ids are ignored.
    fn set_platform_enabled(&mut self, id: EntityId, enabled: bool);

    /// Integrates a body by `dt`, resolving collisions with static geometry.
    /// The body's drift is added to its velocity for this step and cleared.
    fn integrate(&mut self, id: EntityId, body: &mut Body, dt: f32);

    /// Overlaps since the previous call.
    fn collect_contacts(&mut self) -> Vec<Contact>;
}

/// Mock physics query for testing state machines in isolation.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MockPhysics {
    /// Result of ground checks
    pub grounded: bool,
    /// Result of wall checks
    pub wall: bool,
    /// Result of downward raycasts (floor ahead)
    pub ground_ahead: bool,
    /// Result of horizontal raycasts (wall ahead)
    pub wall_ahead: bool,
    /// Colliders returned by overlap queries: id, center, radius, layer
    pub colliders: Vec<(EntityId, Vec2, f32, LayerMask)>,
}

#[cfg(test)]
impl Default for MockPhysics {
    fn default() -> Self {
        Self {
            grounded: true,
            wall: false,
            ground_ahead: true,
            wall_ahead: false,
            colliders: Vec::new(),
        }
    }
}

#[cfg(test)]
impl MockPhysics {
    /// Creates a mock standing on flat, open ground.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock with nothing underfoot.
    #[must_use]
    pub fn airborne() -> Self {
        Self {
            grounded: false,
            ..Self::default()
        }
    }

    /// Adds a collider returned by overlap queries.
    pub fn add_collider(&mut self, id: EntityId, center: Vec2, radius: f32, layer: LayerMask) {
        self.colliders.push((id, center, radius, layer));
    }
}

#[cfg(test)]
impl PhysicsQuery for MockPhysics {
    fn overlaps_geometry(&self, _center: Vec2, _radius: f32, _mask: LayerMask) -> bool {
        self.grounded
    }

    fn is_grounded(&self, _feet: Vec2, _radius: f32, _mask: LayerMask) -> bool {
        self.grounded
    }

    fn touching_wall(&self, _side: Vec2, _radius: f32, _mask: LayerMask) -> bool {
        self.wall
    }

    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<EntityId> {
        let mut hits: Vec<EntityId> = self
            .colliders
            .iter()
            .filter(|(_, pos, r, layer)| mask.intersects(*layer) && pos.distance(center) <= radius + r)
            .map(|(id, ..)| *id)
            .collect();
        hits.sort();
        hits
    }

    fn raycast(&self, _origin: Vec2, direction: Vec2, _distance: f32, _mask: LayerMask) -> bool {
        if direction.y < -0.5 {
            self.ground_ahead
        } else {
            self.wall_ahead
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::from_center(Vec2::ZERO, Vec2::splat(1.0));
        let b = Aabb::from_center(Vec2::new(1.5, 0.0), Vec2::splat(1.0));
        let c = Aabb::from_center(Vec2::new(3.0, 0.0), Vec2::splat(0.5));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.contains_point(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_aabb_circle_and_distance() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0));
        assert!(a.intersects_circle(Vec2::new(2.5, 0.5), 0.5));
        assert!(!a.intersects_circle(Vec2::new(3.0, 0.5), 0.5));
        assert_eq!(a.distance_to(Vec2::new(5.0, 0.5)), 3.0);
    }

    #[test]
    fn test_aabb_ray_hit() {
        let a = Aabb::new(Vec2::new(2.0, -1.0), Vec2::new(3.0, 1.0));
        assert_eq!(a.ray_hit(Vec2::ZERO, Vec2::X, 5.0), Some(2.0));
        assert_eq!(a.ray_hit(Vec2::ZERO, Vec2::X, 1.0), None);
        assert_eq!(a.ray_hit(Vec2::ZERO, Vec2::NEG_X, 5.0), None);
        assert_eq!(a.ray_hit(Vec2::new(2.5, 5.0), Vec2::NEG_Y, 10.0), Some(4.0));
    }

    #[test]
    fn test_body_queries() {
        let body = Body::new(Vec2::new(0.0, 1.0), Vec2::new(0.5, 1.0), LayerMask::PLAYER);
        assert_eq!(body.feet(), Vec2::ZERO);
        assert_eq!(body.side(-1.0), Vec2::new(-0.5, 1.0));
    }

    #[test]
    fn test_contact_ordering() {
        let low = EntityId::from_raw(3);
        let high = EntityId::from_raw(9);
        let contact = Contact::new(high, low, ContactPhase::Began);
        assert_eq!(contact.a, low);
        assert_eq!(contact.other(low), Some(high));
        assert_eq!(contact.other(EntityId::from_raw(1)), None);
    }

    #[test]
    fn test_mock_overlap_filters_by_layer() {
        let mut physics = MockPhysics::new();
        let player = EntityId::from_raw(1);
        physics.add_collider(player, Vec2::new(1.0, 0.0), 0.5, LayerMask::PLAYER);
        physics.add_collider(EntityId::from_raw(2), Vec2::ZERO, 0.5, LayerMask::ENEMY);

        assert_eq!(physics.overlap_circle(Vec2::ZERO, 0.8, LayerMask::PLAYER), vec![player]);
        assert!(physics.overlap_circle(Vec2::new(5.0, 0.0), 0.8, LayerMask::PLAYER).is_empty());
    }
}
