use std::ops::{Add, AddAssign, Mul, Sub};

use serde::Serialize;

use super::input::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (other - self).length()
    }

    pub fn normalize_or_zero(self) -> Vec3 {
        let length = self.length();
        if length <= f32::EPSILON {
            Vec3::ZERO
        } else {
            self * (1.0 / length)
        }
    }

    /// Drops the vertical component.
    pub fn flat(self) -> Vec3 {
        Vec3::new(self.x, 0.0, self.z)
    }

    /// Unsigned angle in degrees; zero when either vector is degenerate.
    pub fn angle_degrees(self, other: Vec3) -> f32 {
        let a = self.normalize_or_zero();
        let b = other.normalize_or_zero();
        if a == Vec3::ZERO || b == Vec3::ZERO {
            return 0.0;
        }
        a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Position plus heading around the vertical axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose {
    pub position: Vec3,
    pub yaw_radians: f32,
}

impl Pose {
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            yaw_radians: 0.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw_radians.sin(), 0.0, self.yaw_radians.cos())
    }

    pub fn face_toward(&mut self, direction: Vec3) {
        let flat = direction.flat();
        if flat.length() > f32::EPSILON {
            self.yaw_radians = flat.x.atan2(flat.z);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MarkerKind {
    Interaction,
    Pickup,
    Stair,
}

const MARKER_COUNT: usize = 3;

impl MarkerKind {
    const fn index(self) -> usize {
        match self {
            MarkerKind::Interaction => 0,
            MarkerKind::Pickup => 1,
            MarkerKind::Stair => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerSet {
    attached: [bool; MARKER_COUNT],
}

impl MarkerSet {
    pub fn contains(&self, kind: MarkerKind) -> bool {
        self.attached[kind.index()]
    }

    fn set(&mut self, kind: MarkerKind, attached: bool) {
        self.attached[kind.index()] = attached;
    }

    pub fn is_empty(&self) -> bool {
        self.attached.iter().all(|attached| !attached)
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub pose: Pose,
    pub active: bool,
    markers: MarkerSet,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn markers(&self) -> MarkerSet {
        self.markers
    }

    pub fn has_marker(&self, kind: MarkerKind) -> bool {
        self.markers.contains(kind)
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Registry of every named object the gameplay layer can reference. Spawns and
/// despawns are staged and land on `apply_pending`, so ids handed out during a
/// tick stay resolvable until the tick driver flushes.
#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
}

impl SceneWorld {
    pub fn spawn(&mut self, name: impl Into<String>, pose: Pose) -> EntityId {
        self.spawn_internal(name.into(), pose, true)
    }

    pub fn spawn_inactive(&mut self, name: impl Into<String>, pose: Pose) -> EntityId {
        self.spawn_internal(name.into(), pose, false)
    }

    fn spawn_internal(&mut self, name: String, pose: Pose, active: bool) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            name,
            pose,
            active,
            markers: MarkerSet::default(),
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn is_pending_despawn(&self, id: EntityId) -> bool {
        self.pending_despawns.contains(&id)
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_spawns.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }

        if !self.pending_spawns.is_empty() {
            for mut entity in self.pending_spawns.drain(..) {
                entity.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.entities.push(entity);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    /// First applied entity with the given name, in spawn order.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.name == name)
            .min_by_key(|entity| entity.applied_spawn_order)
            .map(|entity| entity.id)
    }

    pub fn position_of(&self, id: EntityId) -> Option<Vec3> {
        self.find_entity(id).map(|entity| entity.pose.position)
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.find_entity(id).is_some_and(|entity| entity.active)
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.active = active;
                true
            }
            None => false,
        }
    }

    pub fn set_pose(&mut self, id: EntityId, pose: Pose) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.pose = pose;
                true
            }
            None => false,
        }
    }

    /// Returns false when the entity is missing or already carries the marker.
    pub fn attach_marker(&mut self, id: EntityId, kind: MarkerKind) -> bool {
        let Some(entity) = self.find_entity_mut(id) else {
            return false;
        };
        if entity.markers.contains(kind) {
            return false;
        }
        entity.markers.set(kind, true);
        true
    }

    pub fn detach_marker(&mut self, id: EntityId, kind: MarkerKind) -> bool {
        let Some(entity) = self.find_entity_mut(id) else {
            return false;
        };
        if !entity.markers.contains(kind) {
            return false;
        }
        entity.markers.set(kind, false);
        true
    }

    pub fn has_marker(&self, id: EntityId, kind: MarkerKind) -> bool {
        self.find_entity(id)
            .is_some_and(|entity| entity.markers.contains(kind))
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.0001,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn spawn_is_deferred_until_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn("crate", Pose::default());

        assert_eq!(world.entity_count(), 0);
        assert!(world.find_entity(id).is_none());

        world.apply_pending();
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.find_by_name("crate"), Some(id));
    }

    #[test]
    fn despawn_of_pending_spawn_drops_it() {
        let mut world = SceneWorld::default();
        let id = world.spawn("ghost", Pose::default());

        assert!(world.despawn(id));
        world.apply_pending();

        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn despawn_unknown_entity_is_rejected() {
        let mut world = SceneWorld::default();
        assert!(!world.despawn(EntityId(42)));
    }

    #[test]
    fn duplicate_despawn_requests_apply_once() {
        let mut world = SceneWorld::default();
        let keep = world.spawn("keep", Pose::default());
        let drop = world.spawn("drop", Pose::default());
        world.apply_pending();

        assert!(world.despawn(drop));
        assert!(world.despawn(drop));
        assert!(world.is_pending_despawn(drop));
        world.apply_pending();

        assert_eq!(world.entity_count(), 1);
        assert!(world.find_entity(keep).is_some());
        assert!(!world.is_pending_despawn(drop));
    }

    #[test]
    fn markers_attach_once_and_detach() {
        let mut world = SceneWorld::default();
        let id = world.spawn("lever", Pose::default());
        world.apply_pending();

        assert!(world.attach_marker(id, MarkerKind::Interaction));
        assert!(!world.attach_marker(id, MarkerKind::Interaction));
        assert!(world.has_marker(id, MarkerKind::Interaction));
        assert!(!world.has_marker(id, MarkerKind::Pickup));

        assert!(world.detach_marker(id, MarkerKind::Interaction));
        assert!(!world.detach_marker(id, MarkerKind::Interaction));
        assert!(world
            .find_entity(id)
            .expect("entity")
            .markers()
            .is_empty());
    }

    #[test]
    fn inactive_spawn_can_be_activated() {
        let mut world = SceneWorld::default();
        let id = world.spawn_inactive("second_part", Pose::default());
        world.apply_pending();

        assert!(!world.is_active(id));
        assert!(world.set_active(id, true));
        assert!(world.is_active(id));
        assert!(!world.set_active(EntityId(99), true));
    }

    #[test]
    fn find_by_name_prefers_earliest_spawn() {
        let mut world = SceneWorld::default();
        let first = world.spawn("door", Pose::default());
        let _second = world.spawn("door", Pose::default());
        world.apply_pending();

        assert_eq!(world.find_by_name("door"), Some(first));
        assert_eq!(world.find_by_name("window"), None);
    }

    #[test]
    fn vec3_helpers() {
        let a = Vec3::new(3.0, 0.0, 4.0);
        assert_close(a.length(), 5.0);
        assert_close(Vec3::ZERO.distance(a), 5.0);
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
        assert_close(a.normalize_or_zero().length(), 1.0);
        assert_close(Vec3::FORWARD.angle_degrees(Vec3::new(1.0, 0.0, 0.0)), 90.0);
    }

    #[test]
    fn pose_faces_movement_direction() {
        let mut pose = Pose::default();
        assert_close(pose.forward().z, 1.0);

        pose.face_toward(Vec3::new(1.0, 5.0, 0.0));
        let forward = pose.forward();
        assert_close(forward.x, 1.0);
        assert_close(forward.z, 0.0);

        pose.face_toward(Vec3::new(0.0, 1.0, 0.0));
        assert_close(pose.forward().x, 1.0);
    }
}
