use engine::{EntityId, Pose, SceneWorld, Vec3};
use tracing::info;

/// Last checkpoint the player touched. Only `CheckpointTriggers` writes it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CheckpointStore {
    current: Option<Pose>,
}

impl CheckpointStore {
    /// Respawn pose; the world origin until a checkpoint has been reached.
    pub(crate) fn get(&self) -> Pose {
        self.current.unwrap_or_default()
    }

    pub(crate) fn has_checkpoint(&self) -> bool {
        self.current.is_some()
    }

    fn record(&mut self, pose: Pose) {
        self.current = Some(pose);
    }
}

#[derive(Debug, Clone)]
struct CheckpointTrigger {
    entity: EntityId,
    radius: f32,
    player_inside: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CheckpointTriggers {
    triggers: Vec<CheckpointTrigger>,
}

impl CheckpointTriggers {
    pub(crate) fn add(&mut self, entity: EntityId, radius: f32) {
        self.triggers.push(CheckpointTrigger {
            entity,
            radius: radius.max(0.0),
            player_inside: false,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Records the pose of any trigger the player entered this tick. Returns
    /// the trigger that was recorded last.
    pub(crate) fn tick(
        &mut self,
        player_position: Vec3,
        world: &SceneWorld,
        store: &mut CheckpointStore,
    ) -> Option<EntityId> {
        let mut reached = None;
        for trigger in &mut self.triggers {
            let Some(entity) = world.find_entity(trigger.entity) else {
                trigger.player_inside = false;
                continue;
            };
            let inside =
                entity.active && entity.pose.position.distance(player_position) <= trigger.radius;
            if inside && !trigger.player_inside {
                store.record(entity.pose);
                info!(
                    checkpoint = %entity.name,
                    x = entity.pose.position.x,
                    z = entity.pose.position.z,
                    "checkpoint_reached"
                );
                reached = Some(trigger.entity);
            }
            trigger.player_inside = inside;
        }
        reached
    }
}
