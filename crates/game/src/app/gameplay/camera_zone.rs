use engine::{EntityId, SceneWorld, Vec3};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CameraSettings {
    pub(crate) zone_name: String,
    pub(crate) offset: Vec3,
    /// Euler angles in degrees.
    pub(crate) rotation: Vec3,
    pub(crate) transition_speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            zone_name: String::new(),
            offset: Vec3::new(0.0, 2.0, -5.0),
            rotation: Vec3::new(20.0, 0.0, 0.0),
            transition_speed: 2.0,
        }
    }
}

impl CameraSettings {
    pub(crate) fn named(zone_name: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct CameraZone {
    entity: EntityId,
    radius: f32,
    settings: CameraSettings,
    player_inside: bool,
}

/// Chooses the camera settings for the player's position. Leaving a zone
/// restores the default, matching enter/exit trigger semantics.
#[derive(Debug, Clone, Default)]
pub(crate) struct CameraZoneTracker {
    zones: Vec<CameraZone>,
    default_settings: CameraSettings,
    active_zone: Option<usize>,
}

impl CameraZoneTracker {
    pub(crate) fn add(&mut self, entity: EntityId, radius: f32, settings: CameraSettings) {
        self.zones.push(CameraZone {
            entity,
            radius: radius.max(0.0),
            settings,
            player_inside: false,
        });
    }

    pub(crate) fn active(&self) -> &CameraSettings {
        self.active_zone
            .and_then(|index| self.zones.get(index))
            .map_or(&self.default_settings, |zone| &zone.settings)
    }

    pub(crate) fn tick(&mut self, player_position: Vec3, world: &SceneWorld) {
        for (index, zone) in self.zones.iter_mut().enumerate() {
            let inside = world.find_entity(zone.entity).is_some_and(|entity| {
                entity.active && entity.pose.position.distance(player_position) <= zone.radius
            });
            if inside && !zone.player_inside {
                self.active_zone = Some(index);
                debug!(zone = %zone.settings.zone_name, "camera_zone_entered");
            } else if !inside && zone.player_inside && self.active_zone == Some(index) {
                self.active_zone = None;
                debug!(zone = %zone.settings.zone_name, "camera_zone_exited");
            }
            zone.player_inside = inside;
        }
    }
}
