use engine::{Pose, Vec3};

use super::camera_zone::CameraSettings;
use super::effects::EffectKind;
use super::interaction::{InteractableKind, LockState};
use super::inventory::ItemKind;
use super::transition::DEFAULT_SPAWN_POINT;

/// What a placed entity is wired up as when the session loads.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LayoutRole {
    Player,
    SpawnPoint,
    /// Plain named entity: sequence targets, dialogue zone anchors, signs.
    Prop,
    Interactable(InteractableKind),
    Checkpoint {
        radius: f32,
    },
    CameraZone {
        radius: f32,
        settings: CameraSettings,
    },
    Chaser {
        def: String,
    },
    Stalker {
        def: String,
    },
    Companion,
    /// Area a companion has to crouch through.
    LowCeiling {
        radius: f32,
    },
    /// Starts `sequence` on enter, skips it to the end on exit.
    EndTrigger {
        radius: f32,
        sequence: String,
    },
    SceneExit {
        radius: f32,
        target: String,
        spawn_point: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayoutEntry {
    pub(crate) name: String,
    pub(crate) pose: Pose,
    pub(crate) active: bool,
    pub(crate) role: LayoutRole,
}

/// Entities placed by a scene, in spawn order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Layout {
    pub(crate) scene_name: String,
    pub(crate) entries: Vec<LayoutEntry>,
}

impl Layout {
    pub(crate) fn new(scene_name: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn place(mut self, name: &str, position: Vec3, role: LayoutRole) -> Self {
        self.entries.push(LayoutEntry {
            name: name.to_string(),
            pose: Pose::at(position),
            active: true,
            role,
        });
        self
    }

    /// Spawned inactive; a sequence step or completion list wakes it up.
    pub(crate) fn place_hidden(mut self, name: &str, position: Vec3, role: LayoutRole) -> Self {
        self.entries.push(LayoutEntry {
            name: name.to_string(),
            pose: Pose::at(position),
            active: false,
            role,
        });
        self
    }

    pub(crate) fn find(&self, name: &str) -> Option<&LayoutEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// The bundled level. Names line up with `assets/defs/*.xml`.
    pub(crate) fn demo() -> Self {
        let mut hall_camera = CameraSettings::named("Hall");
        hall_camera.offset = Vec3::new(0.0, 6.0, -3.0);
        hall_camera.rotation = Vec3::new(45.0, 0.0, 0.0);

        Self::new("Manor")
            .place("Player", Vec3::ZERO, LayoutRole::Player)
            .place(DEFAULT_SPAWN_POINT, Vec3::ZERO, LayoutRole::SpawnPoint)
            .place("Companion", Vec3::new(-1.0, 0.0, -1.0), LayoutRole::Companion)
            .place("NookZone", Vec3::new(-2.0, 0.0, 6.5), LayoutRole::Prop)
            .place_hidden(
                "TutorialTorch",
                Vec3::new(0.0, 0.0, 4.0),
                LayoutRole::Interactable(InteractableKind::WorldPickup(ItemKind::Torch)),
            )
            .place_hidden("TutorialLever", Vec3::new(3.0, 0.0, 4.0), LayoutRole::Prop)
            .place_hidden(
                "TutorialStair",
                Vec3::new(3.0, 0.0, 8.0),
                LayoutRole::Interactable(InteractableKind::Stair {
                    top: Vec3::new(3.0, 4.0, 12.0),
                    bottom: Vec3::new(3.0, 0.0, 7.0),
                }),
            )
            .place_hidden("TutorialSign", Vec3::new(3.0, 4.0, 13.0), LayoutRole::Prop)
            .place(
                "Rock_1",
                Vec3::new(-2.0, 0.0, 6.0),
                LayoutRole::Interactable(InteractableKind::WorldPickup(ItemKind::Rock)),
            )
            .place(
                "Rock_2",
                Vec3::new(-2.5, 0.0, 7.0),
                LayoutRole::Interactable(InteractableKind::WorldPickup(ItemKind::Rock)),
            )
            .place(
                "Screwdriver",
                Vec3::new(6.0, 4.0, 14.0),
                LayoutRole::Interactable(InteractableKind::WorldPickup(ItemKind::Screwdriver)),
            )
            .place(
                "SpeedVial",
                Vec3::new(0.0, 4.0, 16.0),
                LayoutRole::Interactable(InteractableKind::Injectable(EffectKind::SpeedBoost)),
            )
            .place(
                "CellarDoor",
                Vec3::new(8.0, 4.0, 18.0),
                LayoutRole::Interactable(InteractableKind::Lockable(LockState::Locked)),
            )
            .place(
                "CrawlSpace",
                Vec3::new(-2.0, 0.0, 9.0),
                LayoutRole::LowCeiling { radius: 1.5 },
            )
            .place(
                "Checkpoint_Landing",
                Vec3::new(3.0, 4.0, 12.0),
                LayoutRole::Checkpoint { radius: 1.5 },
            )
            .place(
                "HallCamera",
                Vec3::new(3.0, 4.0, 16.0),
                LayoutRole::CameraZone {
                    radius: 4.0,
                    settings: hall_camera,
                },
            )
            .place(
                "Hound",
                Vec3::new(-30.0, 0.0, 30.0),
                LayoutRole::Chaser {
                    def: "Hound".to_string(),
                },
            )
            .place(
                "Shade",
                Vec3::new(30.0, 4.0, 40.0),
                LayoutRole::Stalker {
                    def: "Shade".to_string(),
                },
            )
            .place_hidden(
                "EndTrigger",
                Vec3::new(0.0, 4.0, 20.0),
                LayoutRole::EndTrigger {
                    radius: 2.0,
                    sequence: "Ending".to_string(),
                },
            )
            .place_hidden("EndDoor", Vec3::new(0.0, 4.0, 22.0), LayoutRole::Prop)
            .place(
                "CellarExit",
                Vec3::new(8.0, 4.0, 24.0),
                LayoutRole::SceneExit {
                    radius: 1.0,
                    target: "Cellar".to_string(),
                    spawn_point: "CellarSpawn".to_string(),
                },
            )
            .place("CellarSpawn", Vec3::new(8.0, -4.0, 24.0), LayoutRole::SpawnPoint)
    }
}
