use std::collections::HashMap;

use serde::Serialize;

pub const DEFAULT_DETECTION_RANGE: f32 = 10.0;
pub const DEFAULT_ACTIVATION_RANGE: f32 = 7.0;
pub const DEFAULT_CHASER_ATTACK_RANGE: f32 = 1.5;
pub const DEFAULT_CHASE_SPEED: f32 = 6.0;
pub const DEFAULT_RETURN_SPEED: f32 = 2.0;
pub const DEFAULT_RETURN_THRESHOLD: f32 = 0.5;

pub const DEFAULT_STALKER_NORMAL_SPEED: f32 = 2.5;
pub const DEFAULT_STALKER_RETREAT_SPEED: f32 = 4.0;
pub const DEFAULT_STALKER_ATTACK_RANGE: f32 = 1.5;
pub const DEFAULT_MAX_REPEL_DISTANCE: f32 = 10.0;
pub const DEFAULT_RETREAT_DISTANCE: f32 = 6.0;
pub const DEFAULT_RETURN_DELAY: f32 = 0.5;
pub const DEFAULT_RETREAT_SAMPLE_RADIUS: f32 = 5.0;

pub const DEFAULT_DIALOGUE_ZONE_RADIUS: f32 = 2.0;
pub const DEFAULT_EXTRA_READING_TIME: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepActionKind {
    Dialogue,
    Interaction,
    Pickup,
    UseStair,
}

impl StepActionKind {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Dialogue" => Some(Self::Dialogue),
            "Interaction" => Some(Self::Interaction),
            "Pickup" => Some(Self::Pickup),
            "UseStair" => Some(Self::UseStair),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLineDef {
    pub text: String,
    pub play_once: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDef {
    pub step_id: String,
    pub action: StepActionKind,
    /// Entity name resolved against the world when the sequence is built.
    pub target: Option<String>,
    pub requires_input: bool,
    pub description: String,
    pub dialogue: Vec<DialogueLineDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDef {
    pub def_name: String,
    pub start_on_load: bool,
    pub steps: Vec<StepDef>,
    pub activate_on_complete: Vec<String>,
    pub deactivate_on_complete: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChaserDef {
    pub def_name: String,
    pub detection_range: f32,
    pub activation_range: f32,
    pub attack_range: f32,
    pub chase_speed: f32,
    pub return_speed: f32,
    pub return_threshold: f32,
    pub return_home_when_lost: bool,
}

impl ChaserDef {
    pub fn with_defaults(def_name: impl Into<String>) -> Self {
        Self {
            def_name: def_name.into(),
            detection_range: DEFAULT_DETECTION_RANGE,
            activation_range: DEFAULT_ACTIVATION_RANGE,
            attack_range: DEFAULT_CHASER_ATTACK_RANGE,
            chase_speed: DEFAULT_CHASE_SPEED,
            return_speed: DEFAULT_RETURN_SPEED,
            return_threshold: DEFAULT_RETURN_THRESHOLD,
            return_home_when_lost: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StalkerDef {
    pub def_name: String,
    pub normal_speed: f32,
    pub retreat_speed: f32,
    pub attack_range: f32,
    pub max_repel_distance: f32,
    pub retreat_distance: f32,
    pub return_delay: f32,
    pub retreat_sample_radius: f32,
}

impl StalkerDef {
    pub fn with_defaults(def_name: impl Into<String>) -> Self {
        Self {
            def_name: def_name.into(),
            normal_speed: DEFAULT_STALKER_NORMAL_SPEED,
            retreat_speed: DEFAULT_STALKER_RETREAT_SPEED,
            attack_range: DEFAULT_STALKER_ATTACK_RANGE,
            max_repel_distance: DEFAULT_MAX_REPEL_DISTANCE,
            retreat_distance: DEFAULT_RETREAT_DISTANCE,
            return_delay: DEFAULT_RETURN_DELAY,
            retreat_sample_radius: DEFAULT_RETREAT_SAMPLE_RADIUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueZoneDef {
    pub def_name: String,
    pub zone: String,
    pub radius: f32,
    pub extra_reading_time: f32,
    pub lines: Vec<DialogueLineDef>,
}

#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    sequences: Vec<SequenceDef>,
    chasers: Vec<ChaserDef>,
    stalkers: Vec<StalkerDef>,
    dialogue_zones: Vec<DialogueZoneDef>,
    sequence_index_by_name: HashMap<String, usize>,
    fingerprint: String,
}

impl DefDatabase {
    pub(crate) fn from_defs(
        sequences: Vec<SequenceDef>,
        chasers: Vec<ChaserDef>,
        stalkers: Vec<StalkerDef>,
        dialogue_zones: Vec<DialogueZoneDef>,
        fingerprint: String,
    ) -> Self {
        let sequence_index_by_name = sequences
            .iter()
            .enumerate()
            .map(|(idx, def)| (def.def_name.clone(), idx))
            .collect();
        Self {
            sequences,
            chasers,
            stalkers,
            dialogue_zones,
            sequence_index_by_name,
            fingerprint,
        }
    }

    pub fn sequence(&self, name: &str) -> Option<&SequenceDef> {
        self.sequence_index_by_name
            .get(name)
            .and_then(|idx| self.sequences.get(*idx))
    }

    pub fn sequences(&self) -> &[SequenceDef] {
        &self.sequences
    }

    pub fn chaser(&self, name: &str) -> Option<&ChaserDef> {
        self.chasers.iter().find(|def| def.def_name == name)
    }

    pub fn chasers(&self) -> &[ChaserDef] {
        &self.chasers
    }

    pub fn stalker(&self, name: &str) -> Option<&StalkerDef> {
        self.stalkers.iter().find(|def| def.def_name == name)
    }

    pub fn stalkers(&self) -> &[StalkerDef] {
        &self.stalkers
    }

    pub fn dialogue_zones(&self) -> &[DialogueZoneDef] {
        &self.dialogue_zones
    }

    /// SHA-256 over the compiled sources, lower-case hex.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn def_count(&self) -> usize {
        self.sequences.len() + self.chasers.len() + self.stalkers.len() + self.dialogue_zones.len()
    }
}
