use std::fs;
use std::path::{Path, PathBuf};

use engine::{EntityId, Pose, SignalCounts};
use serde::Serialize;
use thiserror::Error;

use super::ai::{ChaserState, CompanionState, PostureFlags, StalkerState};
use super::equip::EquipSnapshot;
use super::sequencer::{SequenceState, StepTransition};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SequenceSummary {
    pub(crate) name: String,
    pub(crate) state: SequenceState,
    pub(crate) transitions: Vec<StepTransition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ChaserSummary {
    pub(crate) entity: EntityId,
    pub(crate) name: String,
    pub(crate) state: ChaserState,
    pub(crate) activated: bool,
    pub(crate) posture: PostureFlags,
    pub(crate) attack_triggers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StalkerSummary {
    pub(crate) entity: EntityId,
    pub(crate) name: String,
    pub(crate) state: StalkerState,
    /// Repelled by torchlight within the return delay.
    pub(crate) affected: bool,
    pub(crate) posture: PostureFlags,
    pub(crate) attack_triggers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CompanionSummary {
    pub(crate) entity: EntityId,
    pub(crate) name: String,
    pub(crate) state: CompanionState,
    pub(crate) crouching: bool,
    pub(crate) posture: PostureFlags,
}

/// End-of-session snapshot, logged on unload and optionally written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SessionReport {
    pub(crate) scene: String,
    pub(crate) ticks: u64,
    pub(crate) content_fingerprint: String,
    pub(crate) sequences: Vec<SequenceSummary>,
    pub(crate) chasers: Vec<ChaserSummary>,
    pub(crate) stalkers: Vec<StalkerSummary>,
    pub(crate) companions: Vec<CompanionSummary>,
    pub(crate) captures_completed: u32,
    pub(crate) checkpoint: Option<Pose>,
    pub(crate) equipment: EquipSnapshot,
    pub(crate) speed_multiplier: f32,
    pub(crate) jump_multiplier: f32,
    pub(crate) dialogue_runs: u32,
    pub(crate) interactions: u32,
    pub(crate) signals: SignalCounts,
}

#[derive(Debug, Error)]
pub(crate) enum ReportError {
    #[error("failed to serialize session report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write session report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionReport {
    pub(crate) fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub(crate) fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let raw = self.to_json()?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ReportError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, raw).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sample() -> SessionReport {
        SessionReport {
            scene: "Manor".to_string(),
            ticks: 42,
            content_fingerprint: "abc".to_string(),
            sequences: vec![SequenceSummary {
                name: "Tutorial".to_string(),
                state: SequenceState::Complete,
                transitions: vec![StepTransition {
                    index: 0,
                    step_id: "intro".to_string(),
                }],
            }],
            chasers: Vec::new(),
            stalkers: Vec::new(),
            companions: Vec::new(),
            captures_completed: 1,
            checkpoint: None,
            speed_multiplier: 1.0,
            jump_multiplier: 1.0,
            equipment: EquipSnapshot {
                equipped: None,
                torch_lit: false,
                fuel: 0.0,
                rocks: 0,
                injectable: None,
            },
            dialogue_runs: 2,
            interactions: 3,
            signals: SignalCounts::default(),
        }
    }

    #[test]
    fn report_serializes_sequence_progress() {
        let json: serde_json::Value =
            serde_json::from_str(&sample().to_json().expect("json")).expect("parse");
        assert_eq!(json["sequences"][0]["state"], "Complete");
        assert_eq!(json["sequences"][0]["transitions"][0]["step_id"], "intro");
        assert_eq!(json["captures_completed"], 1);
    }

    #[test]
    fn report_writes_into_missing_directory() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("out").join("report.json");

        sample().write_to(&path).expect("write");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"scene\": \"Manor\""));
    }
}
