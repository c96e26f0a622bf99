use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::{LoopConfig, LoopPacing};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::gameplay::capture::{
    CaptureSettings, DEFAULT_CAPTURE_BLACK_HOLD_SECONDS, DEFAULT_CAPTURE_FADE_SECONDS,
};
use super::gameplay::player::{PLAYER_BASE_SPEED, PLAYER_CROUCH_SPEED, PLAYER_SPRINT_SPEED};
use super::gameplay::session::SessionConfig;
use super::gameplay::tools::TORCH_DRAIN_PER_SECOND;

/// Optional `settings.json` at the project root. Every field has a default,
/// so a missing file and `{}` behave the same.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameSettings {
    pub(crate) target_tps: u32,
    pub(crate) max_ticks: Option<u64>,
    pub(crate) real_time: bool,
    pub(crate) metrics_log_interval_ms: u64,
    pub(crate) player_speed: f32,
    pub(crate) player_sprint_speed: f32,
    pub(crate) player_crouch_speed: f32,
    pub(crate) torch_drain_rate: f32,
    pub(crate) capture_fade_seconds: f32,
    pub(crate) capture_black_hold_seconds: f32,
    pub(crate) quit_after_sequence: Option<String>,
    pub(crate) report_path: Option<PathBuf>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: Some(7_200),
            real_time: false,
            metrics_log_interval_ms: 1_000,
            player_speed: PLAYER_BASE_SPEED,
            player_sprint_speed: PLAYER_SPRINT_SPEED,
            player_crouch_speed: PLAYER_CROUCH_SPEED,
            torch_drain_rate: TORCH_DRAIN_PER_SECOND,
            capture_fade_seconds: DEFAULT_CAPTURE_FADE_SECONDS,
            capture_black_hold_seconds: DEFAULT_CAPTURE_BLACK_HOLD_SECONDS,
            quit_after_sequence: Some("Ending".to_string()),
            report_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path} at {field_path}: {message}")]
    Parse {
        path: PathBuf,
        field_path: String,
        message: String,
    },
    #[error("invalid setting `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl GameSettings {
    pub(crate) fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            target_tps: self.target_tps,
            metrics_log_interval: Duration::from_millis(self.metrics_log_interval_ms),
            max_ticks: self.max_ticks,
            pacing: if self.real_time {
                LoopPacing::RealTime
            } else {
                LoopPacing::Unpaced
            },
            ..LoopConfig::default()
        }
    }

    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig {
            player_speed: self.player_speed,
            player_sprint_speed: self.player_sprint_speed,
            player_crouch_speed: self.player_crouch_speed,
            torch_drain_rate: self.torch_drain_rate,
            capture: CaptureSettings {
                fade_seconds: self.capture_fade_seconds,
                black_hold_seconds: self.capture_black_hold_seconds,
            },
            quit_after_sequence: self.quit_after_sequence.clone(),
            report_path: self.report_path.clone(),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.target_tps == 0 {
            return Err(SettingsError::Invalid {
                field: "target_tps",
                message: "must be greater than zero".to_string(),
            });
        }
        let non_negative = [
            ("player_speed", self.player_speed),
            ("player_sprint_speed", self.player_sprint_speed),
            ("player_crouch_speed", self.player_crouch_speed),
            ("torch_drain_rate", self.torch_drain_rate),
            ("capture_fade_seconds", self.capture_fade_seconds),
            ("capture_black_hold_seconds", self.capture_black_hold_seconds),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::Invalid {
                    field,
                    message: format!("expected a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn load_settings(path: &Path) -> Result<GameSettings, SettingsError> {
    if !path.is_file() {
        info!(path = %path.display(), "settings_missing_using_defaults");
        return Ok(GameSettings::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = parse_settings(path, &raw)?;
    info!(path = %path.display(), "settings_loaded");
    Ok(settings)
}

fn parse_settings(path: &Path, raw: &str) -> Result<GameSettings, SettingsError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let settings = serde_path_to_error::deserialize::<_, GameSettings>(&mut deserializer)
        .map_err(|error| {
            let field_path = error.path().to_string();
            let source = error.into_inner();
            SettingsError::Parse {
                path: path.to_path_buf(),
                field_path,
                message: source.to_string(),
            }
        })?;
    settings.validate()?;
    Ok(settings)
}
