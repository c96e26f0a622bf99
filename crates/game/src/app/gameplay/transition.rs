use thiserror::Error;
use tracing::info;

pub(crate) const DEFAULT_SPAWN_POINT: &str = "DefaultSpawn";

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TransitionTimings {
    pub(crate) fade_out_seconds: f32,
    pub(crate) minimum_loading_seconds: f32,
    pub(crate) black_hold_seconds: f32,
    pub(crate) fade_in_seconds: f32,
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            fade_out_seconds: 1.0,
            minimum_loading_seconds: 0.5,
            black_hold_seconds: 0.5,
            fade_in_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum TransitionError {
    #[error("scene transition to `{target}` is already running")]
    AlreadyTransitioning { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransitionEvent {
    /// Screen is black; swap the scene and place the player now.
    SwapScene { target: String, spawn_point: String },
    Finished { target: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TransitionPhase {
    Idle,
    FadingOut { elapsed: f32 },
    Loading { elapsed: f32 },
    FadingIn { elapsed: f32 },
}

/// Fade-to-black scene change. The loading phase lasts the minimum loading
/// time plus the black hold.
#[derive(Debug, Clone)]
pub(crate) struct SceneTransition {
    timings: TransitionTimings,
    phase: TransitionPhase,
    target: String,
    next_spawn_point: String,
    alpha: f32,
}

impl Default for SceneTransition {
    fn default() -> Self {
        Self::new(TransitionTimings::default())
    }
}

impl SceneTransition {
    pub(crate) fn new(timings: TransitionTimings) -> Self {
        Self {
            timings,
            phase: TransitionPhase::Idle,
            target: String::new(),
            next_spawn_point: DEFAULT_SPAWN_POINT.to_string(),
            alpha: 0.0,
        }
    }

    pub(crate) fn is_transitioning(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }

    pub(crate) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(crate) fn next_spawn_point(&self) -> &str {
        &self.next_spawn_point
    }

    pub(crate) fn set_next_spawn_point(&mut self, name: impl Into<String>) {
        self.next_spawn_point = name.into();
    }

    pub(crate) fn load_scene(&mut self, target: &str) -> Result<(), TransitionError> {
        if self.is_transitioning() {
            return Err(TransitionError::AlreadyTransitioning {
                target: self.target.clone(),
            });
        }
        self.target = target.to_string();
        self.phase = TransitionPhase::FadingOut { elapsed: 0.0 };
        info!(
            target = %self.target,
            spawn_point = %self.next_spawn_point,
            "scene_transition_started"
        );
        Ok(())
    }

    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32) -> Option<TransitionEvent> {
        match self.phase {
            TransitionPhase::Idle => None,
            TransitionPhase::FadingOut { elapsed } => {
                let elapsed = elapsed + fixed_dt_seconds;
                let t = progress(elapsed, self.timings.fade_out_seconds);
                self.alpha = smoothstep(t);
                if t >= 1.0 {
                    self.alpha = 1.0;
                    self.phase = TransitionPhase::Loading { elapsed: 0.0 };
                    return Some(TransitionEvent::SwapScene {
                        target: self.target.clone(),
                        spawn_point: self.next_spawn_point.clone(),
                    });
                }
                self.phase = TransitionPhase::FadingOut { elapsed };
                None
            }
            TransitionPhase::Loading { elapsed } => {
                let elapsed = elapsed + fixed_dt_seconds;
                let hold =
                    self.timings.minimum_loading_seconds + self.timings.black_hold_seconds;
                self.phase = if elapsed >= hold {
                    TransitionPhase::FadingIn { elapsed: 0.0 }
                } else {
                    TransitionPhase::Loading { elapsed }
                };
                None
            }
            TransitionPhase::FadingIn { elapsed } => {
                let elapsed = elapsed + fixed_dt_seconds;
                let t = progress(elapsed, self.timings.fade_in_seconds);
                self.alpha = 1.0 - smoothstep(t);
                if t < 1.0 {
                    self.phase = TransitionPhase::FadingIn { elapsed };
                    return None;
                }
                self.alpha = 0.0;
                self.phase = TransitionPhase::Idle;
                info!(target = %self.target, "scene_transition_finished");
                Some(TransitionEvent::Finished {
                    target: self.target.clone(),
                })
            }
        }
    }
}

fn progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0)
}

/// Ease-in-out curve on `[0, 1]`.
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}
