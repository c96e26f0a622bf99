use std::collections::VecDeque;

use engine::EntityId;
use serde::Serialize;
use tracing::{debug, info};

pub(crate) const DEFAULT_CAPTURE_FADE_SECONDS: f32 = 1.0;
pub(crate) const DEFAULT_CAPTURE_BLACK_HOLD_SECONDS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CaptureSettings {
    pub(crate) fade_seconds: f32,
    pub(crate) black_hold_seconds: f32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            fade_seconds: DEFAULT_CAPTURE_FADE_SECONDS,
            black_hold_seconds: DEFAULT_CAPTURE_BLACK_HOLD_SECONDS,
        }
    }
}

/// The agent that caught the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub(crate) enum AgentRef {
    Chaser(EntityId),
    Stalker(EntityId),
}

/// Full-screen black overlay; 0 is clear, 1 is opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct FadeOverlay {
    alpha: f32,
}

impl FadeOverlay {
    pub(crate) fn alpha(&self) -> f32 {
        self.alpha
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CaptureEvent {
    /// Screen is fully black: reset the agent and respawn the player now.
    Blackout(AgentRef),
    Finished(AgentRef),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CapturePhase {
    Idle,
    FadingOut { agent: AgentRef, elapsed: f32 },
    HoldingBlack { agent: AgentRef, elapsed: f32 },
    FadingIn { agent: AgentRef, elapsed: f32 },
}

/// Plays the caught sequence: fade out, blackout callback, black hold, fade
/// in. Requests arriving mid-sequence wait their turn.
#[derive(Debug)]
pub(crate) struct CaptureCoordinator {
    settings: CaptureSettings,
    phase: CapturePhase,
    queue: VecDeque<AgentRef>,
    overlay: FadeOverlay,
    captures_completed: u32,
}

impl CaptureCoordinator {
    pub(crate) fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            phase: CapturePhase::Idle,
            queue: VecDeque::new(),
            overlay: FadeOverlay::default(),
            captures_completed: 0,
        }
    }

    pub(crate) fn overlay(&self) -> FadeOverlay {
        self.overlay
    }

    pub(crate) fn is_running(&self) -> bool {
        self.phase != CapturePhase::Idle
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn captures_completed(&self) -> u32 {
        self.captures_completed
    }

    pub(crate) fn current_agent(&self) -> Option<AgentRef> {
        match self.phase {
            CapturePhase::Idle => None,
            CapturePhase::FadingOut { agent, .. }
            | CapturePhase::HoldingBlack { agent, .. }
            | CapturePhase::FadingIn { agent, .. } => Some(agent),
        }
    }

    /// Returns false when the agent is already being handled or waiting.
    pub(crate) fn request(&mut self, agent: AgentRef) -> bool {
        if self.current_agent() == Some(agent) || self.queue.contains(&agent) {
            debug!(agent = ?agent, "capture_request_duplicate");
            return false;
        }
        if self.is_running() {
            self.queue.push_back(agent);
            info!(agent = ?agent, queued = self.queue.len(), "capture_queued");
        } else {
            self.begin(agent);
        }
        true
    }

    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32) -> Option<CaptureEvent> {
        let fade = self.settings.fade_seconds;
        match self.phase {
            CapturePhase::Idle => None,
            CapturePhase::FadingOut { agent, elapsed } => {
                let elapsed = elapsed + fixed_dt_seconds;
                if elapsed >= fade {
                    self.overlay.alpha = 1.0;
                    self.phase = CapturePhase::HoldingBlack {
                        agent,
                        elapsed: 0.0,
                    };
                    debug!(agent = ?agent, "capture_blackout");
                    return Some(CaptureEvent::Blackout(agent));
                }
                self.overlay.alpha = fade_progress(elapsed, fade);
                self.phase = CapturePhase::FadingOut { agent, elapsed };
                None
            }
            CapturePhase::HoldingBlack { agent, elapsed } => {
                let elapsed = elapsed + fixed_dt_seconds;
                self.phase = if elapsed >= self.settings.black_hold_seconds {
                    CapturePhase::FadingIn {
                        agent,
                        elapsed: 0.0,
                    }
                } else {
                    CapturePhase::HoldingBlack { agent, elapsed }
                };
                None
            }
            CapturePhase::FadingIn { agent, elapsed } => {
                let elapsed = elapsed + fixed_dt_seconds;
                if elapsed < fade {
                    self.overlay.alpha = 1.0 - fade_progress(elapsed, fade);
                    self.phase = CapturePhase::FadingIn { agent, elapsed };
                    return None;
                }
                self.overlay.alpha = 0.0;
                self.phase = CapturePhase::Idle;
                self.captures_completed = self.captures_completed.saturating_add(1);
                info!(agent = ?agent, total = self.captures_completed, "capture_finished");
                if let Some(next) = self.queue.pop_front() {
                    self.begin(next);
                }
                Some(CaptureEvent::Finished(agent))
            }
        }
    }

    fn begin(&mut self, agent: AgentRef) {
        info!(agent = ?agent, "player_caught");
        self.phase = CapturePhase::FadingOut {
            agent,
            elapsed: 0.0,
        };
    }
}

fn fade_progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0)
}
