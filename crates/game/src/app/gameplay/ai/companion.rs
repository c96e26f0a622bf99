use engine::Vec3;
use serde::Serialize;
use tracing::debug;

use super::{AgentTick, MovementCommand, PostureFlags};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CompanionTuning {
    /// Stops walking once this close to the player.
    pub(crate) min_follow_distance: f32,
    /// Beyond this the companion stays put until the player comes back.
    pub(crate) max_follow_distance: f32,
    pub(crate) repath_interval: f32,
    /// Player displacement that forces a new path before the interval runs out.
    pub(crate) repath_distance: f32,
    pub(crate) follow_speed: f32,
}

impl Default for CompanionTuning {
    fn default() -> Self {
        Self {
            min_follow_distance: 2.0,
            max_follow_distance: 4.0,
            repath_interval: 0.2,
            repath_distance: 1.0,
            follow_speed: 3.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum CompanionState {
    Following,
    Crouching,
    WaitingForPlayer,
}

/// Follower that trails the player at a short distance. Ducks under low
/// ceilings reported by the caller and waits when left behind.
#[derive(Debug, Clone)]
pub(crate) struct CompanionAgent {
    tuning: CompanionTuning,
    state: CompanionState,
    posture: PostureFlags,
    low_ceiling: bool,
    since_repath: f32,
    last_target: Option<Vec3>,
}

impl CompanionAgent {
    pub(crate) fn new(tuning: CompanionTuning) -> Self {
        Self {
            tuning,
            state: CompanionState::Following,
            posture: PostureFlags::IDLE,
            low_ceiling: false,
            since_repath: 0.0,
            last_target: None,
        }
    }

    pub(crate) fn state(&self) -> CompanionState {
        self.state
    }

    pub(crate) fn posture(&self) -> PostureFlags {
        self.posture
    }

    pub(crate) fn is_crouching(&self) -> bool {
        self.state == CompanionState::Crouching
    }

    /// Overhead clearance at the companion's position, sampled by the caller
    /// before each tick.
    pub(crate) fn set_low_ceiling(&mut self, low_ceiling: bool) {
        self.low_ceiling = low_ceiling;
    }

    pub(crate) fn tick(&mut self, current: Vec3, target: Option<Vec3>, fixed_dt_seconds: f32) -> AgentTick {
        let Some(target) = target else {
            return AgentTick::hold();
        };
        self.since_repath += fixed_dt_seconds;

        let distance = current.distance(target);
        let previous = self.state;
        let next = self.next_state(distance);
        let state_changed = next != previous;
        if state_changed {
            debug!(from = ?previous, to = ?next, distance, "companion_state_changed");
            self.state = next;
        }

        let command = match self.state {
            CompanionState::WaitingForPlayer => {
                self.posture = PostureFlags::IDLE;
                if state_changed {
                    MovementCommand::Stop
                } else {
                    MovementCommand::Hold
                }
            }
            CompanionState::Following | CompanionState::Crouching => {
                if self.repath_due(target, state_changed) {
                    self.repath(target, distance)
                } else {
                    MovementCommand::Hold
                }
            }
        };

        AgentTick {
            command,
            state_changed,
            capture_requested: false,
        }
    }

    fn next_state(&self, distance: f32) -> CompanionState {
        match self.state {
            CompanionState::Following if distance > self.tuning.max_follow_distance => {
                CompanionState::WaitingForPlayer
            }
            CompanionState::Following if self.low_ceiling => CompanionState::Crouching,
            CompanionState::Crouching if !self.low_ceiling => CompanionState::Following,
            CompanionState::WaitingForPlayer if distance <= self.tuning.max_follow_distance => {
                CompanionState::Following
            }
            state => state,
        }
    }

    fn repath_due(&self, target: Vec3, state_changed: bool) -> bool {
        // Crouched movement follows the player every tick.
        if state_changed || self.state == CompanionState::Crouching {
            return true;
        }
        if self.since_repath >= self.tuning.repath_interval {
            return true;
        }
        self.last_target
            .map_or(true, |last| last.distance(target) > self.tuning.repath_distance)
    }

    fn repath(&mut self, target: Vec3, distance: f32) -> MovementCommand {
        self.since_repath = 0.0;
        self.last_target = Some(target);
        if distance <= self.tuning.min_follow_distance {
            self.posture = PostureFlags::IDLE;
            MovementCommand::Stop
        } else {
            self.posture = PostureFlags::WALKING;
            MovementCommand::MoveTo {
                destination: target,
                speed: self.tuning.follow_speed,
            }
        }
    }
}
