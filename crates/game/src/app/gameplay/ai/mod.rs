mod chaser;
mod companion;
mod stalker;

use engine::{Pathfinder, Pose, Vec3};
use serde::Serialize;
use tracing::debug;

pub(crate) use chaser::{ChaserAgent, ChaserState, ChaserTuning};
pub(crate) use companion::{CompanionAgent, CompanionState, CompanionTuning};
pub(crate) use stalker::{StalkerAgent, StalkerState, StalkerTuning};

/// What an agent wants its pathfinder to do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MovementCommand {
    /// Leave the pathfinder untouched.
    Hold,
    Stop,
    MoveTo {
        destination: Vec3,
        speed: f32,
    },
    /// Move to the closest walkable point around `point`, if there is one.
    MoveToNearestValid {
        point: Vec3,
        max_distance: f32,
        speed: f32,
    },
    SnapTo(Pose),
}

/// Animation-facing booleans. At most one is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct PostureFlags {
    pub(crate) idle: bool,
    pub(crate) walking: bool,
    pub(crate) running: bool,
    pub(crate) retreating: bool,
}

impl PostureFlags {
    pub(crate) const IDLE: PostureFlags = PostureFlags {
        idle: true,
        walking: false,
        running: false,
        retreating: false,
    };
    pub(crate) const WALKING: PostureFlags = PostureFlags {
        idle: false,
        walking: true,
        running: false,
        retreating: false,
    };
    pub(crate) const RUNNING: PostureFlags = PostureFlags {
        idle: false,
        walking: false,
        running: true,
        retreating: false,
    };
    pub(crate) const RETREATING: PostureFlags = PostureFlags {
        idle: false,
        walking: false,
        running: false,
        retreating: true,
    };
    pub(crate) const STILL: PostureFlags = PostureFlags {
        idle: false,
        walking: false,
        running: false,
        retreating: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AgentTick {
    pub(crate) command: MovementCommand,
    pub(crate) state_changed: bool,
    /// Set on the tick the agent enters its attack state, never again until
    /// the capture callback resets it.
    pub(crate) capture_requested: bool,
}

impl AgentTick {
    pub(crate) const fn hold() -> Self {
        Self {
            command: MovementCommand::Hold,
            state_changed: false,
            capture_requested: false,
        }
    }
}

/// Forwards a command to the pathfinder. A snap is returned so the caller can
/// copy the full pose (heading included) onto the entity.
pub(crate) fn apply_movement_command(
    command: MovementCommand,
    pathfinder: &mut dyn Pathfinder,
) -> Option<Pose> {
    match command {
        MovementCommand::Hold => None,
        MovementCommand::Stop => {
            pathfinder.set_stopped(true);
            pathfinder.clear_destination();
            None
        }
        MovementCommand::MoveTo { destination, speed } => {
            pathfinder.set_speed(speed);
            pathfinder.set_destination(destination);
            pathfinder.set_stopped(false);
            None
        }
        MovementCommand::MoveToNearestValid {
            point,
            max_distance,
            speed,
        } => {
            pathfinder.set_speed(speed);
            pathfinder.set_stopped(false);
            match pathfinder.sample_position(point, max_distance) {
                Some(valid) => pathfinder.set_destination(valid),
                None => debug!(
                    x = point.x,
                    z = point.z,
                    max_distance,
                    "no_valid_point_near_destination"
                ),
            }
            None
        }
        MovementCommand::SnapTo(pose) => {
            pathfinder.warp(pose.position);
            pathfinder.set_stopped(true);
            Some(pose)
        }
    }
}
