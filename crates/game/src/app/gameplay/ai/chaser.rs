use engine::{ChaserDef, Pose, Vec3};
use serde::Serialize;
use tracing::debug;

use super::{AgentTick, MovementCommand, PostureFlags};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ChaserTuning {
    pub(crate) detection_range: f32,
    pub(crate) activation_range: f32,
    pub(crate) attack_range: f32,
    pub(crate) chase_speed: f32,
    pub(crate) return_speed: f32,
    pub(crate) return_threshold: f32,
    pub(crate) return_home_when_lost: bool,
}

impl From<&ChaserDef> for ChaserTuning {
    fn from(def: &ChaserDef) -> Self {
        Self {
            detection_range: def.detection_range,
            activation_range: def.activation_range,
            attack_range: def.attack_range,
            chase_speed: def.chase_speed,
            return_speed: def.return_speed,
            return_threshold: def.return_threshold,
            return_home_when_lost: def.return_home_when_lost,
        }
    }
}

impl Default for ChaserTuning {
    fn default() -> Self {
        Self::from(&ChaserDef::with_defaults("chaser"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum ChaserState {
    Idle,
    Chase,
    Attack,
    Returning,
}

/// Chase-type agent. Wakes up when the target comes within the activation
/// range, then keeps reacting to the wider detection range for the rest of
/// its life.
#[derive(Debug, Clone)]
pub(crate) struct ChaserAgent {
    tuning: ChaserTuning,
    original_pose: Pose,
    state: ChaserState,
    activated: bool,
    posture: PostureFlags,
    attack_triggers: u32,
}

impl ChaserAgent {
    pub(crate) fn new(tuning: ChaserTuning, original_pose: Pose) -> Self {
        Self {
            tuning,
            original_pose,
            state: ChaserState::Idle,
            activated: false,
            posture: PostureFlags::IDLE,
            attack_triggers: 0,
        }
    }

    pub(crate) fn state(&self) -> ChaserState {
        self.state
    }

    pub(crate) fn is_activated(&self) -> bool {
        self.activated
    }

    pub(crate) fn posture(&self) -> PostureFlags {
        self.posture
    }

    pub(crate) fn attack_triggers(&self) -> u32 {
        self.attack_triggers
    }

    pub(crate) fn original_pose(&self) -> Pose {
        self.original_pose
    }

    pub(crate) fn tuning(&self) -> &ChaserTuning {
        &self.tuning
    }

    /// Evaluates transitions for this tick, then emits the movement command
    /// for the resulting state. A missing target freezes the agent.
    pub(crate) fn tick(
        &mut self,
        current: Vec3,
        target: Option<Vec3>,
        _fixed_dt_seconds: f32,
    ) -> AgentTick {
        let Some(target) = target else {
            return AgentTick::hold();
        };

        let distance = current.distance(target);
        let previous = self.state;
        let next = self.next_state(current, distance);
        let state_changed = next != previous;
        let mut capture_requested = false;
        if state_changed {
            debug!(from = ?previous, to = ?next, distance, "chaser_state_changed");
            capture_requested = self.enter(next);
        }

        let command = match self.state {
            ChaserState::Idle if previous == ChaserState::Returning => {
                MovementCommand::SnapTo(self.original_pose)
            }
            ChaserState::Idle if state_changed => MovementCommand::Stop,
            ChaserState::Idle => MovementCommand::Hold,
            ChaserState::Chase => MovementCommand::MoveTo {
                destination: target,
                speed: self.tuning.chase_speed,
            },
            ChaserState::Attack if state_changed => MovementCommand::Stop,
            ChaserState::Attack => MovementCommand::Hold,
            ChaserState::Returning => MovementCommand::MoveTo {
                destination: self.original_pose.position,
                speed: self.tuning.return_speed,
            },
        };

        AgentTick {
            command,
            state_changed,
            capture_requested,
        }
    }

    /// Sends an activated chaser home. Ignored unless it is chasing.
    pub(crate) fn begin_return(&mut self) -> bool {
        if self.state != ChaserState::Chase {
            return false;
        }
        self.enter(ChaserState::Returning);
        true
    }

    /// Capture callback, invoked once the screen is black. Returns the pose
    /// the agent must be placed at.
    pub(crate) fn on_capture_blackout(&mut self) -> Pose {
        self.enter(ChaserState::Idle);
        self.original_pose
    }

    fn next_state(&mut self, current: Vec3, distance: f32) -> ChaserState {
        let tuning = &self.tuning;
        match self.state {
            ChaserState::Idle => {
                if !self.activated && distance <= tuning.activation_range {
                    self.activated = true;
                    ChaserState::Chase
                } else if self.activated && distance <= tuning.detection_range {
                    ChaserState::Chase
                } else {
                    ChaserState::Idle
                }
            }
            ChaserState::Chase => {
                if distance > tuning.detection_range {
                    if tuning.return_home_when_lost {
                        ChaserState::Returning
                    } else {
                        ChaserState::Idle
                    }
                } else if distance <= tuning.attack_range {
                    ChaserState::Attack
                } else {
                    ChaserState::Chase
                }
            }
            ChaserState::Attack => ChaserState::Attack,
            ChaserState::Returning => {
                if self.activated && distance <= tuning.detection_range {
                    ChaserState::Chase
                } else if current.distance(self.original_pose.position) <= tuning.return_threshold
                {
                    ChaserState::Idle
                } else {
                    ChaserState::Returning
                }
            }
        }
    }

    /// Applies entry side effects. Returns true when a capture must be
    /// requested.
    fn enter(&mut self, next: ChaserState) -> bool {
        self.state = next;
        match next {
            ChaserState::Idle => {
                self.posture = PostureFlags::IDLE;
                false
            }
            ChaserState::Chase => {
                self.posture = PostureFlags::RUNNING;
                false
            }
            ChaserState::Attack => {
                self.posture = PostureFlags::STILL;
                self.attack_triggers = self.attack_triggers.saturating_add(1);
                true
            }
            ChaserState::Returning => {
                self.posture = PostureFlags::WALKING;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_at_origin() -> ChaserAgent {
        ChaserAgent::new(ChaserTuning::default(), Pose::at(Vec3::ZERO))
    }

    fn along_x(distance: f32) -> Option<Vec3> {
        Some(Vec3::new(distance, 0.0, 0.0))
    }

    #[test]
    fn target_beyond_detection_never_triggers_chase() {
        let mut agent = agent_at_origin();
        for _ in 0..100 {
            let tick = agent.tick(Vec3::ZERO, along_x(10.5), 1.0 / 60.0);
            assert_eq!(tick.command, MovementCommand::Hold);
            assert!(!tick.state_changed);
        }
        assert_eq!(agent.state(), ChaserState::Idle);
        assert!(!agent.is_activated());
    }

    #[test]
    fn first_chase_needs_activation_range() {
        let mut agent = agent_at_origin();

        agent.tick(Vec3::ZERO, along_x(8.0), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Idle);

        let tick = agent.tick(Vec3::ZERO, along_x(7.0), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Chase);
        assert!(tick.state_changed);
        assert_eq!(
            tick.command,
            MovementCommand::MoveTo {
                destination: Vec3::new(7.0, 0.0, 0.0),
                speed: 6.0,
            }
        );
        assert_eq!(agent.posture(), PostureFlags::RUNNING);
    }

    #[test]
    fn activation_is_sticky_after_losing_the_target() {
        let mut agent = agent_at_origin();
        agent.tick(Vec3::ZERO, along_x(5.0), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Chase);

        let lost = agent.tick(Vec3::ZERO, along_x(10.5), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Idle);
        assert_eq!(lost.command, MovementCommand::Stop);

        agent.tick(Vec3::ZERO, along_x(9.0), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Chase);
    }

    #[test]
    fn chase_retargets_every_tick() {
        let mut agent = agent_at_origin();
        agent.tick(Vec3::ZERO, along_x(5.0), 1.0 / 60.0);

        let tick = agent.tick(Vec3::ZERO, Some(Vec3::new(0.0, 0.0, 4.0)), 1.0 / 60.0);
        assert!(!tick.state_changed);
        assert_eq!(
            tick.command,
            MovementCommand::MoveTo {
                destination: Vec3::new(0.0, 0.0, 4.0),
                speed: 6.0,
            }
        );
    }

    #[test]
    fn attack_requests_capture_exactly_once() {
        let mut agent = agent_at_origin();
        agent.tick(Vec3::ZERO, along_x(5.0), 1.0 / 60.0);

        let attack = agent.tick(Vec3::ZERO, along_x(1.0), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Attack);
        assert!(attack.capture_requested);
        assert_eq!(attack.command, MovementCommand::Stop);

        for distance in [1.0, 20.0, 0.5] {
            let tick = agent.tick(Vec3::ZERO, along_x(distance), 1.0 / 60.0);
            assert!(!tick.capture_requested);
            assert_eq!(tick.command, MovementCommand::Hold);
        }
        assert_eq!(agent.state(), ChaserState::Attack);
        assert_eq!(agent.attack_triggers(), 1);
    }

    #[test]
    fn capture_blackout_resets_to_idle_at_home() {
        let home = Pose {
            position: Vec3::new(3.0, 0.0, 3.0),
            yaw_radians: 0.5,
        };
        let mut agent = ChaserAgent::new(ChaserTuning::default(), home);
        agent.tick(home.position, Some(Vec3::new(3.0, 0.0, 6.0)), 1.0 / 60.0);
        agent.tick(home.position, Some(Vec3::new(3.0, 0.0, 4.0)), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Attack);

        let pose = agent.on_capture_blackout();

        assert_eq!(pose, home);
        assert_eq!(agent.state(), ChaserState::Idle);
        assert!(agent.is_activated());
        assert_eq!(agent.posture(), PostureFlags::IDLE);
    }

    #[test]
    fn missing_target_freezes_agent() {
        let mut agent = agent_at_origin();
        agent.tick(Vec3::ZERO, along_x(5.0), 1.0 / 60.0);

        let tick = agent.tick(Vec3::ZERO, None, 1.0 / 60.0);

        assert_eq!(tick, AgentTick::hold());
        assert_eq!(agent.state(), ChaserState::Chase);
    }

    #[test]
    fn returning_snaps_home_within_threshold() {
        let home = Pose {
            position: Vec3::ZERO,
            yaw_radians: 1.25,
        };
        let mut agent = ChaserAgent::new(ChaserTuning::default(), home);
        agent.tick(Vec3::ZERO, along_x(5.0), 1.0 / 60.0);
        assert!(agent.begin_return());
        assert_eq!(agent.state(), ChaserState::Returning);

        let walking = agent.tick(Vec3::new(0.0, 0.0, -3.0), along_x(20.0), 1.0 / 60.0);
        assert_eq!(
            walking.command,
            MovementCommand::MoveTo {
                destination: Vec3::ZERO,
                speed: 2.0,
            }
        );
        assert_eq!(agent.posture(), PostureFlags::WALKING);

        let arrived = agent.tick(Vec3::new(0.0, 0.0, -0.4), along_x(20.0), 1.0 / 60.0);
        assert_eq!(agent.state(), ChaserState::Idle);
        assert_eq!(arrived.command, MovementCommand::SnapTo(home));
    }

    #[test]
    fn returning_rechases_when_target_is_detected() {
        let mut agent = agent_at_origin();
        agent.tick(Vec3::ZERO, along_x(5.0), 1.0 / 60.0);
        agent.begin_return();

        agent.tick(Vec3::new(0.0, 0.0, -3.0), Some(Vec3::new(0.0, 0.0, 6.0)), 1.0 / 60.0);

        assert_eq!(agent.state(), ChaserState::Chase);
    }

    #[test]
    fn lost_target_goes_home_when_configured() {
        let tuning = ChaserTuning {
            return_home_when_lost: true,
            ..ChaserTuning::default()
        };
        let mut agent = ChaserAgent::new(tuning, Pose::at(Vec3::ZERO));
        agent.tick(Vec3::ZERO, along_x(5.0), 1.0 / 60.0);

        agent.tick(Vec3::new(4.0, 0.0, 0.0), along_x(15.0), 1.0 / 60.0);

        assert_eq!(agent.state(), ChaserState::Returning);
        assert!(!agent.begin_return());
    }
}
