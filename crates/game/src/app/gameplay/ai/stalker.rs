use engine::{Pose, StalkerDef, Vec3};
use serde::Serialize;
use tracing::debug;

use super::{AgentTick, MovementCommand, PostureFlags};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StalkerTuning {
    pub(crate) normal_speed: f32,
    pub(crate) retreat_speed: f32,
    pub(crate) attack_range: f32,
    pub(crate) max_repel_distance: f32,
    pub(crate) retreat_distance: f32,
    pub(crate) return_delay: f32,
    pub(crate) retreat_sample_radius: f32,
}

impl From<&StalkerDef> for StalkerTuning {
    fn from(def: &StalkerDef) -> Self {
        Self {
            normal_speed: def.normal_speed,
            retreat_speed: def.retreat_speed,
            attack_range: def.attack_range,
            max_repel_distance: def.max_repel_distance,
            retreat_distance: def.retreat_distance,
            return_delay: def.return_delay,
            retreat_sample_radius: def.retreat_sample_radius,
        }
    }
}

impl Default for StalkerTuning {
    fn default() -> Self {
        Self::from(&StalkerDef::with_defaults("stalker"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum StalkerState {
    Pursuing,
    Retreating,
    Attacking,
}

/// Stalk-type agent. Walks at the target until it is close enough to attack;
/// light from a torch pushes it back to `retreat_distance` for at least
/// `return_delay` seconds.
#[derive(Debug, Clone)]
pub(crate) struct StalkerAgent {
    tuning: StalkerTuning,
    original_pose: Pose,
    state: StalkerState,
    posture: PostureFlags,
    attack_triggers: u32,
    clock_seconds: f32,
    affected: bool,
    last_repel_at: f32,
}

impl StalkerAgent {
    pub(crate) fn new(tuning: StalkerTuning, original_pose: Pose) -> Self {
        Self {
            tuning,
            original_pose,
            state: StalkerState::Pursuing,
            posture: PostureFlags::WALKING,
            attack_triggers: 0,
            clock_seconds: 0.0,
            affected: false,
            last_repel_at: 0.0,
        }
    }

    pub(crate) fn state(&self) -> StalkerState {
        self.state
    }

    pub(crate) fn posture(&self) -> PostureFlags {
        self.posture
    }

    pub(crate) fn attack_triggers(&self) -> u32 {
        self.attack_triggers
    }

    pub(crate) fn is_affected(&self) -> bool {
        self.affected
    }

    pub(crate) fn clock_seconds(&self) -> f32 {
        self.clock_seconds
    }

    pub(crate) fn tick(
        &mut self,
        current: Vec3,
        target: Option<Vec3>,
        fixed_dt_seconds: f32,
    ) -> AgentTick {
        self.clock_seconds += fixed_dt_seconds.max(0.0);
        let Some(target) = target else {
            return AgentTick::hold();
        };

        if self.affected && self.clock_seconds - self.last_repel_at > self.tuning.return_delay {
            self.affected = false;
            debug!(clock = self.clock_seconds, "stalker_stimulus_decayed");
        }

        let distance = current.distance(target);
        let previous = self.state;
        let next = match self.state {
            StalkerState::Pursuing if self.affected => StalkerState::Pursuing,
            StalkerState::Pursuing if distance <= self.tuning.attack_range => {
                StalkerState::Attacking
            }
            StalkerState::Retreating
                if distance >= self.tuning.retreat_distance && !self.affected =>
            {
                StalkerState::Pursuing
            }
            state => state,
        };
        let state_changed = next != previous;
        let mut capture_requested = false;
        if state_changed {
            debug!(from = ?previous, to = ?next, distance, "stalker_state_changed");
            capture_requested = self.enter(next);
        }

        let command = match self.state {
            StalkerState::Pursuing if self.affected => MovementCommand::Hold,
            StalkerState::Pursuing => MovementCommand::MoveTo {
                destination: target,
                speed: self.tuning.normal_speed,
            },
            StalkerState::Retreating => {
                let away = (current - target).normalize_or_zero();
                MovementCommand::MoveToNearestValid {
                    point: target + away * self.tuning.retreat_distance,
                    max_distance: self.tuning.retreat_sample_radius,
                    speed: self.tuning.retreat_speed,
                }
            }
            StalkerState::Attacking if state_changed => MovementCommand::Stop,
            StalkerState::Attacking => MovementCommand::Hold,
        };

        AgentTick {
            command,
            state_changed,
            capture_requested,
        }
    }

    /// Torch stimulus from `source`. Returns whether it took effect.
    pub(crate) fn repel(&mut self, source: Vec3, current: Vec3) -> bool {
        if self.state == StalkerState::Attacking {
            return false;
        }
        if current.distance(source) > self.tuning.max_repel_distance {
            return false;
        }
        self.affected = true;
        self.last_repel_at = self.clock_seconds;
        if self.state != StalkerState::Retreating {
            debug!(clock = self.clock_seconds, "stalker_repelled");
            self.enter(StalkerState::Retreating);
        }
        true
    }

    pub(crate) fn on_aimed(&mut self, aimed: bool) {
        match (aimed, self.state) {
            (true, StalkerState::Pursuing) => {
                self.enter(StalkerState::Retreating);
            }
            (false, StalkerState::Retreating) => {
                self.enter(StalkerState::Pursuing);
            }
            _ => {}
        }
    }

    pub(crate) fn on_capture_blackout(&mut self) -> Pose {
        self.affected = false;
        self.enter(StalkerState::Pursuing);
        self.original_pose
    }

    fn enter(&mut self, next: StalkerState) -> bool {
        self.state = next;
        match next {
            StalkerState::Pursuing => {
                self.posture = PostureFlags::WALKING;
                false
            }
            StalkerState::Retreating => {
                self.posture = PostureFlags::RETREATING;
                false
            }
            StalkerState::Attacking => {
                self.posture = PostureFlags::STILL;
                self.attack_triggers = self.attack_triggers.saturating_add(1);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    fn stalker() -> StalkerAgent {
        StalkerAgent::new(StalkerTuning::default(), Pose::at(Vec3::ZERO))
    }

    #[test]
    fn pursues_target_at_normal_speed() {
        let mut agent = stalker();
        let tick = agent.tick(Vec3::ZERO, Some(Vec3::new(5.0, 0.0, 0.0)), DT);

        assert_eq!(agent.state(), StalkerState::Pursuing);
        assert_eq!(
            tick.command,
            MovementCommand::MoveTo {
                destination: Vec3::new(5.0, 0.0, 0.0),
                speed: 2.5,
            }
        );
    }

    #[test]
    fn close_target_triggers_one_attack() {
        let mut agent = stalker();
        let attack = agent.tick(Vec3::ZERO, Some(Vec3::new(1.0, 0.0, 0.0)), DT);
        assert!(attack.capture_requested);
        assert_eq!(agent.state(), StalkerState::Attacking);

        let again = agent.tick(Vec3::ZERO, Some(Vec3::new(1.0, 0.0, 0.0)), DT);
        assert!(!again.capture_requested);
        assert_eq!(again.command, MovementCommand::Hold);
        assert_eq!(agent.attack_triggers(), 1);
    }

    #[test]
    fn repel_is_ignored_while_attacking_or_out_of_range() {
        let mut agent = stalker();
        assert!(!agent.repel(Vec3::new(11.0, 0.0, 0.0), Vec3::ZERO));
        assert_eq!(agent.state(), StalkerState::Pursuing);

        agent.tick(Vec3::ZERO, Some(Vec3::new(1.0, 0.0, 0.0)), DT);
        assert!(!agent.repel(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO));
        assert_eq!(agent.state(), StalkerState::Attacking);
    }

    #[test]
    fn retreat_targets_point_behind_agent() {
        let mut agent = stalker();
        let target = Vec3::new(2.0, 0.0, 0.0);
        assert!(agent.repel(target, Vec3::ZERO));

        let tick = agent.tick(Vec3::ZERO, Some(target), DT);

        assert_eq!(
            tick.command,
            MovementCommand::MoveToNearestValid {
                point: Vec3::new(-4.0, 0.0, 0.0),
                max_distance: 5.0,
                speed: 4.0,
            }
        );
        assert_eq!(agent.posture(), PostureFlags::RETREATING);
    }

    #[test]
    fn retreat_holds_until_distance_and_decay_both_pass() {
        let mut agent = stalker();
        let target = Vec3::ZERO;
        let far = Vec3::new(7.0, 0.0, 0.0);
        let near = Vec3::new(3.0, 0.0, 0.0);

        agent.tick(near, Some(target), DT);
        assert!(agent.repel(target, near));
        let repelled_at = agent.clock_seconds();

        // Far enough, stimulus still fresh.
        agent.tick(far, Some(target), DT);
        assert_eq!(agent.state(), StalkerState::Retreating);
        assert!(agent.is_affected());

        // Stimulus decays while still too close.
        while agent.clock_seconds() - repelled_at <= 0.5 {
            agent.tick(near, Some(target), DT);
        }
        assert!(!agent.is_affected());
        assert_eq!(agent.state(), StalkerState::Retreating);

        // Both conditions hold.
        let tick = agent.tick(far, Some(target), DT);
        assert_eq!(agent.state(), StalkerState::Pursuing);
        assert!(tick.state_changed);
    }

    #[test]
    fn repeated_repel_refreshes_stimulus() {
        let mut agent = stalker();
        let far = Vec3::new(7.0, 0.0, 0.0);
        agent.repel(Vec3::ZERO, far);
        for _ in 0..20 {
            agent.tick(far, Some(Vec3::ZERO), DT);
            agent.repel(Vec3::ZERO, far);
        }
        assert_eq!(agent.state(), StalkerState::Retreating);
    }

    #[test]
    fn aim_notifications_toggle_retreat() {
        let mut agent = stalker();
        agent.on_aimed(true);
        assert_eq!(agent.state(), StalkerState::Retreating);
        agent.on_aimed(true);
        assert_eq!(agent.state(), StalkerState::Retreating);
        agent.on_aimed(false);
        assert_eq!(agent.state(), StalkerState::Pursuing);
    }

    #[test]
    fn capture_blackout_clears_stimulus_and_resumes_pursuit() {
        let home = Pose {
            position: Vec3::new(-2.0, 0.0, 8.0),
            yaw_radians: 3.0,
        };
        let mut agent = StalkerAgent::new(StalkerTuning::default(), home);
        agent.tick(home.position, Some(home.position), DT);
        assert_eq!(agent.state(), StalkerState::Attacking);

        let pose = agent.on_capture_blackout();

        assert_eq!(pose, home);
        assert_eq!(agent.state(), StalkerState::Pursuing);
        assert!(!agent.is_affected());
    }

    #[test]
    fn affected_pursuer_holds_position() {
        let mut agent = stalker();
        agent.repel(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0));
        agent.on_aimed(false);
        assert_eq!(agent.state(), StalkerState::Pursuing);

        let tick = agent.tick(Vec3::new(3.0, 0.0, 0.0), Some(Vec3::ZERO), DT);

        assert_eq!(tick.command, MovementCommand::Hold);
    }
}
