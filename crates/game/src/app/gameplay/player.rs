use engine::{InputAction, InputSource, Pose, Vec3};

pub(crate) const PLAYER_BASE_SPEED: f32 = 5.0;
pub(crate) const PLAYER_SPRINT_SPEED: f32 = 7.0;
pub(crate) const PLAYER_CROUCH_SPEED: f32 = 3.0;

/// Directional movement on the ground plane. World +z is forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlayerController {
    pub(crate) speed: f32,
    pub(crate) sprint_speed: f32,
    pub(crate) crouch_speed: f32,
}

impl Default for PlayerController {
    fn default() -> Self {
        Self {
            speed: PLAYER_BASE_SPEED,
            sprint_speed: PLAYER_SPRINT_SPEED,
            crouch_speed: PLAYER_CROUCH_SPEED,
        }
    }
}

impl PlayerController {
    /// Sprint wins over crouch when both are held.
    pub(crate) fn current_speed(&self, input: &dyn InputSource) -> f32 {
        if input.is_down(InputAction::Sprint) {
            self.sprint_speed
        } else if input.is_down(InputAction::Crouch) {
            self.crouch_speed
        } else {
            self.speed
        }
    }

    /// Moves `pose` for one tick and turns it toward the direction of travel.
    /// Returns the displacement applied.
    pub(crate) fn tick(
        &self,
        input: &dyn InputSource,
        pose: &mut Pose,
        speed_multiplier: f32,
        fixed_dt_seconds: f32,
    ) -> Vec3 {
        let direction = movement_direction(input);
        if direction == Vec3::ZERO {
            return Vec3::ZERO;
        }
        let speed = self.current_speed(input);
        let displacement = direction * (speed * speed_multiplier * fixed_dt_seconds);
        pose.position += displacement;
        pose.face_toward(direction);
        displacement
    }
}

fn movement_direction(input: &dyn InputSource) -> Vec3 {
    let axis = |positive: InputAction, negative: InputAction| -> f32 {
        let mut value = 0.0;
        if input.is_down(positive) {
            value += 1.0;
        }
        if input.is_down(negative) {
            value -= 1.0;
        }
        value
    };
    let x = axis(InputAction::MoveRight, InputAction::MoveLeft);
    let z = axis(InputAction::MoveForward, InputAction::MoveBack);
    Vec3::new(x, 0.0, z).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use engine::InputSnapshot;

    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn forward_moves_by_speed_times_dt() {
        let controller = PlayerController::default();
        let mut pose = Pose::default();
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveForward, true);

        controller.tick(&input, &mut pose, 1.0, 0.5);

        assert_close(pose.position.z, 2.5);
        assert_close(pose.position.x, 0.0);
    }

    #[test]
    fn diagonal_input_is_normalised_and_boost_applies() {
        let controller = PlayerController::default();
        let mut pose = Pose::default();
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveForward, true)
            .with_action_down(InputAction::MoveRight, true);

        let moved = controller.tick(&input, &mut pose, 2.0, 0.1);

        assert_close(moved.length(), 1.0);
        assert_close(pose.yaw_radians, std::f32::consts::FRAC_PI_4);
    }

    #[test]
    fn sprint_and_crouch_pick_the_speed() {
        let controller = PlayerController::default();
        let forward = InputSnapshot::empty().with_action_down(InputAction::MoveForward, true);

        let mut pose = Pose::default();
        controller.tick(
            &forward.with_action_down(InputAction::Sprint, true),
            &mut pose,
            1.0,
            1.0,
        );
        assert_close(pose.position.z, 7.0);

        let mut pose = Pose::default();
        controller.tick(
            &forward.with_action_down(InputAction::Crouch, true),
            &mut pose,
            2.0,
            1.0,
        );
        assert_close(pose.position.z, 6.0);

        let both = forward
            .with_action_down(InputAction::Crouch, true)
            .with_action_down(InputAction::Sprint, true);
        assert_close(controller.current_speed(&both), PLAYER_SPRINT_SPEED);
    }

    #[test]
    fn opposing_keys_cancel() {
        let controller = PlayerController::default();
        let mut pose = Pose::default();
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::MoveRight, true);

        assert_eq!(controller.tick(&input, &mut pose, 1.0, 0.1), Vec3::ZERO);
        assert_eq!(pose, Pose::default());
    }
}
