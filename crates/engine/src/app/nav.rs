use super::scene::Vec3;

/// Locomotion service an agent steers through. Path solving lives behind this
/// seam; gameplay only sets destinations and speeds and reads positions back.
pub trait Pathfinder {
    fn set_destination(&mut self, point: Vec3);
    fn destination(&self) -> Option<Vec3>;
    fn clear_destination(&mut self);
    fn desired_velocity(&self) -> Vec3;
    fn is_stopped(&self) -> bool;
    fn set_stopped(&mut self, stopped: bool);
    fn speed(&self) -> f32;
    fn set_speed(&mut self, speed: f32);
    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3>;
    fn position(&self) -> Vec3;
    /// Teleports without pathing, e.g. after a capture reset.
    fn warp(&mut self, position: Vec3);
    /// Moves along the desired velocity and returns the new position.
    fn advance(&mut self, fixed_dt_seconds: f32) -> Vec3;
}

/// Axis-aligned walkable area on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl NavBounds {
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.z && point.z <= self.max.z
    }

    pub fn clamp(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y,
            point.z.clamp(self.min.z, self.max.z),
        )
    }
}

pub const DEFAULT_STOPPING_DISTANCE: f32 = 0.05;

/// Reference pathfinder that walks straight at its destination, optionally
/// confined to rectangular bounds.
#[derive(Debug, Clone)]
pub struct StraightLinePathfinder {
    position: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    stopped: bool,
    stopping_distance: f32,
    bounds: Option<NavBounds>,
}

impl StraightLinePathfinder {
    pub fn new(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            destination: None,
            speed: speed.max(0.0),
            stopped: false,
            stopping_distance: DEFAULT_STOPPING_DISTANCE,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: NavBounds) -> Self {
        self.bounds = Some(bounds);
        self.position = bounds.clamp(self.position);
        self
    }

    pub fn with_stopping_distance(mut self, stopping_distance: f32) -> Self {
        self.stopping_distance = stopping_distance.max(0.0);
        self
    }

    pub fn remaining_distance(&self) -> f32 {
        self.destination
            .map_or(0.0, |destination| self.position.distance(destination))
    }
}

impl Pathfinder for StraightLinePathfinder {
    fn set_destination(&mut self, point: Vec3) {
        let point = match self.bounds {
            Some(bounds) => bounds.clamp(point),
            None => point,
        };
        self.destination = Some(point);
    }

    fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    fn clear_destination(&mut self) {
        self.destination = None;
    }

    fn desired_velocity(&self) -> Vec3 {
        if self.stopped {
            return Vec3::ZERO;
        }
        let Some(destination) = self.destination else {
            return Vec3::ZERO;
        };
        let offset = destination - self.position;
        if offset.length() <= self.stopping_distance {
            return Vec3::ZERO;
        }
        offset.normalize_or_zero() * self.speed
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
        let Some(bounds) = self.bounds else {
            return Some(point);
        };
        if bounds.contains(point) {
            return Some(point);
        }
        let clamped = bounds.clamp(point);
        (clamped.distance(point) <= max_distance).then_some(clamped)
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn warp(&mut self, position: Vec3) {
        self.position = position;
        self.destination = None;
    }

    fn advance(&mut self, fixed_dt_seconds: f32) -> Vec3 {
        if self.stopped {
            return self.position;
        }
        let Some(destination) = self.destination else {
            return self.position;
        };
        let (next, _arrived) = step_toward(
            self.position,
            destination,
            self.speed,
            fixed_dt_seconds,
            self.stopping_distance,
        );
        self.position = next;
        self.position
    }
}

/// Moves `current` toward `target` by at most `speed * dt`, snapping when
/// within `arrival_threshold` or when the step would overshoot.
pub fn step_toward(
    current: Vec3,
    target: Vec3,
    speed: f32,
    fixed_dt_seconds: f32,
    arrival_threshold: f32,
) -> (Vec3, bool) {
    let offset = target - current;
    let distance = offset.length();
    if distance <= arrival_threshold {
        return (target, true);
    }

    let max_step = speed * fixed_dt_seconds;
    if max_step >= distance {
        return (target, true);
    }

    (current + offset * (max_step / distance), false)
}
