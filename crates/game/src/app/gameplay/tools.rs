use engine::{Pose, Vec3};
use tracing::{debug, info};

use super::inventory::{ItemKind, MAX_FUEL};

pub(crate) const TORCH_DRAIN_PER_SECOND: f32 = 1.0;
pub(crate) const TORCH_CONE_RANGE: f32 = 10.0;
pub(crate) const TORCH_CONE_ANGLE_DEGREES: f32 = 45.0;
pub(crate) const SCREWDRIVER_INTERACTION_SECONDS: f32 = 2.0;

/// Charge a screwdriver or injection reports when put away.
const SINGLE_USE_CHARGE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnimationCue {
    Equip(ItemKind),
    HoldTorch,
    AimTorch(bool),
    ThrowRock,
}

/// Light cone in front of the holder; a point is lit when it is within
/// `range` and no more than `half_angle_degrees` off the forward axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RepelCone {
    pub(crate) origin: Vec3,
    pub(crate) forward: Vec3,
    pub(crate) range: f32,
    pub(crate) half_angle_degrees: f32,
}

impl RepelCone {
    pub(crate) fn contains(&self, point: Vec3) -> bool {
        let offset = point - self.origin;
        if offset.length() > self.range {
            return false;
        }
        self.forward.angle_degrees(offset) <= self.half_angle_degrees
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ToolOutput {
    Animation(AnimationCue),
    RepelCone(RepelCone),
    RockThrown { origin: Vec3, direction: Vec3 },
    InjectRequested,
}

/// What a tool hook can see and emit. The caller drains `outputs` after the
/// hook returns.
#[derive(Debug, Clone)]
pub(crate) struct ToolContext {
    pub(crate) holder: Pose,
    pub(crate) outputs: Vec<ToolOutput>,
}

impl ToolContext {
    pub(crate) fn new(holder: Pose) -> Self {
        Self {
            holder,
            outputs: Vec::new(),
        }
    }

    fn emit(&mut self, output: ToolOutput) {
        self.outputs.push(output);
    }
}

pub(crate) trait ToolHooks {
    fn on_equip(&mut self, charge_in: f32, cx: &mut ToolContext);
    /// Returns the charge left on the tool.
    fn on_unequip(&mut self, cx: &mut ToolContext) -> f32;
    fn on_use(&mut self, cx: &mut ToolContext);
    fn on_secondary_use(&mut self, cx: &mut ToolContext);
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Torch {
    charge: f32,
    drain_rate: f32,
    lit: bool,
    aiming: bool,
}

impl Default for Torch {
    fn default() -> Self {
        Self {
            charge: 0.0,
            drain_rate: TORCH_DRAIN_PER_SECOND,
            lit: false,
            aiming: false,
        }
    }
}

impl Torch {
    pub(crate) fn with_drain_rate(drain_rate: f32) -> Self {
        Self {
            drain_rate: drain_rate.max(0.0),
            ..Self::default()
        }
    }

    pub(crate) fn charge(&self) -> f32 {
        self.charge
    }

    pub(crate) fn is_lit(&self) -> bool {
        self.lit
    }

    pub(crate) fn is_aiming(&self) -> bool {
        self.aiming
    }

    fn tick(&mut self, fixed_dt_seconds: f32) {
        if !self.lit {
            return;
        }
        if self.charge > 0.0 {
            self.charge = (self.charge - self.drain_rate * fixed_dt_seconds).max(0.0);
        } else {
            self.lit = false;
            self.aiming = false;
            info!("torch_out_of_charge");
        }
    }
}

impl ToolHooks for Torch {
    fn on_equip(&mut self, charge_in: f32, cx: &mut ToolContext) {
        self.charge = charge_in.clamp(0.0, MAX_FUEL);
        self.lit = true;
        cx.emit(ToolOutput::Animation(AnimationCue::HoldTorch));
    }

    fn on_unequip(&mut self, _cx: &mut ToolContext) -> f32 {
        self.lit = false;
        self.aiming = false;
        self.charge
    }

    fn on_use(&mut self, cx: &mut ToolContext) {
        if self.aiming {
            self.aiming = false;
            cx.emit(ToolOutput::Animation(AnimationCue::AimTorch(false)));
        }
    }

    fn on_secondary_use(&mut self, cx: &mut ToolContext) {
        if !self.aiming {
            self.aiming = true;
            cx.emit(ToolOutput::Animation(AnimationCue::AimTorch(true)));
        }
        cx.emit(ToolOutput::RepelCone(RepelCone {
            origin: cx.holder.position,
            forward: cx.holder.forward(),
            range: TORCH_CONE_RANGE,
            half_angle_degrees: TORCH_CONE_ANGLE_DEGREES / 2.0,
        }));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Rock {
    charge: f32,
    aiming: bool,
}

impl Rock {
    pub(crate) fn is_aiming(&self) -> bool {
        self.aiming
    }

    /// Throws one rock when aiming. Returns whether a rock left the hand.
    pub(crate) fn throw(&mut self, cx: &mut ToolContext) -> bool {
        if !self.aiming {
            return false;
        }
        let direction = cx.holder.forward();
        cx.emit(ToolOutput::RockThrown {
            origin: cx.holder.position + direction,
            direction,
        });
        cx.emit(ToolOutput::Animation(AnimationCue::ThrowRock));
        self.charge = (self.charge - 1.0).max(0.0);
        self.aiming = false;
        info!(remaining = self.charge, "rock_thrown");
        true
    }

    fn is_depleted(&self) -> bool {
        self.charge <= 0.0
    }
}

impl ToolHooks for Rock {
    fn on_equip(&mut self, charge_in: f32, _cx: &mut ToolContext) {
        self.charge = charge_in.max(0.0);
    }

    fn on_unequip(&mut self, _cx: &mut ToolContext) -> f32 {
        self.aiming = false;
        self.charge
    }

    fn on_use(&mut self, _cx: &mut ToolContext) {
        if !self.aiming {
            self.aiming = true;
            debug!("rock_aim_started");
        }
    }

    fn on_secondary_use(&mut self, _cx: &mut ToolContext) {
        if self.aiming {
            self.aiming = false;
            debug!("rock_aim_cancelled");
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Screwdriver {
    elapsed: Option<f32>,
}

impl Screwdriver {
    pub(crate) fn is_working(&self) -> bool {
        self.elapsed.is_some()
    }

    fn tick(&mut self, fixed_dt_seconds: f32) {
        let Some(elapsed) = self.elapsed else {
            return;
        };
        let elapsed = elapsed + fixed_dt_seconds;
        if elapsed >= SCREWDRIVER_INTERACTION_SECONDS {
            self.elapsed = None;
            debug!("screwdriver_interaction_completed");
        } else {
            self.elapsed = Some(elapsed);
        }
    }
}

impl ToolHooks for Screwdriver {
    fn on_equip(&mut self, _charge_in: f32, _cx: &mut ToolContext) {}

    fn on_unequip(&mut self, _cx: &mut ToolContext) -> f32 {
        self.elapsed = None;
        SINGLE_USE_CHARGE
    }

    fn on_use(&mut self, _cx: &mut ToolContext) {
        self.elapsed = Some(0.0);
    }

    fn on_secondary_use(&mut self, _cx: &mut ToolContext) {}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Injection {
    showing: bool,
}

impl Injection {
    pub(crate) fn is_showing(&self) -> bool {
        self.showing
    }
}

impl ToolHooks for Injection {
    fn on_equip(&mut self, charge_in: f32, _cx: &mut ToolContext) {
        self.showing = charge_in > 0.0;
    }

    fn on_unequip(&mut self, _cx: &mut ToolContext) -> f32 {
        self.showing = false;
        SINGLE_USE_CHARGE
    }

    fn on_use(&mut self, cx: &mut ToolContext) {
        cx.emit(ToolOutput::InjectRequested);
        self.showing = false;
    }

    fn on_secondary_use(&mut self, _cx: &mut ToolContext) {}
}

/// The one tool in the player's hand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tool {
    Torch(Torch),
    Rock(Rock),
    Screwdriver(Screwdriver),
    Injection(Injection),
}

impl Tool {
    pub(crate) fn for_kind(kind: ItemKind, torch_drain_rate: f32) -> Self {
        match kind {
            ItemKind::Torch => Tool::Torch(Torch::with_drain_rate(torch_drain_rate)),
            ItemKind::Rock => Tool::Rock(Rock::default()),
            ItemKind::Screwdriver => Tool::Screwdriver(Screwdriver::default()),
            ItemKind::Injection => Tool::Injection(Injection::default()),
        }
    }

    pub(crate) fn kind(&self) -> ItemKind {
        match self {
            Tool::Torch(_) => ItemKind::Torch,
            Tool::Rock(_) => ItemKind::Rock,
            Tool::Screwdriver(_) => ItemKind::Screwdriver,
            Tool::Injection(_) => ItemKind::Injection,
        }
    }

    /// Charge held on the tool right now; screwdriver and injection carry
    /// none.
    pub(crate) fn charge(&self) -> f32 {
        match self {
            Tool::Torch(torch) => torch.charge,
            Tool::Rock(rock) => rock.charge,
            Tool::Screwdriver(_) | Tool::Injection(_) => 0.0,
        }
    }

    pub(crate) fn add_charge(&mut self, amount: f32, cap: f32) {
        match self {
            Tool::Torch(torch) => torch.charge = (torch.charge + amount).min(cap),
            Tool::Rock(rock) => rock.charge = (rock.charge + amount).min(cap),
            Tool::Screwdriver(_) | Tool::Injection(_) => {}
        }
    }

    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32) {
        match self {
            Tool::Torch(torch) => torch.tick(fixed_dt_seconds),
            Tool::Screwdriver(screwdriver) => screwdriver.tick(fixed_dt_seconds),
            Tool::Rock(_) | Tool::Injection(_) => {}
        }
    }

    pub(crate) fn is_depleted(&self) -> bool {
        matches!(self, Tool::Rock(rock) if rock.is_depleted())
    }
}

impl ToolHooks for Tool {
    fn on_equip(&mut self, charge_in: f32, cx: &mut ToolContext) {
        cx.emit(ToolOutput::Animation(AnimationCue::Equip(self.kind())));
        match self {
            Tool::Torch(torch) => torch.on_equip(charge_in, cx),
            Tool::Rock(rock) => rock.on_equip(charge_in, cx),
            Tool::Screwdriver(screwdriver) => screwdriver.on_equip(charge_in, cx),
            Tool::Injection(injection) => injection.on_equip(charge_in, cx),
        }
    }

    fn on_unequip(&mut self, cx: &mut ToolContext) -> f32 {
        match self {
            Tool::Torch(torch) => torch.on_unequip(cx),
            Tool::Rock(rock) => rock.on_unequip(cx),
            Tool::Screwdriver(screwdriver) => screwdriver.on_unequip(cx),
            Tool::Injection(injection) => injection.on_unequip(cx),
        }
    }

    fn on_use(&mut self, cx: &mut ToolContext) {
        match self {
            Tool::Torch(torch) => torch.on_use(cx),
            Tool::Rock(rock) => rock.on_use(cx),
            Tool::Screwdriver(screwdriver) => screwdriver.on_use(cx),
            Tool::Injection(injection) => injection.on_use(cx),
        }
    }

    fn on_secondary_use(&mut self, cx: &mut ToolContext) {
        match self {
            Tool::Torch(torch) => torch.on_secondary_use(cx),
            Tool::Rock(rock) => rock.on_secondary_use(cx),
            Tool::Screwdriver(screwdriver) => screwdriver.on_secondary_use(cx),
            Tool::Injection(injection) => injection.on_secondary_use(cx),
        }
    }
}
