use engine::{EntityId, InputAction, InputSource, Pose};
use serde::Serialize;
use tracing::{debug, info};

use super::effects::{EffectKind, EffectParameters};
use super::inventory::{
    HeldInjectable, Inventory, ItemKind, FUEL_PER_EXTRA_TORCH, MAX_FUEL, MAX_ROCKS,
};
use super::tools::{Tool, ToolContext, ToolHooks, ToolOutput, TORCH_DRAIN_PER_SECOND};

pub(crate) const TOGGLE_TORCH: InputAction = InputAction::ToggleTorch;
pub(crate) const TOGGLE_SCREWDRIVER: InputAction = InputAction::ToggleScrewdriver;
pub(crate) const TOGGLE_INJECTION: InputAction = InputAction::ToggleInjection;

/// Result of one equip-input pass, for the session to route.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EquipReport {
    pub(crate) outputs: Vec<ToolOutput>,
    pub(crate) injected: Option<HeldInjectable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct EquipSnapshot {
    pub(crate) equipped: Option<ItemKind>,
    pub(crate) torch_lit: bool,
    pub(crate) fuel: f32,
    pub(crate) rocks: u32,
    pub(crate) injectable: Option<EffectKind>,
}

/// Owns the inventory and the single tool in hand.
#[derive(Debug, Clone)]
pub(crate) struct EquipController {
    inventory: Inventory,
    equipped: Option<Tool>,
    torch_drain_rate: f32,
}

impl Default for EquipController {
    fn default() -> Self {
        Self::new(TORCH_DRAIN_PER_SECOND)
    }
}

impl EquipController {
    pub(crate) fn new(torch_drain_rate: f32) -> Self {
        Self {
            inventory: Inventory::default(),
            equipped: None,
            torch_drain_rate,
        }
    }

    pub(crate) fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub(crate) fn equipped(&self) -> Option<&Tool> {
        self.equipped.as_ref()
    }

    pub(crate) fn equipped_kind(&self) -> Option<ItemKind> {
        self.equipped.as_ref().map(Tool::kind)
    }

    /// Fuel including the charge on an equipped torch.
    pub(crate) fn fuel(&self) -> f32 {
        match &self.equipped {
            Some(tool @ Tool::Torch(_)) => tool.charge(),
            _ => self.inventory.fuel,
        }
    }

    /// Rocks including the ones on an equipped rock tool.
    pub(crate) fn rocks(&self) -> u32 {
        match &self.equipped {
            Some(tool @ Tool::Rock(_)) => charge_to_count(tool.charge()),
            _ => self.inventory.rocks,
        }
    }

    pub(crate) fn snapshot(&self) -> EquipSnapshot {
        EquipSnapshot {
            equipped: self.equipped_kind(),
            torch_lit: matches!(&self.equipped, Some(Tool::Torch(torch)) if torch.is_lit()),
            fuel: self.fuel(),
            rocks: self.rocks(),
            injectable: self.inventory.held_injectable.map(|held| held.effect),
        }
    }

    /// Whether a world pickup of `kind` has nowhere to go.
    pub(crate) fn is_full(&self, kind: ItemKind) -> bool {
        match kind {
            ItemKind::Torch => self.inventory.has_torch && self.fuel() >= MAX_FUEL,
            ItemKind::Rock => self.inventory.has_rock && self.rocks() >= MAX_ROCKS,
            ItemKind::Screwdriver | ItemKind::Injection => false,
        }
    }

    /// Adds one item. Torch fuel and rocks top up the tool in hand when it is
    /// the matching kind.
    pub(crate) fn collect(&mut self, kind: ItemKind) {
        let already_owned = self.inventory.has(kind);
        match (&mut self.equipped, kind) {
            (Some(tool @ Tool::Torch(_)), ItemKind::Torch) if already_owned => {
                tool.add_charge(FUEL_PER_EXTRA_TORCH, MAX_FUEL);
            }
            (Some(tool @ Tool::Rock(_)), ItemKind::Rock) if already_owned => {
                tool.add_charge(1.0, MAX_ROCKS as f32);
            }
            _ => self.inventory.collect_into_pool(kind),
        }
        info!(
            item = kind.label(),
            fuel = self.fuel(),
            rocks = self.rocks(),
            "item_collected"
        );
    }

    /// Returns the injectable that was dropped to make room, if any.
    pub(crate) fn store_injectable(
        &mut self,
        incoming: HeldInjectable,
    ) -> Option<HeldInjectable> {
        let dropped = self.inventory.store_injectable(incoming);
        info!(
            entity = incoming.entity.0,
            effect = incoming.effect.label(),
            dropped = ?dropped.map(|held| held.entity.0),
            "injectable_stored"
        );
        dropped
    }

    /// Toggle and use bindings for one tick.
    pub(crate) fn handle_input(&mut self, input: &dyn InputSource, holder: Pose) -> EquipReport {
        let mut cx = ToolContext::new(holder);

        if input.key_pressed(TOGGLE_SCREWDRIVER) {
            self.toggle(ItemKind::Screwdriver, &mut cx);
        }
        if input.key_pressed(TOGGLE_TORCH) {
            self.toggle(ItemKind::Torch, &mut cx);
        }
        if input.key_pressed(InputAction::SecondaryUse)
            && self.inventory.has_rock
            && self.equipped_kind() != Some(ItemKind::Rock)
        {
            self.equip(ItemKind::Rock, &mut cx);
        }
        if input.key_pressed(TOGGLE_INJECTION) {
            self.toggle(ItemKind::Injection, &mut cx);
        }

        self.use_equipped(input, &mut cx);
        self.collapse_depleted(&mut cx);

        let mut report = EquipReport::default();
        for output in cx.outputs {
            if output == ToolOutput::InjectRequested {
                report.injected = self.consume_injectable();
                continue;
            }
            report.outputs.push(output);
        }
        report
    }

    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32) {
        if let Some(tool) = &mut self.equipped {
            tool.tick(fixed_dt_seconds);
        }
    }

    /// Drives the primary hook of the tool in hand outside the input pass.
    pub(crate) fn use_equipped_primary(&mut self, holder: Pose) -> Vec<ToolOutput> {
        let mut cx = ToolContext::new(holder);
        if let Some(tool) = &mut self.equipped {
            tool.on_use(&mut cx);
        }
        cx.outputs
    }

    pub(crate) fn unequip(&mut self, holder: Pose) {
        let mut cx = ToolContext::new(holder);
        self.put_away(&mut cx);
    }

    fn toggle(&mut self, kind: ItemKind, cx: &mut ToolContext) {
        if self.equipped_kind() == Some(kind) {
            self.put_away(cx);
        } else if self.inventory.has(kind) {
            self.equip(kind, cx);
        } else {
            debug!(item = kind.label(), "toggle_without_item");
        }
    }

    fn equip(&mut self, kind: ItemKind, cx: &mut ToolContext) {
        self.put_away(cx);
        let charge_in = match kind {
            ItemKind::Torch => self.inventory.fuel,
            ItemKind::Rock => self.inventory.rocks as f32,
            ItemKind::Screwdriver => 0.0,
            ItemKind::Injection => {
                if self.inventory.held_injectable.is_some() {
                    1.0
                } else {
                    0.0
                }
            }
        };
        let mut tool = Tool::for_kind(kind, self.torch_drain_rate);
        tool.on_equip(charge_in, cx);
        self.equipped = Some(tool);
        info!(item = kind.label(), charge = charge_in, "tool_equipped");
    }

    fn put_away(&mut self, cx: &mut ToolContext) {
        let Some(mut tool) = self.equipped.take() else {
            return;
        };
        let residual = tool.on_unequip(cx);
        match tool.kind() {
            ItemKind::Torch => self.inventory.fuel = residual.max(0.0),
            ItemKind::Rock => self.inventory.rocks = charge_to_count(residual),
            ItemKind::Screwdriver | ItemKind::Injection => {}
        }
        info!(item = tool.kind().label(), residual, "tool_unequipped");
    }

    fn use_equipped(&mut self, input: &dyn InputSource, cx: &mut ToolContext) {
        let Some(tool) = &mut self.equipped else {
            return;
        };
        match tool {
            Tool::Torch(torch) => {
                if torch.charge() <= 0.0 {
                    return;
                }
                if input.is_down(InputAction::PrimaryUse) {
                    torch.on_secondary_use(cx);
                } else {
                    torch.on_use(cx);
                }
            }
            Tool::Rock(rock) => {
                if input.key_pressed(InputAction::SecondaryUse) {
                    rock.on_use(cx);
                }
                if input.key_pressed(InputAction::PrimaryUse)
                    && input.is_down(InputAction::SecondaryUse)
                {
                    rock.throw(cx);
                }
                if input.key_released(InputAction::SecondaryUse) {
                    rock.on_secondary_use(cx);
                }
            }
            Tool::Injection(injection) => {
                if input.key_pressed(InputAction::PrimaryUse) {
                    injection.on_use(cx);
                }
            }
            Tool::Screwdriver(_) => {}
        }
    }

    fn collapse_depleted(&mut self, cx: &mut ToolContext) {
        if !self.equipped.as_ref().is_some_and(Tool::is_depleted) {
            return;
        }
        self.put_away(cx);
        self.inventory.has_rock = false;
        self.inventory.rocks = 0;
        info!("rocks_depleted");
    }

    fn consume_injectable(&mut self) -> Option<HeldInjectable> {
        let Some(held) = self.inventory.take_injectable() else {
            debug!("inject_without_injectable");
            return None;
        };
        info!(
            entity = held.entity.0,
            effect = held.effect.label(),
            "injectable_used"
        );
        Some(held)
    }
}

fn charge_to_count(charge: f32) -> u32 {
    charge.max(0.0).round() as u32
}

/// Default parameters for an injectable authored with only its effect kind.
pub(crate) fn injectable(entity: EntityId, effect: EffectKind) -> HeldInjectable {
    HeldInjectable {
        entity,
        effect,
        parameters: EffectParameters::default(),
    }
}

#[cfg(test)]
mod tests {
    use engine::{InputSnapshot, Vec3};

    use super::*;

    fn holder() -> Pose {
        Pose::at(Vec3::ZERO)
    }

    fn press(action: InputAction) -> InputSnapshot {
        InputSnapshot::empty().with_action_pressed(action)
    }

    #[test]
    fn toggles_need_the_item() {
        let mut controller = EquipController::default();
        controller.handle_input(&press(TOGGLE_TORCH), holder());
        assert_eq!(controller.equipped_kind(), None);

        controller.collect(ItemKind::Torch);
        controller.handle_input(&press(TOGGLE_TORCH), holder());
        assert_eq!(controller.equipped_kind(), Some(ItemKind::Torch));
        controller.handle_input(&press(TOGGLE_TORCH), holder());
        assert_eq!(controller.equipped_kind(), None);
    }

    #[test]
    fn equipping_is_exclusive_and_returns_residual_charge() {
        let mut controller = EquipController::default();
        controller.collect(ItemKind::Torch);
        controller.collect(ItemKind::Screwdriver);

        controller.handle_input(&press(TOGGLE_TORCH), holder());
        for _ in 0..8 {
            controller.tick(0.25);
        }
        controller.handle_input(&press(TOGGLE_SCREWDRIVER), holder());

        assert_eq!(controller.equipped_kind(), Some(ItemKind::Screwdriver));
        assert_eq!(controller.inventory().fuel, 98.0);
    }

    #[test]
    fn torch_pickup_tops_up_equipped_torch() {
        let mut controller = EquipController::default();
        controller.collect(ItemKind::Torch);
        controller.handle_input(&press(TOGGLE_TORCH), holder());
        for _ in 0..240 {
            controller.tick(0.25);
        }
        assert_eq!(controller.fuel(), 40.0);
        assert!(!controller.is_full(ItemKind::Torch));

        controller.collect(ItemKind::Torch);

        assert_eq!(controller.fuel(), 90.0);
        controller.collect(ItemKind::Torch);
        assert!(controller.is_full(ItemKind::Torch));
    }

    #[test]
    fn holding_primary_aims_torch_cone() {
        let mut controller = EquipController::default();
        controller.collect(ItemKind::Torch);
        controller.handle_input(&press(TOGGLE_TORCH), holder());

        let report = controller.handle_input(
            &InputSnapshot::empty().with_action_down(InputAction::PrimaryUse, true),
            holder(),
        );

        assert!(report
            .outputs
            .iter()
            .any(|output| matches!(output, ToolOutput::RepelCone(_))));
    }

    #[test]
    fn right_press_equips_rock_and_throwing_last_rock_removes_it() {
        let mut controller = EquipController::default();
        controller.collect(ItemKind::Rock);
        controller.collect(ItemKind::Torch);
        controller.handle_input(&press(TOGGLE_TORCH), holder());

        controller.handle_input(&press(InputAction::SecondaryUse), holder());
        assert_eq!(controller.equipped_kind(), Some(ItemKind::Rock));
        assert_eq!(controller.rocks(), 1);

        let throw = InputSnapshot::empty()
            .with_action_down(InputAction::SecondaryUse, true)
            .with_action_pressed(InputAction::PrimaryUse);
        let report = controller.handle_input(&throw, holder());

        assert!(report
            .outputs
            .iter()
            .any(|output| matches!(output, ToolOutput::RockThrown { .. })));
        assert_eq!(controller.equipped_kind(), None);
        assert!(!controller.inventory().has_rock);
        assert!(!controller.is_full(ItemKind::Rock));
    }

    #[test]
    fn rocks_fill_up_to_five() {
        let mut controller = EquipController::default();
        for _ in 0..4 {
            controller.collect(ItemKind::Rock);
        }
        assert!(!controller.is_full(ItemKind::Rock));
        controller.collect(ItemKind::Rock);
        assert!(controller.is_full(ItemKind::Rock));
    }

    #[test]
    fn injection_consumes_held_injectable() {
        let mut controller = EquipController::default();
        controller.store_injectable(injectable(EntityId(9), EffectKind::SpeedBoost));
        controller.handle_input(&press(TOGGLE_INJECTION), holder());
        assert_eq!(controller.equipped_kind(), Some(ItemKind::Injection));

        let report = controller.handle_input(&press(InputAction::PrimaryUse), holder());

        let used = report.injected.expect("injectable used");
        assert_eq!(used.entity, EntityId(9));
        assert_eq!(controller.inventory().held_injectable, None);

        let again = controller.handle_input(&press(InputAction::PrimaryUse), holder());
        assert_eq!(again.injected, None);
    }

    #[test]
    fn storing_second_injectable_drops_first() {
        let mut controller = EquipController::default();
        controller.store_injectable(injectable(EntityId(1), EffectKind::SpeedBoost));
        let dropped = controller.store_injectable(injectable(EntityId(2), EffectKind::JumpBoost));

        assert_eq!(dropped.map(|held| held.entity), Some(EntityId(1)));
        assert_eq!(
            controller.snapshot().injectable,
            Some(EffectKind::JumpBoost)
        );
    }
}
