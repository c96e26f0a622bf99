use engine::EntityId;
use serde::Serialize;

use super::effects::{EffectKind, EffectParameters};

pub(crate) const MAX_FUEL: f32 = 100.0;
pub(crate) const FUEL_PER_EXTRA_TORCH: f32 = 50.0;
pub(crate) const MAX_ROCKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub(crate) enum ItemKind {
    Torch,
    Rock,
    Screwdriver,
    Injection,
}

impl ItemKind {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            ItemKind::Torch => "Torch",
            ItemKind::Rock => "Rock",
            ItemKind::Screwdriver => "Screwdriver",
            ItemKind::Injection => "Injection",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Torch" => Some(ItemKind::Torch),
            "Rock" => Some(ItemKind::Rock),
            "Screwdriver" => Some(ItemKind::Screwdriver),
            "Injection" | "Injections" => Some(ItemKind::Injection),
            _ => None,
        }
    }
}

/// Injectable the player carries, waiting to be used through the injection
/// tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct HeldInjectable {
    pub(crate) entity: EntityId,
    pub(crate) effect: EffectKind,
    pub(crate) parameters: EffectParameters,
}

/// Collected items and the charge pools of tools not currently in hand. While
/// a tool is equipped its charge lives on the tool, and the pool is refreshed
/// when it is put away.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct Inventory {
    pub(crate) has_torch: bool,
    pub(crate) fuel: f32,
    pub(crate) has_rock: bool,
    pub(crate) rocks: u32,
    pub(crate) has_screwdriver: bool,
    pub(crate) has_injection: bool,
    pub(crate) held_injectable: Option<HeldInjectable>,
}

impl Inventory {
    pub(crate) fn has(&self, kind: ItemKind) -> bool {
        match kind {
            ItemKind::Torch => self.has_torch,
            ItemKind::Rock => self.has_rock,
            ItemKind::Screwdriver => self.has_screwdriver,
            ItemKind::Injection => self.has_injection,
        }
    }

    /// Pool-side collection, used when the matching tool is not in hand.
    pub(crate) fn collect_into_pool(&mut self, kind: ItemKind) {
        match kind {
            ItemKind::Torch => {
                if self.has_torch {
                    self.fuel = (self.fuel + FUEL_PER_EXTRA_TORCH).min(MAX_FUEL);
                } else {
                    self.has_torch = true;
                    self.fuel = MAX_FUEL;
                }
            }
            ItemKind::Rock => {
                if self.has_rock {
                    self.rocks = self.rocks.saturating_add(1).min(MAX_ROCKS);
                } else {
                    self.has_rock = true;
                    self.rocks = 1;
                }
            }
            ItemKind::Screwdriver => self.has_screwdriver = true,
            ItemKind::Injection => self.has_injection = true,
        }
    }

    /// Stores `incoming` as the held injectable and hands back the one it
    /// replaced. Never refuses.
    pub(crate) fn store_injectable(&mut self, incoming: HeldInjectable) -> Option<HeldInjectable> {
        self.has_injection = true;
        self.held_injectable.replace(incoming)
    }

    pub(crate) fn take_injectable(&mut self) -> Option<HeldInjectable> {
        self.held_injectable.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_torch_fills_later_ones_top_up() {
        let mut inventory = Inventory::default();
        inventory.collect_into_pool(ItemKind::Torch);
        assert!(inventory.has_torch);
        assert_eq!(inventory.fuel, 100.0);

        inventory.fuel = 30.0;
        inventory.collect_into_pool(ItemKind::Torch);
        assert_eq!(inventory.fuel, 80.0);
        inventory.collect_into_pool(ItemKind::Torch);
        assert_eq!(inventory.fuel, 100.0);
    }

    #[test]
    fn rocks_cap_at_five() {
        let mut inventory = Inventory::default();
        for _ in 0..8 {
            inventory.collect_into_pool(ItemKind::Rock);
        }
        assert!(inventory.has_rock);
        assert_eq!(inventory.rocks, MAX_ROCKS);
    }

    #[test]
    fn storing_injectable_always_replaces_held_one() {
        let mut inventory = Inventory::default();
        let first = HeldInjectable {
            entity: EntityId(1),
            effect: EffectKind::SpeedBoost,
            parameters: EffectParameters::default(),
        };
        let second = HeldInjectable {
            entity: EntityId(2),
            effect: EffectKind::JumpBoost,
            parameters: EffectParameters::default(),
        };

        assert_eq!(inventory.store_injectable(first), None);
        assert!(inventory.has_injection);
        assert_eq!(inventory.store_injectable(second), Some(first));
        assert_eq!(inventory.held_injectable, Some(second));
        // Re-storing the same injectable still goes through.
        assert_eq!(inventory.store_injectable(second), Some(second));
    }

    #[test]
    fn item_names_parse_from_layout_labels() {
        assert_eq!(ItemKind::parse("Torch"), Some(ItemKind::Torch));
        assert_eq!(ItemKind::parse(" Injections "), Some(ItemKind::Injection));
        assert_eq!(ItemKind::parse("Lantern"), None);
    }
}
