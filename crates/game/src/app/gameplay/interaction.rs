use engine::{
    EntityId, InputAction, InputSource, MarkerKind, Pose, SceneWorld, Signal, SignalBus, Vec3,
};
use tracing::{debug, info, warn};

use super::effects::EffectKind;
use super::equip::{injectable, EquipController};
use super::inventory::ItemKind;

pub(crate) const INTERACT_ACTION: InputAction = InputAction::Interact;
pub(crate) const DETECTION_RADIUS: f32 = 3.0;
pub(crate) const DEFAULT_INTERACTION_RANGE: f32 = 2.0;
pub(crate) const STAIR_THRESHOLD: f32 = 0.5;
pub(crate) const UNLOCK_SECONDS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LockState {
    Locked,
    Unlocking { elapsed: f32 },
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum InteractableKind {
    WorldPickup(ItemKind),
    Stair { top: Vec3, bottom: Vec3 },
    Lockable(LockState),
    Injectable(EffectKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Interactable {
    entity: EntityId,
    kind: InteractableKind,
    range: f32,
}

/// What the player is currently looking at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InteractionFocus {
    pub(crate) entity: EntityId,
    pub(crate) prompt: String,
    pub(crate) can_interact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum InteractionOutcome {
    Signalled,
    Collected(ItemKind),
    CollectRefused(ItemKind),
    Teleported(Vec3),
    UnlockStarted,
    InjectableStored { dropped: Option<EntityId> },
}

pub(crate) struct InteractionContext<'a> {
    pub(crate) world: &'a mut SceneWorld,
    pub(crate) signals: &'a mut SignalBus,
    pub(crate) equip: &'a mut EquipController,
    pub(crate) player: &'a mut Pose,
}

/// Closest-in-range interaction detector. Considers registered interactables
/// and any entity carrying a sequencer marker.
#[derive(Debug, Clone, Default)]
pub(crate) struct InteractionSystem {
    interactables: Vec<Interactable>,
    focus: Option<InteractionFocus>,
    interactions_total: u32,
}

impl InteractionSystem {
    pub(crate) fn register(&mut self, entity: EntityId, kind: InteractableKind) {
        self.register_with_range(entity, kind, DEFAULT_INTERACTION_RANGE);
    }

    pub(crate) fn register_with_range(&mut self, entity: EntityId, kind: InteractableKind, range: f32) {
        self.interactables.retain(|existing| existing.entity != entity);
        self.interactables.push(Interactable {
            entity,
            kind,
            range: range.max(0.0),
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.interactables.len()
    }

    pub(crate) fn focus(&self) -> Option<&InteractionFocus> {
        self.focus.as_ref()
    }

    pub(crate) fn interactions_total(&self) -> u32 {
        self.interactions_total
    }

    pub(crate) fn lock_state(&self, entity: EntityId) -> Option<LockState> {
        self.interactables
            .iter()
            .find(|interactable| interactable.entity == entity)
            .and_then(|interactable| match interactable.kind {
                InteractableKind::Lockable(state) => Some(state),
                _ => None,
            })
    }

    pub(crate) fn tick(
        &mut self,
        fixed_dt_seconds: f32,
        input: &dyn InputSource,
        cx: &mut InteractionContext<'_>,
    ) -> Option<InteractionOutcome> {
        self.advance_unlocks(fixed_dt_seconds, cx);
        self.focus = self.detect(cx.player.position, cx.world, cx.equip);

        let focus = self.focus.as_ref()?;
        if !focus.can_interact || !input.key_pressed(INTERACT_ACTION) {
            return None;
        }
        let entity = focus.entity;
        let outcome = self.interact(entity, cx);
        self.interactions_total = self.interactions_total.saturating_add(1);
        Some(outcome)
    }

    fn detect(
        &self,
        player: Vec3,
        world: &SceneWorld,
        equip: &EquipController,
    ) -> Option<InteractionFocus> {
        let mut closest: Option<(f32, InteractionFocus)> = None;
        for entity in world.entities() {
            if !entity.active || world.is_pending_despawn(entity.id) {
                continue;
            }
            let registered = self.find(entity.id);
            if registered.is_none() && entity.markers().is_empty() {
                continue;
            }
            let range = registered
                .map_or(DEFAULT_INTERACTION_RANGE, |interactable| interactable.range)
                .min(DETECTION_RADIUS);
            let distance = entity.pose.position.distance(player);
            if distance > range {
                continue;
            }
            if closest
                .as_ref()
                .is_some_and(|(best, _)| *best <= distance)
            {
                continue;
            }
            let Some(focus) = focus_for(entity.id, registered, world, equip) else {
                continue;
            };
            closest = Some((distance, focus));
        }
        closest.map(|(_, focus)| focus)
    }

    fn interact(&mut self, entity: EntityId, cx: &mut InteractionContext<'_>) -> InteractionOutcome {
        let has_pickup_marker = cx.world.has_marker(entity, MarkerKind::Pickup);
        let has_interaction_marker = cx.world.has_marker(entity, MarkerKind::Interaction);
        let has_stair_marker = cx.world.has_marker(entity, MarkerKind::Stair);
        let registered = self.find(entity).copied();
        debug!(entity = entity.0, kind = ?registered.map(|interactable| interactable.kind), "interact");

        if has_interaction_marker {
            cx.signals.emit(Signal::Interacted { entity });
        }

        let outcome = match registered.map(|interactable| interactable.kind) {
            Some(InteractableKind::WorldPickup(item)) => {
                if cx.equip.is_full(item) {
                    info!(item = item.label(), "pickup_refused_full");
                    return InteractionOutcome::CollectRefused(item);
                }
                cx.equip.collect(item);
                cx.signals.emit(Signal::PickedUp { entity });
                cx.world.despawn(entity);
                InteractionOutcome::Collected(item)
            }
            Some(InteractableKind::Stair { top, bottom }) => {
                cx.signals.emit(Signal::StairUsed { entity });
                let destination = stair_destination(cx.player.position, top, bottom);
                cx.player.position = destination;
                info!(
                    entity = entity.0,
                    x = destination.x,
                    y = destination.y,
                    z = destination.z,
                    "player_teleported"
                );
                InteractionOutcome::Teleported(destination)
            }
            Some(InteractableKind::Lockable(LockState::Locked)) => {
                cx.equip.use_equipped_primary(*cx.player);
                self.set_lock_state(entity, LockState::Unlocking { elapsed: 0.0 });
                info!(entity = entity.0, "unlock_started");
                InteractionOutcome::UnlockStarted
            }
            Some(InteractableKind::Lockable(_)) => InteractionOutcome::Signalled,
            Some(InteractableKind::Injectable(effect)) => {
                cx.equip.collect(ItemKind::Injection);
                let dropped = cx.equip.store_injectable(injectable(entity, effect));
                cx.world.set_active(entity, false);
                if let Some(dropped) = dropped {
                    let mut pose = *cx.player;
                    pose.position = pose.position + pose.forward();
                    cx.world.set_pose(dropped.entity, pose);
                    cx.world.set_active(dropped.entity, true);
                }
                InteractionOutcome::InjectableStored {
                    dropped: dropped.map(|held| held.entity),
                }
            }
            None => {
                if has_stair_marker {
                    cx.signals.emit(Signal::StairUsed { entity });
                }
                InteractionOutcome::Signalled
            }
        };

        if has_pickup_marker && !matches!(outcome, InteractionOutcome::Collected(_)) {
            cx.signals.emit(Signal::PickedUp { entity });
            cx.world.despawn(entity);
        }
        outcome
    }

    fn advance_unlocks(&mut self, fixed_dt_seconds: f32, cx: &mut InteractionContext<'_>) {
        let screwdriver_in_hand = cx.equip.equipped_kind() == Some(ItemKind::Screwdriver);
        for interactable in &mut self.interactables {
            let InteractableKind::Lockable(LockState::Unlocking { elapsed }) = interactable.kind
            else {
                continue;
            };
            if !screwdriver_in_hand {
                interactable.kind = InteractableKind::Lockable(LockState::Locked);
                info!(entity = interactable.entity.0, "unlock_aborted");
                continue;
            }
            let elapsed = elapsed + fixed_dt_seconds;
            if elapsed < UNLOCK_SECONDS {
                interactable.kind = InteractableKind::Lockable(LockState::Unlocking { elapsed });
                continue;
            }
            interactable.kind = InteractableKind::Lockable(LockState::Unlocked);
            if !cx.world.set_active(interactable.entity, false) {
                warn!(entity = interactable.entity.0, "unlocked_passage_missing");
            }
            info!(entity = interactable.entity.0, "passage_unlocked");
        }
    }

    fn find(&self, entity: EntityId) -> Option<&Interactable> {
        self.interactables
            .iter()
            .find(|interactable| interactable.entity == entity)
    }

    fn set_lock_state(&mut self, entity: EntityId, state: LockState) {
        if let Some(interactable) = self
            .interactables
            .iter_mut()
            .find(|interactable| interactable.entity == entity)
        {
            interactable.kind = InteractableKind::Lockable(state);
        }
    }
}

fn focus_for(
    entity: EntityId,
    registered: Option<&Interactable>,
    world: &SceneWorld,
    equip: &EquipController,
) -> Option<InteractionFocus> {
    let (prompt, can_interact) = match registered.map(|interactable| interactable.kind) {
        Some(InteractableKind::WorldPickup(item)) => {
            (format!("Press E to pick up {}", item.label()), true)
        }
        Some(InteractableKind::Stair { .. }) => ("Press E to use the stairs".to_string(), true),
        Some(InteractableKind::Lockable(LockState::Unlocked)) => return None,
        Some(InteractableKind::Lockable(state)) => {
            let screwdriver_in_hand = equip.equipped_kind() == Some(ItemKind::Screwdriver);
            let prompt = if !equip.inventory().has_screwdriver {
                "Locked, need something to open"
            } else if !screwdriver_in_hand {
                "Equip screwdriver to unlock"
            } else {
                "Press E to unlock"
            };
            (
                prompt.to_string(),
                screwdriver_in_hand && state == LockState::Locked,
            )
        }
        Some(InteractableKind::Injectable(effect)) => (
            format!("Press E to collect {} injectable", effect.label()),
            true,
        ),
        None => {
            let prompt = if world.has_marker(entity, MarkerKind::Pickup) {
                "Press E to pickup"
            } else if world.has_marker(entity, MarkerKind::Stair) {
                "Press E to use the stairs"
            } else {
                "Press E to interact"
            };
            (prompt.to_string(), true)
        }
    };
    Some(InteractionFocus {
        entity,
        prompt,
        can_interact,
    })
}

/// Sends the player to the far end of the stair.
pub(crate) fn stair_destination(player: Vec3, top: Vec3, bottom: Vec3) -> Vec3 {
    let to_top = player.distance(top);
    let to_bottom = player.distance(bottom);
    if to_top > to_bottom - STAIR_THRESHOLD {
        top
    } else {
        bottom
    }
}

#[cfg(test)]
mod tests {
    use engine::{InputSnapshot, SignalKind};

    use super::*;

    struct Fixture {
        world: SceneWorld,
        signals: SignalBus,
        equip: EquipController,
        player: Pose,
        system: InteractionSystem,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: SceneWorld::default(),
                signals: SignalBus::default(),
                equip: EquipController::default(),
                player: Pose::at(Vec3::ZERO),
                system: InteractionSystem::default(),
            }
        }

        fn spawn(&mut self, name: &str, position: Vec3) -> EntityId {
            let id = self.world.spawn(name, Pose::at(position));
            self.world.apply_pending();
            id
        }

        fn tick(&mut self, input: &InputSnapshot) -> Option<InteractionOutcome> {
            let mut cx = InteractionContext {
                world: &mut self.world,
                signals: &mut self.signals,
                equip: &mut self.equip,
                player: &mut self.player,
            };
            let outcome = self.system.tick(0.25, input, &mut cx);
            self.world.apply_pending();
            outcome
        }
    }

    fn press_e() -> InputSnapshot {
        InputSnapshot::empty().with_action_pressed(INTERACT_ACTION)
    }

    #[test]
    fn closest_interactable_in_range_wins() {
        let mut fixture = Fixture::new();
        let far = fixture.spawn("torch_far", Vec3::new(1.8, 0.0, 0.0));
        let near = fixture.spawn("rock_near", Vec3::new(0.0, 0.0, 1.0));
        let out_of_range = fixture.spawn("torch_out", Vec3::new(0.0, 0.0, -2.5));
        fixture
            .system
            .register(far, InteractableKind::WorldPickup(ItemKind::Torch));
        fixture
            .system
            .register(near, InteractableKind::WorldPickup(ItemKind::Rock));
        fixture
            .system
            .register(out_of_range, InteractableKind::WorldPickup(ItemKind::Torch));

        fixture.tick(&InputSnapshot::empty());

        let focus = fixture.system.focus().expect("focus");
        assert_eq!(focus.entity, near);
        assert_eq!(focus.prompt, "Press E to pick up Rock");
    }

    #[test]
    fn world_pickup_collects_emits_and_despawns() {
        let mut fixture = Fixture::new();
        let sub = fixture.signals.subscribe(&[SignalKind::PickedUp]);
        let torch = fixture.spawn("torch", Vec3::new(1.0, 0.0, 0.0));
        fixture
            .system
            .register(torch, InteractableKind::WorldPickup(ItemKind::Torch));

        let outcome = fixture.tick(&press_e());

        assert_eq!(outcome, Some(InteractionOutcome::Collected(ItemKind::Torch)));
        assert!(fixture.equip.inventory().has_torch);
        assert!(fixture.world.find_entity(torch).is_none());
        assert_eq!(
            fixture.signals.drain(&sub),
            vec![Signal::PickedUp { entity: torch }]
        );
    }

    #[test]
    fn full_pool_refuses_pickup_and_keeps_item() {
        let mut fixture = Fixture::new();
        fixture.equip.collect(ItemKind::Torch);
        let torch = fixture.spawn("torch", Vec3::new(1.0, 0.0, 0.0));
        fixture
            .system
            .register(torch, InteractableKind::WorldPickup(ItemKind::Torch));

        let outcome = fixture.tick(&press_e());

        assert_eq!(outcome, Some(InteractionOutcome::CollectRefused(ItemKind::Torch)));
        assert!(fixture.world.find_entity(torch).is_some());
    }

    #[test]
    fn marker_entities_emit_matching_signals() {
        let mut fixture = Fixture::new();
        let sub = fixture
            .signals
            .subscribe(&[SignalKind::Interacted, SignalKind::PickedUp]);
        let lever = fixture.spawn("lever", Vec3::new(1.0, 0.0, 0.0));
        fixture.world.attach_marker(lever, MarkerKind::Interaction);

        fixture.tick(&InputSnapshot::empty());
        assert_eq!(
            fixture.system.focus().map(|focus| focus.prompt.as_str()),
            Some("Press E to interact")
        );
        fixture.tick(&press_e());
        assert_eq!(
            fixture.signals.drain(&sub),
            vec![Signal::Interacted { entity: lever }]
        );
        assert!(fixture.world.find_entity(lever).is_some());

        let note = fixture.spawn("note", Vec3::new(0.5, 0.0, 0.0));
        fixture.world.attach_marker(note, MarkerKind::Pickup);
        fixture.tick(&press_e());
        assert_eq!(
            fixture.signals.drain(&sub),
            vec![Signal::PickedUp { entity: note }]
        );
        assert!(fixture.world.find_entity(note).is_none());
    }

    #[test]
    fn stair_teleports_to_far_end() {
        let mut fixture = Fixture::new();
        let sub = fixture.signals.subscribe(&[SignalKind::StairUsed]);
        let top = Vec3::new(0.0, 4.0, 6.0);
        let bottom = Vec3::new(0.0, 0.0, 1.0);
        let stair = fixture.spawn("stair", Vec3::new(0.0, 0.0, 1.5));
        fixture
            .system
            .register(stair, InteractableKind::Stair { top, bottom });

        assert_eq!(fixture.tick(&press_e()), Some(InteractionOutcome::Teleported(top)));
        assert_eq!(fixture.player.position, top);
        assert_eq!(fixture.signals.drain(&sub).len(), 1);

        assert_eq!(stair_destination(top, top, bottom), bottom);
    }

    #[test]
    fn lockable_needs_screwdriver_in_hand() {
        let mut fixture = Fixture::new();
        let door = fixture.spawn("door", Vec3::new(1.0, 0.0, 0.0));
        fixture
            .system
            .register(door, InteractableKind::Lockable(LockState::Locked));

        assert_eq!(fixture.tick(&press_e()), None);
        assert_eq!(
            fixture.system.focus().map(|focus| focus.prompt.as_str()),
            Some("Locked, need something to open")
        );

        fixture.equip.collect(ItemKind::Screwdriver);
        fixture.tick(&InputSnapshot::empty());
        assert_eq!(
            fixture.system.focus().map(|focus| focus.prompt.as_str()),
            Some("Equip screwdriver to unlock")
        );

        fixture.equip.handle_input(
            &InputSnapshot::empty().with_action_pressed(InputAction::ToggleScrewdriver),
            fixture.player,
        );
        assert_eq!(fixture.tick(&press_e()), Some(InteractionOutcome::UnlockStarted));
        for _ in 0..12 {
            fixture.tick(&InputSnapshot::empty());
        }

        assert_eq!(fixture.system.lock_state(door), Some(LockState::Unlocked));
        assert!(!fixture.world.is_active(door));
    }

    #[test]
    fn unequipping_screwdriver_aborts_unlock() {
        let mut fixture = Fixture::new();
        let door = fixture.spawn("door", Vec3::new(1.0, 0.0, 0.0));
        fixture
            .system
            .register(door, InteractableKind::Lockable(LockState::Locked));
        fixture.equip.collect(ItemKind::Screwdriver);
        fixture.equip.handle_input(
            &InputSnapshot::empty().with_action_pressed(InputAction::ToggleScrewdriver),
            fixture.player,
        );
        fixture.tick(&press_e());
        fixture.tick(&InputSnapshot::empty());

        fixture.equip.unequip(fixture.player);
        fixture.tick(&InputSnapshot::empty());

        assert_eq!(fixture.system.lock_state(door), Some(LockState::Locked));
        assert!(fixture.world.is_active(door));
    }

    #[test]
    fn collecting_second_injectable_drops_first_nearby() {
        let mut fixture = Fixture::new();
        let speed = fixture.spawn("speed", Vec3::new(1.0, 0.0, 0.0));
        let jump = fixture.spawn("jump", Vec3::new(-1.0, 0.0, 0.0));
        fixture
            .system
            .register(speed, InteractableKind::Injectable(EffectKind::SpeedBoost));
        fixture
            .system
            .register(jump, InteractableKind::Injectable(EffectKind::JumpBoost));

        fixture.tick(&press_e());
        assert!(!fixture.world.is_active(speed));
        fixture.tick(&InputSnapshot::empty());
        assert_eq!(
            fixture.system.focus().map(|focus| focus.prompt.as_str()),
            Some("Press E to collect JumpBoost injectable")
        );

        let outcome = fixture.tick(&press_e());

        assert_eq!(
            outcome,
            Some(InteractionOutcome::InjectableStored {
                dropped: Some(speed)
            })
        );
        assert!(fixture.world.is_active(speed));
        assert!(fixture.equip.inventory().has_injection);
    }
}
