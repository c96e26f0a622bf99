use std::path::PathBuf;

use engine::{
    DefDatabase, EntityId, InputSnapshot, Pathfinder, Pose, Scene, SceneCommand, SceneWorld,
    SignalBus, StraightLinePathfinder, Vec3,
};
use tracing::{debug, info, warn};

use super::ai::{
    apply_movement_command, ChaserAgent, ChaserTuning, CompanionAgent, CompanionTuning, StalkerAgent,
    StalkerTuning,
};
use super::camera_zone::{CameraSettings, CameraZoneTracker};
use super::capture::{AgentRef, CaptureCoordinator, CaptureEvent, CaptureSettings};
use super::checkpoint::{CheckpointStore, CheckpointTriggers};
use super::dialogue::{DialoguePlayer, DialogueTriggerZone};
use super::effects::ActiveEffects;
use super::equip::EquipController;
use super::interaction::{InteractionContext, InteractionOutcome, InteractionSystem};
use super::layout::{Layout, LayoutRole};
use super::pause::PauseState;
use super::player::{PlayerController, PLAYER_BASE_SPEED, PLAYER_CROUCH_SPEED, PLAYER_SPRINT_SPEED};
use super::report::{
    ChaserSummary, CompanionSummary, SequenceSummary, SessionReport, StalkerSummary,
};
use super::sequencer::{SequenceContext, SequenceState, StepSequencer};
use super::tools::{Tool, ToolOutput, TORCH_DRAIN_PER_SECOND};
use super::transition::{SceneTransition, TransitionEvent, DEFAULT_SPAWN_POINT};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionConfig {
    pub(crate) player_speed: f32,
    pub(crate) player_sprint_speed: f32,
    pub(crate) player_crouch_speed: f32,
    pub(crate) torch_drain_rate: f32,
    pub(crate) capture: CaptureSettings,
    /// The session asks the loop to stop once this sequence completes.
    pub(crate) quit_after_sequence: Option<String>,
    pub(crate) report_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player_speed: PLAYER_BASE_SPEED,
            player_sprint_speed: PLAYER_SPRINT_SPEED,
            player_crouch_speed: PLAYER_CROUCH_SPEED,
            torch_drain_rate: TORCH_DRAIN_PER_SECOND,
            capture: CaptureSettings::default(),
            quit_after_sequence: None,
            report_path: None,
        }
    }
}

#[derive(Debug)]
struct ChaserSlot {
    entity: EntityId,
    name: String,
    agent: ChaserAgent,
    pathfinder: StraightLinePathfinder,
}

#[derive(Debug)]
struct StalkerSlot {
    entity: EntityId,
    name: String,
    agent: StalkerAgent,
    pathfinder: StraightLinePathfinder,
}

#[derive(Debug)]
struct CompanionSlot {
    entity: EntityId,
    name: String,
    agent: CompanionAgent,
    pathfinder: StraightLinePathfinder,
}

#[derive(Debug, Clone, Copy)]
struct LowCeiling {
    entity: EntityId,
    radius: f32,
}

#[derive(Debug, Clone)]
struct EndTrigger {
    entity: EntityId,
    radius: f32,
    sequence: String,
    player_inside: bool,
}

#[derive(Debug, Clone)]
struct SceneExit {
    entity: EntityId,
    radius: f32,
    target: String,
    spawn_point: String,
    player_inside: bool,
}

/// The playable scene: spawns a layout, wires its entities to the gameplay
/// systems and steps them in a fixed order every tick.
pub(crate) struct GameSession {
    config: SessionConfig,
    defs: DefDatabase,
    layout: Layout,
    current_scene: String,
    signals: SignalBus,
    dialogue: DialoguePlayer,
    checkpoint: CheckpointStore,
    capture: CaptureCoordinator,
    pause: PauseState,
    transition: SceneTransition,
    equip: EquipController,
    effects: ActiveEffects,
    player_controller: PlayerController,
    player: Option<EntityId>,
    player_pose: Pose,
    interaction: InteractionSystem,
    last_interaction: Option<InteractionOutcome>,
    checkpoints: CheckpointTriggers,
    camera_zones: CameraZoneTracker,
    dialogue_zones: Vec<DialogueTriggerZone>,
    sequencers: Vec<StepSequencer>,
    chasers: Vec<ChaserSlot>,
    stalkers: Vec<StalkerSlot>,
    companions: Vec<CompanionSlot>,
    low_ceilings: Vec<LowCeiling>,
    end_triggers: Vec<EndTrigger>,
    scene_exits: Vec<SceneExit>,
    torch_aimed: bool,
    ticks: u64,
    finished: bool,
}

impl GameSession {
    pub(crate) fn new(defs: DefDatabase, layout: Layout, config: SessionConfig) -> Self {
        let capture = CaptureCoordinator::new(config.capture);
        let equip = EquipController::new(config.torch_drain_rate);
        let player_controller = PlayerController {
            speed: config.player_speed,
            sprint_speed: config.player_sprint_speed,
            crouch_speed: config.player_crouch_speed,
        };
        Self {
            current_scene: layout.scene_name.clone(),
            config,
            defs,
            layout,
            signals: SignalBus::default(),
            dialogue: DialoguePlayer::default(),
            checkpoint: CheckpointStore::default(),
            capture,
            pause: PauseState::default(),
            transition: SceneTransition::default(),
            equip,
            effects: ActiveEffects::default(),
            player_controller,
            player: None,
            player_pose: Pose::default(),
            interaction: InteractionSystem::default(),
            last_interaction: None,
            checkpoints: CheckpointTriggers::default(),
            camera_zones: CameraZoneTracker::default(),
            dialogue_zones: Vec::new(),
            sequencers: Vec::new(),
            chasers: Vec::new(),
            stalkers: Vec::new(),
            companions: Vec::new(),
            low_ceilings: Vec::new(),
            end_triggers: Vec::new(),
            scene_exits: Vec::new(),
            torch_aimed: false,
            ticks: 0,
            finished: false,
        }
    }

    pub(crate) fn player_pose(&self) -> Pose {
        self.player_pose
    }

    /// Moves the player without going through input, keeping the entity in
    /// sync.
    pub(crate) fn place_player(&mut self, world: &mut SceneWorld, pose: Pose) {
        self.player_pose = pose;
        self.sync_player(world);
    }

    pub(crate) fn sequence(&self, name: &str) -> Option<&StepSequencer> {
        self.sequencers.iter().find(|sequencer| sequencer.name() == name)
    }

    pub(crate) fn equip(&self) -> &EquipController {
        &self.equip
    }

    pub(crate) fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    pub(crate) fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    pub(crate) fn capture(&self) -> &CaptureCoordinator {
        &self.capture
    }

    pub(crate) fn camera(&self) -> &CameraSettings {
        self.camera_zones.active()
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub(crate) fn current_scene(&self) -> &str {
        &self.current_scene
    }

    pub(crate) fn last_interaction(&self) -> Option<InteractionOutcome> {
        self.last_interaction
    }

    pub(crate) fn report(&self) -> SessionReport {
        SessionReport {
            scene: self.current_scene.clone(),
            ticks: self.ticks,
            content_fingerprint: self.defs.fingerprint().to_string(),
            sequences: self
                .sequencers
                .iter()
                .map(|sequencer| SequenceSummary {
                    name: sequencer.name().to_string(),
                    state: sequencer.state(),
                    transitions: sequencer.transitions().to_vec(),
                })
                .collect(),
            chasers: self
                .chasers
                .iter()
                .map(|slot| ChaserSummary {
                    entity: slot.entity,
                    name: slot.name.clone(),
                    state: slot.agent.state(),
                    activated: slot.agent.is_activated(),
                    posture: slot.agent.posture(),
                    attack_triggers: slot.agent.attack_triggers(),
                })
                .collect(),
            stalkers: self
                .stalkers
                .iter()
                .map(|slot| StalkerSummary {
                    entity: slot.entity,
                    name: slot.name.clone(),
                    state: slot.agent.state(),
                    affected: slot.agent.is_affected(),
                    posture: slot.agent.posture(),
                    attack_triggers: slot.agent.attack_triggers(),
                })
                .collect(),
            companions: self
                .companions
                .iter()
                .map(|slot| CompanionSummary {
                    entity: slot.entity,
                    name: slot.name.clone(),
                    state: slot.agent.state(),
                    crouching: slot.agent.is_crouching(),
                    posture: slot.agent.posture(),
                })
                .collect(),
            captures_completed: self.capture.captures_completed(),
            checkpoint: self
                .checkpoint
                .has_checkpoint()
                .then(|| self.checkpoint.get()),
            equipment: self.equip.snapshot(),
            speed_multiplier: self.effects.speed_multiplier(),
            jump_multiplier: self.effects.jump_multiplier(),
            dialogue_runs: self.dialogue.completed_runs(),
            interactions: self.interaction.interactions_total(),
            signals: self.signals.lifetime_counts(),
        }
    }

    fn sync_player(&self, world: &mut SceneWorld) {
        if let Some(player) = self.player {
            world.set_pose(player, self.player_pose);
        }
    }

    fn spawn_layout(&mut self, world: &mut SceneWorld) {
        let mut pending_agents = Vec::new();
        for entry in &self.layout.entries {
            let entity = if entry.active {
                world.spawn(entry.name.clone(), entry.pose)
            } else {
                world.spawn_inactive(entry.name.clone(), entry.pose)
            };
            match &entry.role {
                LayoutRole::Player => {
                    self.player = Some(entity);
                    self.player_pose = entry.pose;
                }
                LayoutRole::SpawnPoint | LayoutRole::Prop => {}
                LayoutRole::Interactable(kind) => self.interaction.register(entity, *kind),
                LayoutRole::Checkpoint { radius } => self.checkpoints.add(entity, *radius),
                LayoutRole::CameraZone { radius, settings } => {
                    self.camera_zones.add(entity, *radius, settings.clone());
                }
                LayoutRole::LowCeiling { radius } => self.low_ceilings.push(LowCeiling {
                    entity,
                    radius: *radius,
                }),
                LayoutRole::Chaser { .. } | LayoutRole::Stalker { .. } | LayoutRole::Companion => {
                    pending_agents.push((entity, entry.name.clone(), entry.pose, entry.role.clone()));
                }
                LayoutRole::EndTrigger { radius, sequence } => self.end_triggers.push(EndTrigger {
                    entity,
                    radius: *radius,
                    sequence: sequence.clone(),
                    player_inside: false,
                }),
                LayoutRole::SceneExit {
                    radius,
                    target,
                    spawn_point,
                } => self.scene_exits.push(SceneExit {
                    entity,
                    radius: *radius,
                    target: target.clone(),
                    spawn_point: spawn_point.clone(),
                    player_inside: false,
                }),
            }
        }

        if self.player.is_none() {
            warn!(scene = %self.layout.scene_name, "layout_has_no_player");
            self.player = Some(world.spawn("Player", self.player_pose));
        }

        for (entity, name, pose, role) in pending_agents {
            self.spawn_agent(entity, name, pose, &role);
        }
    }

    fn spawn_agent(&mut self, entity: EntityId, name: String, pose: Pose, role: &LayoutRole) {
        match role {
            LayoutRole::Chaser { def } => {
                let tuning = match self.defs.chaser(def) {
                    Some(def) => ChaserTuning::from(def),
                    None => {
                        warn!(agent = %name, def = %def, "chaser_def_missing_using_defaults");
                        ChaserTuning::default()
                    }
                };
                self.chasers.push(ChaserSlot {
                    entity,
                    name,
                    pathfinder: StraightLinePathfinder::new(pose.position, tuning.chase_speed),
                    agent: ChaserAgent::new(tuning, pose),
                });
            }
            LayoutRole::Stalker { def } => {
                let tuning = match self.defs.stalker(def) {
                    Some(def) => StalkerTuning::from(def),
                    None => {
                        warn!(agent = %name, def = %def, "stalker_def_missing_using_defaults");
                        StalkerTuning::default()
                    }
                };
                self.stalkers.push(StalkerSlot {
                    entity,
                    name,
                    pathfinder: StraightLinePathfinder::new(pose.position, tuning.normal_speed),
                    agent: StalkerAgent::new(tuning, pose),
                });
            }
            LayoutRole::Companion => {
                let tuning = CompanionTuning::default();
                self.companions.push(CompanionSlot {
                    entity,
                    name,
                    pathfinder: StraightLinePathfinder::new(pose.position, tuning.follow_speed),
                    agent: CompanionAgent::new(tuning),
                });
            }
            _ => {}
        }
    }

    /// Sequencers and dialogue zones resolve entity names, so this runs after
    /// the layout has been applied to the world.
    fn wire_content(&mut self, world: &mut SceneWorld) {
        for def in self.defs.sequences() {
            self.sequencers
                .push(StepSequencer::from_def(def, world, &mut self.signals));
        }
        for def in self.defs.dialogue_zones() {
            match world.find_by_name(&def.zone) {
                Some(entity) => self.dialogue_zones.push(DialogueTriggerZone::new(entity, def)),
                None => warn!(def = %def.def_name, zone = %def.zone, "dialogue_zone_entity_missing"),
            }
        }

        let mut cx = SequenceContext {
            world,
            signals: &mut self.signals,
            dialogue: &mut self.dialogue,
        };
        for (sequencer, def) in self.sequencers.iter_mut().zip(self.defs.sequences()) {
            if !def.start_on_load {
                continue;
            }
            if let Err(err) = sequencer.start(&mut cx) {
                warn!(sequence = %def.def_name, error = %err, "sequence_autostart_failed");
            }
        }
    }

    fn tick_player(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        if self.capture.is_running() || self.transition.is_transitioning() {
            return;
        }
        let moved = self.player_controller.tick(
            input,
            &mut self.player_pose,
            self.effects.speed_multiplier(),
            fixed_dt_seconds,
        );
        if moved != Vec3::ZERO {
            self.sync_player(world);
        }
    }

    fn tick_equipment(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        let report = self.equip.handle_input(input, self.player_pose);
        for output in &report.outputs {
            match output {
                ToolOutput::RepelCone(cone) => {
                    for slot in &mut self.stalkers {
                        let Some(position) = world.position_of(slot.entity) else {
                            continue;
                        };
                        if cone.contains(position) {
                            slot.agent.repel(cone.origin, position);
                        }
                    }
                }
                ToolOutput::RockThrown { origin, direction } => {
                    debug!(x = origin.x, z = origin.z, dx = direction.x, dz = direction.z, "rock_thrown");
                }
                ToolOutput::Animation(cue) => debug!(cue = ?cue, "animation_cue"),
                ToolOutput::InjectRequested => {}
            }
        }
        if let Some(held) = report.injected {
            self.effects.apply(held.effect, held.parameters);
            world.despawn(held.entity);
        }

        let aimed = matches!(self.equip.equipped(), Some(Tool::Torch(torch)) if torch.is_aiming());
        if aimed != self.torch_aimed {
            self.torch_aimed = aimed;
            for slot in &mut self.stalkers {
                slot.agent.on_aimed(aimed);
            }
        }

        self.equip.tick(fixed_dt_seconds);
        self.effects.tick(fixed_dt_seconds);
    }

    fn tick_interaction(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        let mut cx = InteractionContext {
            world,
            signals: &mut self.signals,
            equip: &mut self.equip,
            player: &mut self.player_pose,
        };
        let outcome = self.interaction.tick(fixed_dt_seconds, input, &mut cx);
        if let Some(InteractionOutcome::Teleported(_)) = outcome {
            self.sync_player(world);
        }
        if outcome.is_some() {
            self.last_interaction = outcome;
        }
    }

    fn tick_triggers(&mut self, world: &mut SceneWorld) {
        let position = self.player_pose.position;
        self.checkpoints.tick(position, world, &mut self.checkpoint);
        self.camera_zones.tick(position, world);
        for zone in &mut self.dialogue_zones {
            zone.tick(position, world, &mut self.dialogue, &mut self.signals);
        }

        for trigger in &mut self.end_triggers {
            let inside = player_inside(world, trigger.entity, trigger.radius, position);
            let entered = inside && !trigger.player_inside;
            let exited = !inside && trigger.player_inside;
            trigger.player_inside = inside;
            if !entered && !exited {
                continue;
            }
            let Some(sequencer) = self
                .sequencers
                .iter_mut()
                .find(|sequencer| sequencer.name() == trigger.sequence)
            else {
                warn!(sequence = %trigger.sequence, "end_trigger_sequence_missing");
                continue;
            };
            let mut cx = SequenceContext {
                world: &mut *world,
                signals: &mut self.signals,
                dialogue: &mut self.dialogue,
            };
            if entered && sequencer.state() == SequenceState::NotStarted {
                if let Err(err) = sequencer.start(&mut cx) {
                    warn!(error = %err, "end_trigger_start_failed");
                }
            } else if exited && sequencer.is_active() {
                sequencer.skip_to_end(&mut cx);
            }
        }

        for exit in &mut self.scene_exits {
            let inside = player_inside(world, exit.entity, exit.radius, position);
            let entered = inside && !exit.player_inside;
            exit.player_inside = inside;
            if !entered {
                continue;
            }
            if self.transition.is_transitioning() {
                debug!(target = %exit.target, "scene_exit_ignored_while_transitioning");
                continue;
            }
            self.transition.set_next_spawn_point(exit.spawn_point.clone());
            if let Err(err) = self.transition.load_scene(&exit.target) {
                warn!(error = %err, "scene_exit_failed");
                continue;
            }
            for slot in &mut self.chasers {
                if slot.agent.begin_return() {
                    debug!(chaser = %slot.name, "chaser_sent_home");
                }
            }
        }
    }

    fn tick_sequencers(&mut self, input: &InputSnapshot, world: &mut SceneWorld) {
        let mut cx = SequenceContext {
            world,
            signals: &mut self.signals,
            dialogue: &mut self.dialogue,
        };
        for sequencer in &mut self.sequencers {
            sequencer.tick(input, &mut cx);
        }
    }

    fn tick_agents(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) {
        let target = self.player.map(|_| self.player_pose.position);

        for slot in &mut self.chasers {
            if !world.is_active(slot.entity) {
                continue;
            }
            let Some(current) = world.position_of(slot.entity) else {
                continue;
            };
            let tick = slot.agent.tick(current, target, fixed_dt_seconds);
            let pose = match apply_movement_command(tick.command, &mut slot.pathfinder) {
                Some(snapped) => snapped,
                None => moved_pose(world, slot.entity, current, slot.pathfinder.advance(fixed_dt_seconds)),
            };
            world.set_pose(slot.entity, pose);
            if tick.capture_requested {
                self.capture.request(AgentRef::Chaser(slot.entity));
            }
        }

        for slot in &mut self.stalkers {
            if !world.is_active(slot.entity) {
                continue;
            }
            let Some(current) = world.position_of(slot.entity) else {
                continue;
            };
            let tick = slot.agent.tick(current, target, fixed_dt_seconds);
            let pose = match apply_movement_command(tick.command, &mut slot.pathfinder) {
                Some(snapped) => snapped,
                None => moved_pose(world, slot.entity, current, slot.pathfinder.advance(fixed_dt_seconds)),
            };
            world.set_pose(slot.entity, pose);
            if tick.capture_requested {
                self.capture.request(AgentRef::Stalker(slot.entity));
            }
        }

        for slot in &mut self.companions {
            if !world.is_active(slot.entity) {
                continue;
            }
            let Some(current) = world.position_of(slot.entity) else {
                continue;
            };
            let low_ceiling = self
                .low_ceilings
                .iter()
                .any(|zone| player_inside(world, zone.entity, zone.radius, current));
            slot.agent.set_low_ceiling(low_ceiling);
            let tick = slot.agent.tick(current, target, fixed_dt_seconds);
            let pose = match apply_movement_command(tick.command, &mut slot.pathfinder) {
                Some(snapped) => snapped,
                None => moved_pose(world, slot.entity, current, slot.pathfinder.advance(fixed_dt_seconds)),
            };
            world.set_pose(slot.entity, pose);
        }
    }

    fn tick_capture(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) {
        let Some(event) = self.capture.tick(fixed_dt_seconds) else {
            return;
        };
        let CaptureEvent::Blackout(agent) = event else {
            return;
        };

        let reset = match agent {
            AgentRef::Chaser(entity) => self
                .chasers
                .iter_mut()
                .find(|slot| slot.entity == entity)
                .map(|slot| {
                    let pose = slot.agent.on_capture_blackout();
                    slot.pathfinder.warp(pose.position);
                    (entity, pose)
                }),
            AgentRef::Stalker(entity) => self
                .stalkers
                .iter_mut()
                .find(|slot| slot.entity == entity)
                .map(|slot| {
                    let pose = slot.agent.on_capture_blackout();
                    slot.pathfinder.warp(pose.position);
                    (entity, pose)
                }),
        };
        if let Some((entity, pose)) = reset {
            world.set_pose(entity, pose);
        }

        self.place_player(world, self.checkpoint.get());
        info!(
            agent = ?agent,
            x = self.player_pose.position.x,
            y = self.player_pose.position.y,
            z = self.player_pose.position.z,
            "player_respawned"
        );
    }

    fn tick_transition(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) {
        let Some(TransitionEvent::SwapScene {
            target,
            spawn_point,
        }) = self.transition.tick(fixed_dt_seconds)
        else {
            return;
        };
        let spawn = world
            .find_by_name(&spawn_point)
            .or_else(|| {
                warn!(spawn_point = %spawn_point, "spawn_point_missing_using_default");
                world.find_by_name(DEFAULT_SPAWN_POINT)
            })
            .and_then(|entity| world.find_entity(entity))
            .map(|entity| entity.pose);
        if let Some(pose) = spawn {
            self.place_player(world, pose);
        }
        info!(from = %self.current_scene, to = %target, spawn_point = %spawn_point, "scene_swapped");
        self.current_scene = target;
    }

    fn quit_sequence_complete(&self) -> bool {
        self.config
            .quit_after_sequence
            .as_deref()
            .and_then(|name| self.sequence(name))
            .is_some_and(|sequencer| sequencer.state() == SequenceState::Complete)
    }
}

fn player_inside(world: &SceneWorld, entity: EntityId, radius: f32, player: Vec3) -> bool {
    world
        .find_entity(entity)
        .is_some_and(|entity| entity.active && entity.pose.position.distance(player) <= radius)
}

/// Agent pose after a pathfinder step, turned toward the direction moved.
fn moved_pose(world: &SceneWorld, entity: EntityId, from: Vec3, to: Vec3) -> Pose {
    let mut pose = world
        .find_entity(entity)
        .map_or(Pose::at(from), |entity| entity.pose);
    pose.position = to;
    pose.face_toward(to - from);
    pose
}

impl Scene for GameSession {
    fn load(&mut self, world: &mut SceneWorld) {
        self.spawn_layout(world);
        world.apply_pending();
        self.wire_content(world);
        info!(
            scene = %self.current_scene,
            entities = world.entity_count(),
            interactables = self.interaction.len(),
            checkpoints = self.checkpoints.len(),
            sequences = self.sequencers.len(),
            chasers = self.chasers.len(),
            stalkers = self.stalkers.len(),
            companions = self.companions.len(),
            dialogue_zones = self.dialogue_zones.len(),
            "session_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        self.ticks = self.ticks.saturating_add(1);
        if self.pause.poll(input) {
            self.signals.finish_tick_rollover();
            return SceneCommand::None;
        }

        self.tick_player(fixed_dt_seconds, input, world);
        self.tick_equipment(fixed_dt_seconds, input, world);
        self.tick_interaction(fixed_dt_seconds, input, world);
        self.tick_triggers(world);
        self.dialogue.tick(fixed_dt_seconds, world, &mut self.signals);
        self.tick_sequencers(input, world);
        self.tick_agents(fixed_dt_seconds, world);
        self.tick_capture(fixed_dt_seconds, world);
        self.tick_transition(fixed_dt_seconds, world);
        self.signals.finish_tick_rollover();

        if !self.finished && self.quit_sequence_complete() {
            self.finished = true;
            info!(tick = self.ticks, "session_finished");
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        let report = self.report();
        match report.to_json() {
            Ok(json) => info!(report = %json, "session_report"),
            Err(err) => warn!(error = %err, "session_report_failed"),
        }
        if let Some(path) = &self.config.report_path {
            match report.write_to(path) {
                Ok(()) => info!(path = %path.display(), "session_report_written"),
                Err(err) => warn!(error = %err, "session_report_failed"),
            }
        }
        for sequencer in &mut self.sequencers {
            sequencer.detach(&mut self.signals);
        }
        self.dialogue.stop();
        world.clear();
        info!(ticks = self.ticks, "session_unloaded");
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        let running = self
            .sequencers
            .iter()
            .filter(|sequencer| sequencer.is_active())
            .map(StepSequencer::name)
            .collect::<Vec<_>>()
            .join(",");
        let equipped = self
            .equip
            .equipped_kind()
            .map_or("none", |kind| kind.label());
        let prompt = self
            .dialogue
            .current_text()
            .or_else(|| self.interaction.focus().map(|focus| focus.prompt.as_str()))
            .unwrap_or_default();
        Some(format!(
            "{} | tick {} | entities {} | running [{}] | hand {} | fuel {:.0} | {}{}",
            self.current_scene,
            self.ticks,
            world.entity_count(),
            running,
            equipped,
            self.equip.fuel(),
            prompt,
            if self.pause.is_paused() { " | paused" } else { "" }
        ))
    }
}
