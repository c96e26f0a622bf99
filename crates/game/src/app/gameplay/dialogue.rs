use engine::{DialogueLineDef, DialogueZoneDef, EntityId, SceneWorld, Signal, SignalBus, Vec3};

pub(crate) use engine::DialogueOwner;
use thiserror::Error;
use tracing::{debug, info, warn};

pub(crate) const INTER_NODE_DELAY_SECONDS: f32 = 1.0;
/// Wait used when the caller advances the dialogue itself.
pub(crate) const INPUT_HOLD_SECONDS: f32 = 300_000.0;

const WORDS_PER_MINUTE: f32 = 200.0;

/// Reading time for `text`: whole minutes at 200 words per minute, the
/// fractional minute scaled by 0.6 * 100, plus `extra_reading_time`.
pub(crate) fn display_duration(text: &str, extra_reading_time: f32) -> f32 {
    let words = text.split(' ').count() as f32;
    let minutes = words / WORDS_PER_MINUTE;
    let whole_minutes = minutes.floor();
    let fraction = minutes - whole_minutes;
    let additional_seconds = fraction * 0.6 * 100.0;
    whole_minutes * 60.0 + additional_seconds + extra_reading_time
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DialogueNode {
    pub(crate) text: String,
    pub(crate) display_duration: f32,
    pub(crate) play_once: bool,
}

impl DialogueNode {
    pub(crate) fn from_line(line: &DialogueLineDef, extra_reading_time: f32) -> Self {
        Self {
            text: line.text.clone(),
            display_duration: display_duration(&line.text, extra_reading_time),
            play_once: line.play_once,
        }
    }
}

pub(crate) fn nodes_from_lines(lines: &[DialogueLineDef], extra_reading_time: f32) -> Vec<DialogueNode> {
    lines
        .iter()
        .map(|line| DialogueNode::from_line(line, extra_reading_time))
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) struct DialogueRequest {
    pub(crate) nodes: Vec<DialogueNode>,
    /// Despawned after the last node if any shown node was `play_once`.
    pub(crate) zone: Option<EntityId>,
    pub(crate) hold_for_input: bool,
    pub(crate) owner: DialogueOwner,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum DialogueError {
    #[error("a dialogue is already playing")]
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DialoguePhase {
    Inactive,
    Showing { index: usize, remaining: f32 },
    Gap { next_index: usize, remaining: f32 },
}

/// Plays one node list at a time: text, display wait, blank gap, next node.
#[derive(Debug)]
pub(crate) struct DialoguePlayer {
    phase: DialoguePhase,
    nodes: Vec<DialogueNode>,
    zone: Option<EntityId>,
    hold_for_input: bool,
    owner: Option<DialogueOwner>,
    destroy_zone_on_finish: bool,
    completed_runs: u32,
}

impl Default for DialoguePlayer {
    fn default() -> Self {
        Self {
            phase: DialoguePhase::Inactive,
            nodes: Vec::new(),
            zone: None,
            hold_for_input: false,
            owner: None,
            destroy_zone_on_finish: false,
            completed_runs: 0,
        }
    }
}

impl DialoguePlayer {
    pub(crate) fn is_active(&self) -> bool {
        self.phase != DialoguePhase::Inactive
    }

    pub(crate) fn owner(&self) -> Option<&DialogueOwner> {
        self.owner.as_ref()
    }

    pub(crate) fn completed_runs(&self) -> u32 {
        self.completed_runs
    }

    /// Subtitle currently on screen; `None` during gaps and when idle.
    pub(crate) fn current_text(&self) -> Option<&str> {
        match self.phase {
            DialoguePhase::Showing { index, .. } => {
                self.nodes.get(index).map(|node| node.text.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn start(
        &mut self,
        request: DialogueRequest,
        world: &mut SceneWorld,
        signals: &mut SignalBus,
    ) -> Result<(), DialogueError> {
        if self.is_active() {
            warn!(requested_by = ?request.owner, active_owner = ?self.owner, "dialogue_start_rejected");
            return Err(DialogueError::AlreadyActive);
        }

        info!(
            owner = ?request.owner,
            nodes = request.nodes.len(),
            hold_for_input = request.hold_for_input,
            "dialogue_started"
        );
        self.nodes = request.nodes;
        self.zone = request.zone;
        self.hold_for_input = request.hold_for_input;
        self.owner = Some(request.owner);
        self.destroy_zone_on_finish = false;
        self.show(0, world, signals);
        Ok(())
    }

    pub(crate) fn tick(
        &mut self,
        fixed_dt_seconds: f32,
        world: &mut SceneWorld,
        signals: &mut SignalBus,
    ) {
        match self.phase {
            DialoguePhase::Inactive => {}
            DialoguePhase::Showing { index, remaining } => {
                let remaining = remaining - fixed_dt_seconds;
                self.phase = if remaining <= 0.0 {
                    DialoguePhase::Gap {
                        next_index: index + 1,
                        remaining: INTER_NODE_DELAY_SECONDS,
                    }
                } else {
                    DialoguePhase::Showing { index, remaining }
                };
            }
            DialoguePhase::Gap {
                next_index,
                remaining,
            } => {
                let remaining = remaining - fixed_dt_seconds;
                if remaining <= 0.0 {
                    self.show(next_index, world, signals);
                } else {
                    self.phase = DialoguePhase::Gap {
                        next_index,
                        remaining,
                    };
                }
            }
        }
    }

    /// Ends the current display wait early. The blank gap still follows.
    pub(crate) fn advance(&mut self) -> bool {
        let DialoguePhase::Showing { index, .. } = self.phase else {
            return false;
        };
        self.phase = DialoguePhase::Gap {
            next_index: index + 1,
            remaining: INTER_NODE_DELAY_SECONDS,
        };
        true
    }

    /// Tears the player down without completing: no signal, no zone cleanup.
    pub(crate) fn stop(&mut self) {
        if self.is_active() {
            debug!(owner = ?self.owner, "dialogue_stopped");
        }
        self.phase = DialoguePhase::Inactive;
        self.nodes.clear();
        self.zone = None;
        self.owner = None;
        self.destroy_zone_on_finish = false;
    }

    /// Cuts a trigger zone's lines short so scripted dialogue can take over.
    /// The zone run ends without a completion signal and keeps its entity.
    pub(crate) fn preempt_zone(&mut self) -> bool {
        if !matches!(self.owner, Some(DialogueOwner::Zone(_))) {
            return false;
        }
        info!(owner = ?self.owner, "zone_dialogue_preempted");
        self.stop();
        true
    }

    /// Stops the dialogue only if `owner` started it.
    pub(crate) fn release(&mut self, owner: &DialogueOwner) -> bool {
        if self.owner.as_ref() != Some(owner) {
            return false;
        }
        self.stop();
        true
    }

    fn show(&mut self, index: usize, world: &mut SceneWorld, signals: &mut SignalBus) {
        let Some(node) = self.nodes.get(index) else {
            self.finish(world, signals);
            return;
        };
        if node.play_once {
            self.destroy_zone_on_finish = true;
        }
        let remaining = if self.hold_for_input {
            INPUT_HOLD_SECONDS
        } else {
            node.display_duration
        };
        self.phase = DialoguePhase::Showing { index, remaining };
    }

    fn finish(&mut self, world: &mut SceneWorld, signals: &mut SignalBus) {
        if self.destroy_zone_on_finish {
            if let Some(zone) = self.zone {
                world.despawn(zone);
            }
        }
        info!(owner = ?self.owner, nodes = self.nodes.len(), "dialogue_completed");
        let owner = self.owner.take();
        self.stop();
        self.completed_runs = self.completed_runs.saturating_add(1);
        if let Some(owner) = owner {
            signals.emit(Signal::DialogueComplete { owner });
        }
    }
}

/// Starts its lines when the player walks into `radius`. Once a `play_once`
/// line has been shown the zone entity is despawned and the zone goes quiet.
#[derive(Debug, Clone)]
pub(crate) struct DialogueTriggerZone {
    entity: EntityId,
    radius: f32,
    extra_reading_time: f32,
    lines: Vec<DialogueLineDef>,
    player_inside: bool,
}

impl DialogueTriggerZone {
    pub(crate) fn new(entity: EntityId, def: &DialogueZoneDef) -> Self {
        Self {
            entity,
            radius: def.radius,
            extra_reading_time: def.extra_reading_time,
            lines: def.lines.clone(),
            player_inside: false,
        }
    }

    pub(crate) fn entity(&self) -> EntityId {
        self.entity
    }

    pub(crate) fn tick(
        &mut self,
        player_position: Vec3,
        world: &mut SceneWorld,
        dialogue: &mut DialoguePlayer,
        signals: &mut SignalBus,
    ) {
        let Some(zone) = world.find_entity(self.entity) else {
            return;
        };
        if !zone.active || world.is_pending_despawn(self.entity) {
            self.player_inside = false;
            return;
        }

        let inside = zone.pose.position.distance(player_position) <= self.radius;
        let entered = inside && !self.player_inside;
        self.player_inside = inside;
        if !entered {
            return;
        }

        let request = DialogueRequest {
            nodes: nodes_from_lines(&self.lines, self.extra_reading_time),
            zone: Some(self.entity),
            hold_for_input: false,
            owner: DialogueOwner::Zone(self.entity),
        };
        if dialogue.start(request, world, signals).is_err() {
            debug!(zone = self.entity.0, "dialogue_zone_entered_while_busy");
        }
    }
}
