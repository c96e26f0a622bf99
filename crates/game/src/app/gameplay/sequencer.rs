use engine::{
    EntityId, InputAction, InputSource, MarkerKind, SceneWorld, SequenceDef, Signal, SignalBus,
    SignalKind, StepActionKind, StepDef, Subscription, DEFAULT_EXTRA_READING_TIME,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::dialogue::{nodes_from_lines, DialogueNode, DialogueOwner, DialoguePlayer, DialogueRequest};

/// Key that completes a dialogue step waiting for input.
pub(crate) const PROGRESS_ACTION: InputAction = InputAction::Interact;

const COMPLETION_SIGNALS: [SignalKind; 4] = [
    SignalKind::DialogueComplete,
    SignalKind::Interacted,
    SignalKind::PickedUp,
    SignalKind::StairUsed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum StepAction {
    Dialogue,
    Interaction,
    Pickup,
    UseStair,
}

impl From<StepActionKind> for StepAction {
    fn from(kind: StepActionKind) -> Self {
        match kind {
            StepActionKind::Dialogue => Self::Dialogue,
            StepActionKind::Interaction => Self::Interaction,
            StepActionKind::Pickup => Self::Pickup,
            StepActionKind::UseStair => Self::UseStair,
        }
    }
}

impl StepAction {
    /// Marker attached to the step target so the interaction detector
    /// reports it.
    pub(crate) fn marker(self) -> Option<MarkerKind> {
        match self {
            Self::Dialogue => None,
            Self::Interaction => Some(MarkerKind::Interaction),
            Self::Pickup => Some(MarkerKind::Pickup),
            Self::UseStair => Some(MarkerKind::Stair),
        }
    }

    /// Dialogue steps only accept the end of a dialogue `sequence` started.
    fn completed_by(self, signal: &Signal, target: Option<EntityId>, sequence: &str) -> bool {
        match (self, signal) {
            (
                Self::Dialogue,
                Signal::DialogueComplete {
                    owner: DialogueOwner::Sequence(owner),
                },
            ) => owner == sequence,
            (Self::Interaction, Signal::Interacted { entity })
            | (Self::Pickup, Signal::PickedUp { entity })
            | (Self::UseStair, Signal::StairUsed { entity }) => target == Some(*entity),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub(crate) step_id: String,
    pub(crate) action: StepAction,
    pub(crate) target: Option<EntityId>,
    pub(crate) dialogue: Vec<DialogueNode>,
    pub(crate) requires_input: bool,
    pub(crate) description: String,
}

impl Step {
    pub(crate) fn from_def(def: &StepDef, world: &SceneWorld) -> Self {
        let target = def.target.as_deref().and_then(|name| {
            let resolved = world.find_by_name(name);
            if resolved.is_none() {
                warn!(step_id = %def.step_id, target = name, "step_target_not_found");
            }
            resolved
        });
        Self {
            step_id: def.step_id.clone(),
            action: def.action.into(),
            target,
            dialogue: nodes_from_lines(&def.dialogue, DEFAULT_EXTRA_READING_TIME),
            requires_input: def.requires_input,
            description: def.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum SequenceState {
    NotStarted,
    Running(usize),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StepTransition {
    pub(crate) index: usize,
    pub(crate) step_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SequenceError {
    #[error("sequence '{sequence}' is already running")]
    AlreadyActive { sequence: String },
}

pub(crate) struct SequenceContext<'a> {
    pub(crate) world: &'a mut SceneWorld,
    pub(crate) signals: &'a mut SignalBus,
    pub(crate) dialogue: &'a mut DialoguePlayer,
}

/// Runs an ordered list of steps one at a time. Completion is push-based: the
/// sequencer owns a signal subscription and drains it once per tick.
#[derive(Debug)]
pub(crate) struct StepSequencer {
    name: String,
    steps: Vec<Step>,
    activate_on_complete: Vec<EntityId>,
    deactivate_on_complete: Vec<EntityId>,
    subscription: Option<Subscription>,
    state: SequenceState,
    step_complete: bool,
    dialogue_pending: bool,
    attached_marker: Option<(EntityId, MarkerKind)>,
    transitions: Vec<StepTransition>,
    completion_emitted: bool,
}

impl StepSequencer {
    pub(crate) fn new(
        name: impl Into<String>,
        steps: Vec<Step>,
        activate_on_complete: Vec<EntityId>,
        deactivate_on_complete: Vec<EntityId>,
        signals: &mut SignalBus,
    ) -> Self {
        Self {
            name: name.into(),
            steps,
            activate_on_complete,
            deactivate_on_complete,
            subscription: Some(signals.subscribe(&COMPLETION_SIGNALS)),
            state: SequenceState::NotStarted,
            step_complete: false,
            dialogue_pending: false,
            attached_marker: None,
            transitions: Vec::new(),
            completion_emitted: false,
        }
    }

    pub(crate) fn from_def(def: &SequenceDef, world: &SceneWorld, signals: &mut SignalBus) -> Self {
        let steps = def
            .steps
            .iter()
            .map(|step| Step::from_def(step, world))
            .collect();
        let resolve = |names: &[String]| -> Vec<EntityId> {
            names
                .iter()
                .filter_map(|name| {
                    let resolved = world.find_by_name(name);
                    if resolved.is_none() {
                        warn!(sequence = %def.def_name, entity = %name, "completion_entity_not_found");
                    }
                    resolved
                })
                .collect()
        };
        Self::new(
            def.def_name.clone(),
            steps,
            resolve(&def.activate_on_complete),
            resolve(&def.deactivate_on_complete),
            signals,
        )
    }

    /// Drops the signal subscription. The sequencer stays inspectable but no
    /// longer reacts to signals.
    pub(crate) fn detach(&mut self, signals: &mut SignalBus) {
        if let Some(subscription) = self.subscription.take() {
            signals.unsubscribe(subscription);
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> SequenceState {
        self.state
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.state, SequenceState::Running(_))
    }

    /// `None` before the first start; `steps.len()` once complete.
    pub(crate) fn current_step_index(&self) -> Option<usize> {
        match self.state {
            SequenceState::NotStarted => None,
            SequenceState::Running(index) => Some(index),
            SequenceState::Complete => Some(self.steps.len()),
        }
    }

    pub(crate) fn current_step(&self) -> Option<&Step> {
        match self.state {
            SequenceState::Running(index) => self.steps.get(index),
            _ => None,
        }
    }

    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn transitions(&self) -> &[StepTransition] {
        &self.transitions
    }

    pub(crate) fn start(&mut self, cx: &mut SequenceContext<'_>) -> Result<(), SequenceError> {
        if self.is_active() {
            warn!(sequence = %self.name, "sequence_start_rejected");
            return Err(SequenceError::AlreadyActive {
                sequence: self.name.clone(),
            });
        }

        if let Some(subscription) = &self.subscription {
            let stale = cx.signals.drain(subscription);
            if !stale.is_empty() {
                debug!(sequence = %self.name, discarded = stale.len(), "stale_signals_discarded");
            }
        }
        info!(sequence = %self.name, steps = self.steps.len(), "sequence_started");
        self.state = SequenceState::NotStarted;
        self.transitions.clear();
        self.completion_emitted = false;
        self.advance_to_next_step(cx);
        Ok(())
    }

    pub(crate) fn advance_to_next_step(&mut self, cx: &mut SequenceContext<'_>) {
        let next_index = match self.state {
            SequenceState::NotStarted => 0,
            SequenceState::Running(index) => index + 1,
            SequenceState::Complete => return,
        };
        if next_index >= self.steps.len() {
            self.finish(cx);
            return;
        }
        self.state = SequenceState::Running(next_index);
        self.step_complete = false;
        self.dialogue_pending = false;
        self.start_step(next_index, cx);
    }

    /// Drains this sequencer's mailbox every tick. Signals that arrive while
    /// the sequence is not running are discarded, never replayed on start.
    pub(crate) fn tick(&mut self, input: &dyn InputSource, cx: &mut SequenceContext<'_>) {
        let Some(subscription) = &self.subscription else {
            return;
        };
        let pending = cx.signals.drain(subscription);
        if !self.is_active() {
            return;
        }

        let state_at_tick_start = self.state;
        for signal in &pending {
            self.handle_signal(signal, cx);
        }
        if self.dialogue_pending {
            self.start_step_dialogue(cx);
        }

        // A step started during this tick must not see the press that
        // finished the previous one.
        if self.state != state_at_tick_start || self.step_complete {
            return;
        }
        let Some(step) = self.current_step() else {
            return;
        };
        if step.action != StepAction::Dialogue || !step.requires_input {
            return;
        }
        if !input.key_pressed(PROGRESS_ACTION) {
            return;
        }
        if let Some(target) = step.target {
            cx.world.despawn(target);
        }
        self.complete_current_step(cx);
    }

    /// Completes the running step at most once, then moves on.
    pub(crate) fn complete_current_step(&mut self, cx: &mut SequenceContext<'_>) -> bool {
        let SequenceState::Running(index) = self.state else {
            return false;
        };
        if self.step_complete {
            return false;
        }
        self.step_complete = true;

        if let Some((entity, marker)) = self.attached_marker.take() {
            cx.world.detach_marker(entity, marker);
        }
        cx.dialogue
            .release(&DialogueOwner::Sequence(self.name.clone()));

        let step_id = self
            .steps
            .get(index)
            .map(|step| step.step_id.clone())
            .unwrap_or_default();
        self.transitions.push(StepTransition {
            index,
            step_id: step_id.clone(),
        });
        info!(sequence = %self.name, step_id = %step_id, index, "sequence_step_completed");
        cx.signals.emit(Signal::SequenceStepCompleted {
            sequence: self.name.clone(),
            step_id,
        });

        self.advance_to_next_step(cx);
        true
    }

    /// Jumps straight to completion, running the completion side effects.
    pub(crate) fn skip_to_end(&mut self, cx: &mut SequenceContext<'_>) -> bool {
        if self.state == SequenceState::Complete {
            return false;
        }
        if let Some((entity, marker)) = self.attached_marker.take() {
            cx.world.detach_marker(entity, marker);
        }
        cx.dialogue
            .release(&DialogueOwner::Sequence(self.name.clone()));
        info!(sequence = %self.name, at_step = ?self.current_step_index(), "sequence_skipped");
        self.finish(cx);
        true
    }

    fn handle_signal(&mut self, signal: &Signal, cx: &mut SequenceContext<'_>) {
        if self.step_complete {
            return;
        }
        let Some(step) = self.current_step() else {
            return;
        };
        if step.action.completed_by(signal, step.target, &self.name) {
            self.complete_current_step(cx);
        }
    }

    fn start_step(&mut self, index: usize, cx: &mut SequenceContext<'_>) {
        let Some(step) = self.steps.get(index) else {
            return;
        };
        info!(
            sequence = %self.name,
            step_id = %step.step_id,
            index,
            action = ?step.action,
            description = %step.description,
            "sequence_step_started"
        );

        match step.target {
            Some(target) => {
                if !cx.world.set_active(target, true) {
                    warn!(sequence = %self.name, step_id = %step.step_id, target = target.0, "step_target_missing");
                }
            }
            None if step.action != StepAction::Dialogue => {
                warn!(sequence = %self.name, step_id = %step.step_id, "step_has_no_target");
            }
            None => {}
        }

        let has_dialogue = !step.dialogue.is_empty();
        let marker = step.action.marker();
        let target = step.target;
        if let (Some(marker), Some(target)) = (marker, target) {
            if cx.world.attach_marker(target, marker) {
                self.attached_marker = Some((target, marker));
            }
        }

        if has_dialogue {
            self.start_step_dialogue(cx);
        }
    }

    /// Starts the running step's lines. A trigger zone's lines give way; a
    /// dialogue owned by another sequence keeps the request pending and
    /// `tick` retries it.
    fn start_step_dialogue(&mut self, cx: &mut SequenceContext<'_>) {
        let SequenceState::Running(index) = self.state else {
            return;
        };
        let Some(step) = self.steps.get(index) else {
            return;
        };
        cx.dialogue.preempt_zone();
        let request = DialogueRequest {
            nodes: step.dialogue.clone(),
            zone: step.target,
            hold_for_input: step.requires_input,
            owner: DialogueOwner::Sequence(self.name.clone()),
        };
        match cx.dialogue.start(request, cx.world, cx.signals) {
            Ok(()) => self.dialogue_pending = false,
            Err(err) => {
                if !self.dialogue_pending {
                    debug!(sequence = %self.name, step_id = %step.step_id, error = %err, "step_dialogue_deferred");
                }
                self.dialogue_pending = true;
            }
        }
    }

    fn finish(&mut self, cx: &mut SequenceContext<'_>) {
        self.state = SequenceState::Complete;
        self.dialogue_pending = false;
        for &entity in &self.activate_on_complete {
            cx.world.set_active(entity, true);
        }
        for &entity in &self.deactivate_on_complete {
            cx.world.set_active(entity, false);
        }
        if self.completion_emitted {
            return;
        }
        self.completion_emitted = true;
        info!(sequence = %self.name, steps_completed = self.transitions.len(), "sequence_completed");
        cx.signals.emit(Signal::SequenceCompleted {
            sequence: self.name.clone(),
        });
    }
}
