use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use super::scene::EntityId;

/// Who started a dialogue run. Carried on its completion signal so a
/// listener only reacts to the runs it asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DialogueOwner {
    Sequence(String),
    Zone(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Interacted { entity: EntityId },
    PickedUp { entity: EntityId },
    StairUsed { entity: EntityId },
    DialogueComplete { owner: DialogueOwner },
    SequenceStepCompleted { sequence: String, step_id: String },
    SequenceCompleted { sequence: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SignalKind {
    Interacted,
    PickedUp,
    StairUsed,
    DialogueComplete,
    SequenceStepCompleted,
    SequenceCompleted,
}

const SIGNAL_KIND_COUNT: usize = 6;

impl SignalKind {
    pub const ALL: [SignalKind; SIGNAL_KIND_COUNT] = [
        SignalKind::Interacted,
        SignalKind::PickedUp,
        SignalKind::StairUsed,
        SignalKind::DialogueComplete,
        SignalKind::SequenceStepCompleted,
        SignalKind::SequenceCompleted,
    ];

    const fn index(self) -> usize {
        match self {
            SignalKind::Interacted => 0,
            SignalKind::PickedUp => 1,
            SignalKind::StairUsed => 2,
            SignalKind::DialogueComplete => 3,
            SignalKind::SequenceStepCompleted => 4,
            SignalKind::SequenceCompleted => 5,
        }
    }
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Interacted { .. } => SignalKind::Interacted,
            Self::PickedUp { .. } => SignalKind::PickedUp,
            Self::StairUsed { .. } => SignalKind::StairUsed,
            Self::DialogueComplete { .. } => SignalKind::DialogueComplete,
            Self::SequenceStepCompleted { .. } => SignalKind::SequenceStepCompleted,
            Self::SequenceCompleted { .. } => SignalKind::SequenceCompleted,
        }
    }

    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Interacted { entity } | Self::PickedUp { entity } | Self::StairUsed { entity } => {
                Some(*entity)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalCounts {
    pub total: u32,
    pub interacted: u32,
    pub picked_up: u32,
    pub stair_used: u32,
    pub dialogue_complete: u32,
    pub sequence_step_completed: u32,
    pub sequence_completed: u32,
}

impl SignalCounts {
    fn record(&mut self, kind: SignalKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            SignalKind::Interacted => self.interacted = self.interacted.saturating_add(1),
            SignalKind::PickedUp => self.picked_up = self.picked_up.saturating_add(1),
            SignalKind::StairUsed => self.stair_used = self.stair_used.saturating_add(1),
            SignalKind::DialogueComplete => {
                self.dialogue_complete = self.dialogue_complete.saturating_add(1)
            }
            SignalKind::SequenceStepCompleted => {
                self.sequence_step_completed = self.sequence_step_completed.saturating_add(1)
            }
            SignalKind::SequenceCompleted => {
                self.sequence_completed = self.sequence_completed.saturating_add(1)
            }
        }
    }

    fn merge(&mut self, other: SignalCounts) {
        self.total = self.total.saturating_add(other.total);
        self.interacted = self.interacted.saturating_add(other.interacted);
        self.picked_up = self.picked_up.saturating_add(other.picked_up);
        self.stair_used = self.stair_used.saturating_add(other.stair_used);
        self.dialogue_complete = self.dialogue_complete.saturating_add(other.dialogue_complete);
        self.sequence_step_completed = self
            .sequence_step_completed
            .saturating_add(other.sequence_step_completed);
        self.sequence_completed = self
            .sequence_completed
            .saturating_add(other.sequence_completed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalKindSet {
    kinds: [bool; SIGNAL_KIND_COUNT],
}

impl SignalKindSet {
    pub fn of(kinds: &[SignalKind]) -> Self {
        let mut set = Self::default();
        for kind in kinds {
            set.kinds[kind.index()] = true;
        }
        set
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        self.kinds[kind.index()]
    }
}

/// Handle returned by `SignalBus::subscribe`. Not `Clone`: a mailbox has one
/// reader, and giving the handle back through `unsubscribe` closes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct Mailbox {
    subscriber_id: u64,
    kinds: SignalKindSet,
    queue: VecDeque<Signal>,
}

/// Typed publish/subscribe channel. Every subscriber owns a mailbox and sees
/// each emission of its subscribed kinds exactly once, in emission order.
#[derive(Debug, Default)]
pub struct SignalBus {
    next_subscriber_id: u64,
    mailboxes: Vec<Mailbox>,
    current_tick_counts: SignalCounts,
    last_tick_counts: SignalCounts,
    lifetime_counts: SignalCounts,
}

impl SignalBus {
    pub fn subscribe(&mut self, kinds: &[SignalKind]) -> Subscription {
        let id = self.next_subscriber_id;
        self.next_subscriber_id = self.next_subscriber_id.saturating_add(1);
        self.mailboxes.push(Mailbox {
            subscriber_id: id,
            kinds: SignalKindSet::of(kinds),
            queue: VecDeque::new(),
        });
        debug!(subscriber_id = id, kinds = ?kinds, "signal_subscribed");
        Subscription { id }
    }

    /// Drops the mailbox and anything still queued in it.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.mailboxes.len();
        self.mailboxes
            .retain(|mailbox| mailbox.subscriber_id != subscription.id);
        let removed = self.mailboxes.len() != before;
        debug!(subscriber_id = subscription.id, removed, "signal_unsubscribed");
        removed
    }

    pub fn emit(&mut self, signal: Signal) {
        let kind = signal.kind();
        self.current_tick_counts.record(kind);
        for mailbox in &mut self.mailboxes {
            if mailbox.kinds.contains(kind) {
                mailbox.queue.push_back(signal.clone());
            }
        }
    }

    pub fn drain(&mut self, subscription: &Subscription) -> Vec<Signal> {
        self.mailboxes
            .iter_mut()
            .find(|mailbox| mailbox.subscriber_id == subscription.id)
            .map(|mailbox| mailbox.queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn pending_count(&self, subscription: &Subscription) -> usize {
        self.mailboxes
            .iter()
            .find(|mailbox| mailbox.subscriber_id == subscription.id)
            .map_or(0, |mailbox| mailbox.queue.len())
    }

    pub fn subscriber_count(&self) -> usize {
        self.mailboxes.len()
    }

    pub fn finish_tick_rollover(&mut self) {
        self.last_tick_counts = self.current_tick_counts;
        self.lifetime_counts.merge(self.current_tick_counts);
        self.current_tick_counts = SignalCounts::default();
    }

    pub fn last_tick_counts(&self) -> SignalCounts {
        self.last_tick_counts
    }

    /// Counts for every completed tick plus the one in progress.
    pub fn lifetime_counts(&self) -> SignalCounts {
        let mut counts = self.lifetime_counts;
        counts.merge(self.current_tick_counts);
        counts
    }
}
