use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputAction {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
    Interact,
    ToggleTorch,
    ToggleScrewdriver,
    ToggleInjection,
    PrimaryUse,
    SecondaryUse,
    Sprint,
    Crouch,
    Pause,
}

const ACTION_COUNT: usize = 13;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveForward,
        InputAction::MoveBack,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Interact,
        InputAction::ToggleTorch,
        InputAction::ToggleScrewdriver,
        InputAction::ToggleInjection,
        InputAction::PrimaryUse,
        InputAction::SecondaryUse,
        InputAction::Sprint,
        InputAction::Crouch,
        InputAction::Pause,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBack => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Interact => 4,
            InputAction::ToggleTorch => 5,
            InputAction::ToggleScrewdriver => 6,
            InputAction::ToggleInjection => 7,
            InputAction::PrimaryUse => 8,
            InputAction::SecondaryUse => 9,
            InputAction::Sprint => 10,
            InputAction::Crouch => 11,
            InputAction::Pause => 12,
        }
    }

    /// Default physical binding, used for prompts and logs.
    pub const fn key_label(self) -> &'static str {
        match self {
            InputAction::MoveForward => "W",
            InputAction::MoveBack => "S",
            InputAction::MoveLeft => "A",
            InputAction::MoveRight => "D",
            InputAction::Interact => "E",
            InputAction::ToggleTorch => "F",
            InputAction::ToggleScrewdriver => "Q",
            InputAction::ToggleInjection => "X",
            InputAction::PrimaryUse => "Mouse0",
            InputAction::SecondaryUse => "Mouse1",
            InputAction::Sprint => "LeftShift",
            InputAction::Crouch => "LeftControl",
            InputAction::Pause => "Escape",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

/// Edge-triggered view of the input devices for one tick.
pub trait InputSource {
    fn key_pressed(&self, action: InputAction) -> bool;
    fn key_released(&self, action: InputAction) -> bool;
    fn is_down(&self, action: InputAction) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    quit_requested: bool,
    down: ActionStates,
    pressed: ActionStates,
    released: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.down.set(action, is_down);
        self
    }

    /// Marks the action as pressed this tick; a press also holds the action down.
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.pressed.set(action, true);
        self.down.set(action, true);
        self
    }

    pub fn with_action_released(mut self, action: InputAction) -> Self {
        self.released.set(action, true);
        self.down.set(action, false);
        self
    }

    pub fn any_pressed(&self) -> bool {
        InputAction::ALL
            .iter()
            .any(|action| self.pressed.is_down(*action))
    }
}

impl InputSource for InputSnapshot {
    fn key_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    fn key_released(&self, action: InputAction) -> bool {
        self.released.is_down(action)
    }

    fn is_down(&self, action: InputAction) -> bool {
        self.down.is_down(action)
    }
}

/// Feeds the headless loop one snapshot per simulation tick.
pub trait InputFeed {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Press,
    Release,
}

/// Replays key edges scheduled by tick index and turns them into edge-triggered
/// snapshots. Holding a key across ticks reports a single press edge.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    events: BTreeMap<u64, Vec<(InputAction, KeyEdge)>>,
    held: ActionStates,
    quit_at_tick: Option<u64>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(mut self, tick: u64, action: InputAction) -> Self {
        self.events
            .entry(tick)
            .or_default()
            .push((action, KeyEdge::Press));
        self
    }

    pub fn release(mut self, tick: u64, action: InputAction) -> Self {
        self.events
            .entry(tick)
            .or_default()
            .push((action, KeyEdge::Release));
        self
    }

    /// Press at `tick`, release `hold_ticks` later.
    pub fn tap(self, tick: u64, action: InputAction, hold_ticks: u64) -> Self {
        self.press(tick, action)
            .release(tick.saturating_add(hold_ticks.max(1)), action)
    }

    pub fn quit_at(mut self, tick: u64) -> Self {
        self.quit_at_tick = Some(tick);
        self
    }

    pub fn scheduled_event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn reset(&mut self) {
        self.held.clear();
    }
}

impl InputFeed for ScriptedInput {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot {
        let mut pressed = ActionStates::default();
        let mut released = ActionStates::default();

        if let Some(events) = self.events.get(&tick) {
            for (action, edge) in events {
                match edge {
                    KeyEdge::Press => {
                        if !self.held.is_down(*action) {
                            pressed.set(*action, true);
                        }
                        self.held.set(*action, true);
                    }
                    KeyEdge::Release => {
                        if self.held.is_down(*action) {
                            released.set(*action, true);
                        }
                        self.held.set(*action, false);
                    }
                }
            }
        }

        InputSnapshot {
            quit_requested: self.quit_at_tick.is_some_and(|quit| tick >= quit),
            down: self.held,
            pressed,
            released,
        }
    }
}
