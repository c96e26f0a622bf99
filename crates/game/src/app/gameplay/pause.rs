use engine::{InputAction, InputSource};
use tracing::info;

pub(crate) const PAUSE_ACTION: InputAction = InputAction::Pause;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PauseState {
    paused: bool,
    toggles: u32,
}

impl PauseState {
    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn toggles(&self) -> u32 {
        self.toggles
    }

    /// Polls the pause key. Returns whether the session is paused afterwards.
    pub(crate) fn poll(&mut self, input: &dyn InputSource) -> bool {
        if input.key_pressed(PAUSE_ACTION) {
            self.paused = !self.paused;
            self.toggles = self.toggles.saturating_add(1);
            if self.paused {
                info!("game_paused");
            } else {
                info!("game_resumed");
            }
        }
        self.paused
    }
}
