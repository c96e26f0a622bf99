//! Gameplay layer: the session scene plus the systems it steps each tick.
//!
//! Per-tick order inside `GameSession::update`: pause, player movement,
//! equipment, interaction, triggers, dialogue, sequencers, AI, capture and
//! scene transition. Signals emitted earlier in the tick are visible to the
//! systems that run after them.

pub(crate) mod ai;
pub(crate) mod camera_zone;
pub(crate) mod capture;
pub(crate) mod checkpoint;
pub(crate) mod dialogue;
pub(crate) mod effects;
pub(crate) mod equip;
pub(crate) mod interaction;
pub(crate) mod inventory;
pub(crate) mod layout;
pub(crate) mod pause;
pub(crate) mod player;
pub(crate) mod report;
pub(crate) mod sequencer;
pub(crate) mod session;
pub(crate) mod tools;
pub(crate) mod transition;

#[cfg(test)]
mod tests;
