//! Honey-pot session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{
    HoneyPotSession, Message, MessageRole, Phase, SessionState, SessionStats, SessionStatus,
};
pub use transition::{transition, TransitionError};
