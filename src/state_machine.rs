//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the transition function never performs I/O, it only returns effects for
//! the runtime to execute and feed back as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, InboundMessage, MediaAttachment};
pub use state::{ConvContext, ConvState, MediaKind};
pub use transition::{transition, TransitionError};
