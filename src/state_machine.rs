//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
mod replies;
mod rules;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use replies::{Reply, ReplyKind};
pub use state::{ConvContext, ConvState};
pub use transition::{transition, TransitionError, TransitionResult};
