//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! reply, state and effects. The only collaborator it touches is the
//! read-only tracking lookup.

use super::replies::Reply;
use super::rules::{self, TurnInput};
use super::{ConvContext, ConvState, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub reply: Reply,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState, reply: Reply) -> Self {
        Self {
            new_state: state,
            reply,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Conversation has been handed off to an agent")]
    HandoffActive,
    #[error("No rule matched the message")]
    NoRuleMatched,
}

/// Pure transition function
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::SessionStarted => Ok(TransitionResult::new(state.clone(), Reply::welcome())),

        // Handed-off turns belong to the agent channel, not to us
        Event::UserMessage { .. } if state.agent_handoff_active => {
            Err(TransitionError::HandoffActive)
        }

        Event::UserMessage { text } => {
            let input = TurnInput::new(state, context, &text);
            let (rule, result) = rules::evaluate(&input).ok_or(TransitionError::NoRuleMatched)?;
            tracing::debug!(
                session_id = %context.session_id,
                rule = rule.name,
                reply = ?result.reply.kind,
                effects = result.effects.len(),
                "Rule matched"
            );
            Ok(result)
        }
    }
}
