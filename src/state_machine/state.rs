//! Conversation state types

use crate::tracking::TrackingLookup;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of consecutive unrecognized turns tolerated before handoff
pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 5;

/// Per-session conversation flags
///
/// The flags are independent: a user who asks about a lost package and then a
/// delayed one ends up with both `awaiting_*` flags set, which is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvState {
    /// A claim was offered; expecting an email and a description
    pub awaiting_claim_details: bool,
    /// Delay notifications were offered; expecting "yes" and an email
    pub awaiting_delay_opt_in: bool,
    /// Unrecognized turns since the last matched one
    pub consecutive_bad_inputs: u32,
    /// Conversation belongs to a human agent; the engine no longer answers
    pub agent_handoff_active: bool,
}

impl ConvState {
    /// Same flags with the bad-input streak cleared
    pub fn matched(&self) -> Self {
        Self {
            consecutive_bad_inputs: 0,
            ..self.clone()
        }
    }

    pub fn with_claim_pending(mut self, pending: bool) -> Self {
        self.awaiting_claim_details = pending;
        self
    }

    pub fn with_delay_opt_in_pending(mut self, pending: bool) -> Self {
        self.awaiting_delay_opt_in = pending;
        self
    }

    pub fn handed_off(mut self) -> Self {
        self.agent_handoff_active = true;
        self.consecutive_bad_inputs = 0;
        self
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Clone)]
pub struct ConvContext {
    pub session_id: String,
    pub tracking: Arc<dyn TrackingLookup>,
    /// Handoff happens once the bad-input streak exceeds this value
    pub escalation_threshold: u32,
}

impl ConvContext {
    pub fn new(session_id: impl Into<String>, tracking: Arc<dyn TrackingLookup>) -> Self {
        Self {
            session_id: session_id.into(),
            tracking,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
        }
    }

    pub fn with_escalation_threshold(mut self, threshold: u32) -> Self {
        self.escalation_threshold = threshold;
        self
    }
}

impl std::fmt::Debug for ConvContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvContext")
            .field("session_id", &self.session_id)
            .field("escalation_threshold", &self.escalation_threshold)
            .finish_non_exhaustive()
    }
}
