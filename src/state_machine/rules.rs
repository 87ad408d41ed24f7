//! Ordered rule table for user turns
//!
//! Rules are evaluated top to bottom and the first one whose guard holds
//! produces the turn's result. The order is the contract: escalation beats
//! tracking numbers, tracking numbers beat every keyword, and the keyword
//! rules keep their listed precedence.

use super::replies::Reply;
use super::transition::TransitionResult;
use super::{ConvContext, ConvState, Effect};
use crate::extract::{contains_any, extract_email, extract_tracking_number};
use crate::tracking::KnownStatus;

const AGENT_KEYWORDS: &[&str] = &["person", "human", "agent", "support"];
const CLAIM_KEYWORDS: &[&str] = &["claim", "yes"];
const HELP_KEYWORDS: &[&str] = &["help", "lost package"];
const CONSENT_KEYWORDS: &[&str] = &["yes"];

/// Signals extracted once per turn and shared by every rule
pub(crate) struct TurnInput<'a> {
    pub state: &'a ConvState,
    pub context: &'a ConvContext,
    pub text: &'a str,
    pub tracking_number: Option<String>,
    /// Empty when no address was found
    pub email: String,
}

impl<'a> TurnInput<'a> {
    pub fn new(state: &'a ConvState, context: &'a ConvContext, text: &'a str) -> Self {
        Self {
            state,
            context,
            text,
            tracking_number: extract_tracking_number(text),
            email: extract_email(text),
        }
    }

    fn has_email(&self) -> bool {
        !self.email.is_empty()
    }
}

/// A guarded rule: `applies` selects, `apply` builds the result
pub(crate) struct Rule {
    pub name: &'static str,
    pub applies: fn(&TurnInput<'_>) -> bool,
    pub apply: fn(&TurnInput<'_>) -> TransitionResult,
}

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "escalate",
        applies: escalation_due,
        apply: escalate,
    },
    Rule {
        name: "tracking_number",
        applies: has_tracking_number,
        apply: tracking_reply,
    },
    Rule {
        name: "request_agent",
        applies: asks_for_agent,
        apply: connect_agent,
    },
    Rule {
        name: "claim_prompt",
        applies: wants_to_claim,
        apply: prompt_for_claim,
    },
    Rule {
        name: "claim_submission",
        applies: submits_claim,
        apply: submit_claim,
    },
    Rule {
        name: "help",
        applies: asks_for_help,
        apply: help,
    },
    Rule {
        name: "delay_opt_in",
        applies: opts_into_delay_updates,
        apply: opt_into_delay_updates,
    },
    Rule {
        name: "fallback",
        applies: always,
        apply: fallback,
    },
];

/// First matching rule and its result
pub(crate) fn evaluate(input: &TurnInput<'_>) -> Option<(&'static Rule, TransitionResult)> {
    RULES
        .iter()
        .find(|rule| (rule.applies)(input))
        .map(|rule| (rule, (rule.apply)(input)))
}

// ============================================================================
// Guards
// ============================================================================

fn escalation_due(input: &TurnInput<'_>) -> bool {
    input.state.consecutive_bad_inputs > input.context.escalation_threshold
}

fn has_tracking_number(input: &TurnInput<'_>) -> bool {
    input.tracking_number.is_some()
}

fn asks_for_agent(input: &TurnInput<'_>) -> bool {
    contains_any(input.text, AGENT_KEYWORDS)
}

/// A turn that already carries an email is a submission, not a request for the prompt
fn wants_to_claim(input: &TurnInput<'_>) -> bool {
    contains_any(input.text, CLAIM_KEYWORDS)
        && input.state.awaiting_claim_details
        && !input.has_email()
}

fn submits_claim(input: &TurnInput<'_>) -> bool {
    input.has_email() && input.state.awaiting_claim_details
}

fn asks_for_help(input: &TurnInput<'_>) -> bool {
    contains_any(input.text, HELP_KEYWORDS)
}

fn opts_into_delay_updates(input: &TurnInput<'_>) -> bool {
    contains_any(input.text, CONSENT_KEYWORDS)
        && input.has_email()
        && input.state.awaiting_delay_opt_in
}

fn always(_input: &TurnInput<'_>) -> bool {
    true
}

// ============================================================================
// Actions
// ============================================================================

fn escalate(input: &TurnInput<'_>) -> TransitionResult {
    TransitionResult::new(input.state.clone().handed_off(), Reply::escalation())
        .with_effect(Effect::ConnectAgent)
}

fn tracking_reply(input: &TurnInput<'_>) -> TransitionResult {
    let state = input.state.matched();
    let Some(tracking_number) = input.tracking_number.as_deref() else {
        return fallback(input);
    };

    let Some(record) = input.context.tracking.lookup(tracking_number) else {
        return TransitionResult::new(state, Reply::tracking_not_found(tracking_number));
    };

    match record.known_status(tracking_number) {
        Ok(KnownStatus::InTransit) => {
            TransitionResult::new(state, Reply::in_transit(tracking_number, &record))
        }
        Ok(KnownStatus::Delayed) => TransitionResult::new(
            state.with_delay_opt_in_pending(true),
            Reply::delayed(tracking_number, &record),
        ),
        Ok(KnownStatus::Lost) => TransitionResult::new(
            state.with_claim_pending(true),
            Reply::lost(tracking_number, &record),
        ),
        Ok(KnownStatus::Delivered) => {
            TransitionResult::new(state.with_claim_pending(true), Reply::delivered())
        }
        Err(e) => {
            tracing::warn!(
                session_id = %input.context.session_id,
                error = %e,
                "Tracking record failed integrity check"
            );
            TransitionResult::new(state, Reply::unknown_status(tracking_number))
        }
    }
}

fn connect_agent(input: &TurnInput<'_>) -> TransitionResult {
    TransitionResult::new(input.state.clone().handed_off(), Reply::agent_transfer())
        .with_effect(Effect::ConnectAgent)
}

fn prompt_for_claim(input: &TurnInput<'_>) -> TransitionResult {
    TransitionResult::new(input.state.matched(), Reply::claim_prompt())
}

fn submit_claim(input: &TurnInput<'_>) -> TransitionResult {
    TransitionResult::new(
        input.state.matched().with_claim_pending(false),
        Reply::claim_submitted(),
    )
    .with_effect(Effect::submit_claim(input.text))
}

fn help(input: &TurnInput<'_>) -> TransitionResult {
    TransitionResult::new(input.state.matched(), Reply::help())
}

fn opt_into_delay_updates(input: &TurnInput<'_>) -> TransitionResult {
    TransitionResult::new(
        input.state.matched().with_delay_opt_in_pending(false),
        Reply::delay_opt_in(),
    )
    .with_effect(Effect::notify_on_delay_update(input.email.clone()))
}

/// Unrecognized turn. Crossing the threshold escalates in the same turn.
fn fallback(input: &TurnInput<'_>) -> TransitionResult {
    let bad_inputs = input.state.consecutive_bad_inputs.saturating_add(1);
    if bad_inputs > input.context.escalation_threshold {
        return escalate(input);
    }
    TransitionResult::new(
        ConvState {
            consecutive_bad_inputs: bad_inputs,
            ..input.state.clone()
        },
        Reply::fallback(),
    )
}
