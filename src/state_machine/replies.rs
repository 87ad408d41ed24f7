//! Canned assistant replies

use crate::tracking::TrackingRecord;
use serde::Serialize;

const UNKNOWN_DATE: &str = "Unknown Date";
const UNKNOWN_VALUE: &str = "Unknown";
const DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Which branch produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Welcome,
    Escalation,
    TrackingNotFound,
    InTransit,
    Delayed,
    Lost,
    Delivered,
    UnknownStatus,
    AgentTransfer,
    ClaimPrompt,
    ClaimSubmitted,
    Help,
    DelayOptIn,
    Fallback,
}

/// Assistant reply for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

impl Reply {
    fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn welcome() -> Self {
        Self::new(
            ReplyKind::Welcome,
            "Hello! I'm your friendly neighborhood package tracking assistant, here to help you track a lost package. To get started, please provide your tracking number.",
        )
    }

    pub fn escalation() -> Self {
        Self::new(
            ReplyKind::Escalation,
            "I'm unable to understand your requests. Transferring you to a customer service agent.",
        )
    }

    pub fn tracking_not_found(tracking_number: &str) -> Self {
        Self::new(
            ReplyKind::TrackingNotFound,
            format!("I couldn't find any information for tracking number {tracking_number}. Please verify the number and try again."),
        )
    }

    pub fn in_transit(tracking_number: &str, record: &TrackingRecord) -> Self {
        Self::new(
            ReplyKind::InTransit,
            format!(
                "I found your package with tracking number {tracking_number}! It's currently in transit at {}. Expected delivery is in {}. Is there anything else you'd like to know about your package?",
                or_unknown(record.location.as_deref()),
                or_unknown(record.eta.as_deref()),
            ),
        )
    }

    pub fn delayed(tracking_number: &str, record: &TrackingRecord) -> Self {
        Self::new(
            ReplyKind::Delayed,
            format!(
                "I found your package with tracking number {tracking_number}. Unfortunately, it's currently delayed at {} due to {}. The new estimated delivery is in {}. Would you like me to notify you when there's an update? If so, respond with \"yes\" and your email address.",
                or_unknown(record.location.as_deref()),
                or_unknown(record.reason.as_deref()),
                or_unknown(record.eta.as_deref()),
            ),
        )
    }

    pub fn lost(tracking_number: &str, record: &TrackingRecord) -> Self {
        let last_update = record.last_update.map_or_else(
            || UNKNOWN_DATE.to_string(),
            |dt| dt.format(DATE_FORMAT).to_string(),
        );
        Self::new(
            ReplyKind::Lost,
            format!(
                "I'm sorry, but it appears that your package with tracking number {tracking_number} may be lost. It was last seen at {} on {last_update}. Would you like to file a missing package claim?",
                or_unknown(record.last_seen.as_deref()),
            ),
        )
    }

    pub fn delivered() -> Self {
        Self::new(
            ReplyKind::Delivered,
            "It looks like your package has already been marked as delivered. Your delivery driver may have left the package out of view. Please check your mailbox, porch, or with your neighbors. If you still can't find it, please let me know and I can help you file a claim.",
        )
    }

    pub fn unknown_status(tracking_number: &str) -> Self {
        Self::new(
            ReplyKind::UnknownStatus,
            format!("Error: Unknown status for tracking number {tracking_number}. Please contact customer support for further assistance."),
        )
    }

    pub fn agent_transfer() -> Self {
        Self::new(
            ReplyKind::AgentTransfer,
            "I'd be happy to connect you with a customer service representative. Please hold while I transfer you to the next available agent.",
        )
    }

    pub fn claim_prompt() -> Self {
        Self::new(
            ReplyKind::ClaimPrompt,
            "To file a missing package claim, I'll need some additional information. Please provide your email address and a brief description of the package contents.",
        )
    }

    pub fn claim_submitted() -> Self {
        Self::new(
            ReplyKind::ClaimSubmitted,
            "Your missing package claim has been submitted. We'll get back to you shortly.",
        )
    }

    pub fn help() -> Self {
        Self::new(
            ReplyKind::Help,
            "I can help you track your lost package. Please provide your tracking number (format: TRK123456789)",
        )
    }

    pub fn delay_opt_in() -> Self {
        Self::new(
            ReplyKind::DelayOptIn,
            "You've just signed up for notification updates. We'll let you know when there's an update on your package's status.",
        )
    }

    pub fn fallback() -> Self {
        Self::new(
            ReplyKind::Fallback,
            "I'm not sure I understand. To help you track your package, please provide your tracking number (format: TRK123456789).",
        )
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or(UNKNOWN_VALUE)
}
