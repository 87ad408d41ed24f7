//! Effects produced by state transitions

/// Fire-and-forget side effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// File a missing package claim with the user's message as the claim body
    SubmitClaim { raw_text: String },

    /// Hand the conversation to a human agent
    ConnectAgent,

    /// Subscribe an address to updates on a delayed package
    NotifyOnDelayUpdate { email: String },
}

impl Effect {
    pub fn submit_claim(raw_text: impl Into<String>) -> Self {
        Effect::SubmitClaim {
            raw_text: raw_text.into(),
        }
    }

    pub fn notify_on_delay_update(email: impl Into<String>) -> Self {
        Effect::NotifyOnDelayUpdate {
            email: email.into(),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SubmitClaim { .. } => "submit_claim",
            Effect::ConnectAgent => "connect_agent",
            Effect::NotifyOnDelayUpdate { .. } => "notify_on_delay_update",
        }
    }
}
