//! Trait abstractions for runtime side effects
//!
//! These traits enable testing the runtime with mock implementations.

use async_trait::async_trait;
use std::sync::Arc;

/// Files missing package claims
#[async_trait]
pub trait ClaimSubmitter: Send + Sync {
    /// Submit a claim whose body is the user's raw message; returns a confirmation
    async fn submit_claim(&self, session_id: &str, raw_text: &str) -> Result<String, String>;
}

/// Channel to human customer service agents
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Open the handoff for a session
    async fn connect_agent(&self, session_id: &str) -> Result<(), String>;

    /// Forward a user turn received after handoff
    async fn relay(&self, session_id: &str, text: &str) -> Result<(), String>;
}

/// Delay notification subscriptions
#[async_trait]
pub trait DelayNotifier: Send + Sync {
    async fn notify_on_delay_update(&self, session_id: &str, email: &str) -> Result<(), String>;
}

/// Combined side-effect trait for convenience
pub trait SideEffects: ClaimSubmitter + AgentConnector + DelayNotifier {}
impl<T: ClaimSubmitter + AgentConnector + DelayNotifier> SideEffects for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ClaimSubmitter + ?Sized> ClaimSubmitter for Arc<T> {
    async fn submit_claim(&self, session_id: &str, raw_text: &str) -> Result<String, String> {
        (**self).submit_claim(session_id, raw_text).await
    }
}

#[async_trait]
impl<T: AgentConnector + ?Sized> AgentConnector for Arc<T> {
    async fn connect_agent(&self, session_id: &str) -> Result<(), String> {
        (**self).connect_agent(session_id).await
    }

    async fn relay(&self, session_id: &str, text: &str) -> Result<(), String> {
        (**self).relay(session_id, text).await
    }
}

#[async_trait]
impl<T: DelayNotifier + ?Sized> DelayNotifier for Arc<T> {
    async fn notify_on_delay_update(&self, session_id: &str, email: &str) -> Result<(), String> {
        (**self).notify_on_delay_update(session_id, email).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

const CLAIM_CONFIRMATION: &str =
    "Your missing package claim has been submitted. We'll get back to you shortly.";

/// Side effects that only record what would have happened.
///
/// There is no claims backend, agent desk or mailer behind this service; the
/// actions are written to the log so operators can follow them.
#[derive(Debug, Clone, Default)]
pub struct LoggingSideEffects;

#[async_trait]
impl ClaimSubmitter for LoggingSideEffects {
    async fn submit_claim(&self, session_id: &str, raw_text: &str) -> Result<String, String> {
        tracing::info!(
            session_id = %session_id,
            claim = %raw_text,
            "Sending missing package claim"
        );
        Ok(CLAIM_CONFIRMATION.to_string())
    }
}

#[async_trait]
impl AgentConnector for LoggingSideEffects {
    async fn connect_agent(&self, session_id: &str) -> Result<(), String> {
        tracing::info!(session_id = %session_id, "Connecting to customer service agent");
        Ok(())
    }

    async fn relay(&self, session_id: &str, text: &str) -> Result<(), String> {
        tracing::info!(session_id = %session_id, text = %text, "Relaying message to agent");
        Ok(())
    }
}

#[async_trait]
impl DelayNotifier for LoggingSideEffects {
    async fn notify_on_delay_update(&self, session_id: &str, email: &str) -> Result<(), String> {
        tracing::info!(session_id = %session_id, email = %email, "Sending delay notification");
        Ok(())
    }
}
