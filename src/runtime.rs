//! Runtime for executing chat sessions
//!
//! Each session runs in its own task, consuming an event queue, so at most
//! one reply is being computed per session at any time. A session that sees
//! no user message for `idle_timeout` stops and is forgotten.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{SessionRuntime, PROCESSING_ERROR, WELCOME_TURN_ID};
pub use traits::*;

use crate::state_machine::state::DEFAULT_ESCALATION_THRESHOLD;
use crate::state_machine::{ConvContext, ConvState, Event};
use crate::tracking::TrackingLookup;
use crate::transcript::{Transcript, Turn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = SessionRuntime<dyn SideEffects>;

/// Timing and escalation knobs shared by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Pause before each assistant reply
    pub reply_delay: Duration,
    /// Upper bound on a single side-effect call
    pub effect_timeout: Duration,
    pub escalation_threshold: u32,
    /// A session with no user message for this long is shut down
    pub idle_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(1000),
            effect_timeout: Duration::from_millis(5000),
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Session data shared between the runtime task and API readers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConvState,
    pub transcript: Transcript,
    /// Notice from the last failed reply, cleared by the next submission
    pub last_error: Option<String>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        snapshot: SessionSnapshot,
        pending: bool,
    },
    Message {
        turn: Turn,
    },
    StateChange {
        state: ConvState,
    },
    ReplyDone,
    Error {
        message: String,
    },
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
    pending: Arc<AtomicBool>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl SessionHandle {
    /// True while a user message is waiting for its reply
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.broadcast_tx.subscribe()
    }

    /// False once the runtime task has stopped
    pub fn is_live(&self) -> bool {
        !self.event_tx.is_closed()
    }
}

/// Reasons a user message is not accepted
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Session not found")]
    NotFound,
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("A reply is still pending for this session")]
    ReplyPending,
    #[error("Session has stopped")]
    Closed,
}

/// Manager for all session runtimes
pub struct SessionManager {
    tracking: Arc<dyn TrackingLookup>,
    effects: Arc<dyn SideEffects>,
    settings: RuntimeSettings,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        tracking: Arc<dyn TrackingLookup>,
        effects: Arc<dyn SideEffects>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            tracking,
            effects,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new session; the returned handle already holds the welcome turn
    pub async fn create_session(&self) -> (String, SessionHandle) {
        self.evict_stopped().await;

        let session_id = uuid::Uuid::new_v4().to_string();
        let context = ConvContext::new(&session_id, Arc::clone(&self.tracking))
            .with_escalation_threshold(self.settings.escalation_threshold);

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let pending = Arc::new(AtomicBool::new(false));
        let snapshot = Arc::new(RwLock::new(SessionSnapshot::default()));

        let mut runtime: ProductionRuntime = SessionRuntime::new(
            context,
            Arc::clone(&self.effects),
            self.settings,
            event_rx,
            broadcast_tx.clone(),
            Arc::clone(&pending),
            Arc::clone(&snapshot),
        );
        runtime.greet().await;

        let id = session_id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %id, "Session runtime finished");
        });

        let handle = SessionHandle {
            event_tx,
            broadcast_tx,
            pending,
            snapshot,
        };
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), handle.clone());

        tracing::info!(session_id = %session_id, "Session created");
        (session_id, handle)
    }

    /// Look up a running session. Sessions whose runtime went idle are gone.
    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .filter(|handle| handle.is_live())
            .cloned()
    }

    /// Queue a user message. Only one message may await its reply at a time.
    pub async fn submit(&self, session_id: &str, text: &str) -> Result<(), SubmitError> {
        let handle = self.get(session_id).await.ok_or(SubmitError::NotFound)?;
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }

        if handle
            .pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmitError::ReplyPending);
        }
        handle.snapshot.write().await.last_error = None;

        if handle
            .event_tx
            .send(Event::user_message(text))
            .await
            .is_err()
        {
            handle.pending.store(false, Ordering::SeqCst);
            return Err(SubmitError::Closed);
        }
        Ok(())
    }

    /// Forget a session. Its runtime stops once the last sender is gone.
    pub async fn end(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::info!(session_id = %session_id, "Session ended");
        }
        removed
    }

    /// Drop handles of runtimes that stopped on their own
    async fn evict_stopped(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| handle.is_live());
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle sessions");
        }
    }
}
