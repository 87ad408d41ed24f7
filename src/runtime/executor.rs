//! Session runtime executor

use super::traits::SideEffects;
use super::{RuntimeSettings, SessionSnapshot, SseEvent};

use crate::state_machine::{transition, ConvContext, ConvState, Effect, Event, TransitionResult};
use crate::transcript::Turn;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Shown to the user when a reply could not be computed
pub const PROCESSING_ERROR: &str =
    "There was a problem processing your request. Please try again.";

/// Id of the greeting turn that opens every transcript
pub const WELCOME_TURN_ID: &str = "welcome";

/// Generic session runtime that can work with any side-effect implementation
pub struct SessionRuntime<E>
where
    E: SideEffects + ?Sized + 'static,
{
    context: ConvContext,
    state: ConvState,
    effects: Arc<E>,
    settings: RuntimeSettings,
    event_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    /// Set by the submitter, cleared here once the reply is recorded
    pending: Arc<AtomicBool>,
    /// Transcript, state and last error, readable outside the task
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl<E> SessionRuntime<E>
where
    E: SideEffects + ?Sized + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: ConvContext,
        effects: Arc<E>,
        settings: RuntimeSettings,
        event_rx: mpsc::Receiver<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        pending: Arc<AtomicBool>,
        snapshot: Arc<RwLock<SessionSnapshot>>,
    ) -> Self {
        Self {
            context,
            state: ConvState::default(),
            effects,
            settings,
            event_rx,
            broadcast_tx,
            pending,
            snapshot,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        loop {
            let event =
                match tokio::time::timeout(self.settings.idle_timeout, self.event_rx.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(_) => {
                        tracing::info!(
                            session_id = %self.context.session_id,
                            idle_secs = self.settings.idle_timeout.as_secs(),
                            "Session idle, shutting down"
                        );
                        // Refuse new messages; anything already queued is still answered
                        self.event_rx.close();
                        continue;
                    }
                };
            self.process_event(event).await;
        }

        let turns = self.snapshot.read().await.transcript.len();
        tracing::info!(
            session_id = %self.context.session_id,
            turns = turns,
            "Session runtime stopped"
        );
    }

    /// Record the welcome turn
    pub async fn greet(&mut self) {
        match self.compute(Event::SessionStarted).await {
            Ok(result) => {
                self.record(Turn::assistant(WELCOME_TURN_ID, result.reply.text))
                    .await;
            }
            Err(e) => {
                tracing::error!(
                    session_id = %self.context.session_id,
                    error = %e,
                    "Failed to greet"
                );
            }
        }
    }

    async fn process_event(&mut self, event: Event) {
        match event {
            Event::SessionStarted => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    "Ignoring repeated session start"
                );
            }
            Event::UserMessage { text } => {
                self.handle_user_message(text).await;
                self.pending.store(false, Ordering::SeqCst);
                let _ = self.broadcast_tx.send(SseEvent::ReplyDone);
            }
        }
    }

    async fn handle_user_message(&mut self, text: String) {
        let (user_turn_id, reply_turn_id) = self.snapshot.read().await.transcript.next_turn_ids();
        self.record(Turn::user(user_turn_id, text.as_str())).await;

        // After handoff the agent answers, not us
        if self.state.agent_handoff_active {
            self.relay(text);
            return;
        }

        if !self.settings.reply_delay.is_zero() {
            tokio::time::sleep(self.settings.reply_delay).await;
        }

        let result = match self.compute(Event::UserMessage { text }).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    session_id = %self.context.session_id,
                    error = %e,
                    "Failed to compute reply"
                );
                self.snapshot.write().await.last_error = Some(PROCESSING_ERROR.to_string());
                let _ = self.broadcast_tx.send(SseEvent::Error {
                    message: PROCESSING_ERROR.to_string(),
                });
                return;
            }
        };

        let TransitionResult {
            new_state,
            reply,
            effects,
        } = result;

        if new_state != self.state {
            self.state = new_state;
            self.snapshot.write().await.state = self.state.clone();
            let _ = self.broadcast_tx.send(SseEvent::StateChange {
                state: self.state.clone(),
            });
        }

        self.record(Turn::assistant(reply_turn_id, reply.text)).await;

        for effect in effects {
            self.dispatch(effect);
        }
    }

    /// Run the engine off the event loop. A panic surfaces as a join error.
    async fn compute(&self, event: Event) -> Result<TransitionResult, String> {
        let state = self.state.clone();
        let context = self.context.clone();
        tokio::task::spawn_blocking(move || transition(&state, &context, event))
            .await
            .map_err(|e| format!("Reply computation aborted: {e}"))?
            .map_err(|e| e.to_string())
    }

    async fn record(&mut self, turn: Turn) {
        self.snapshot.write().await.transcript.append(turn.clone());
        let _ = self.broadcast_tx.send(SseEvent::Message { turn });
    }

    /// Fire an effect on its own task. It never holds up or fails the turn.
    fn dispatch(&self, effect: Effect) {
        let effects = Arc::clone(&self.effects);
        let session_id = self.context.session_id.clone();
        let limit = self.settings.effect_timeout;

        tokio::spawn(async move {
            let name = effect.name();
            let outcome = match effect {
                Effect::SubmitClaim { raw_text } => {
                    bounded(limit, effects.submit_claim(&session_id, &raw_text))
                        .await
                        .map(|confirmation| {
                            tracing::debug!(
                                session_id = %session_id,
                                confirmation = %confirmation,
                                "Claim acknowledged"
                            );
                        })
                }
                Effect::ConnectAgent => bounded(limit, effects.connect_agent(&session_id)).await,
                Effect::NotifyOnDelayUpdate { email } => {
                    bounded(limit, effects.notify_on_delay_update(&session_id, &email)).await
                }
            };

            match outcome {
                Ok(()) => {
                    tracing::debug!(session_id = %session_id, effect = name, "Effect completed");
                }
                Err(e) => tracing::warn!(
                    session_id = %session_id,
                    effect = name,
                    error = %e,
                    "Effect failed"
                ),
            }
        });
    }

    fn relay(&self, text: String) {
        let effects = Arc::clone(&self.effects);
        let session_id = self.context.session_id.clone();
        let limit = self.settings.effect_timeout;

        tokio::spawn(async move {
            if let Err(e) = bounded(limit, effects.relay(&session_id, &text)).await {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to relay message to agent"
                );
            }
        });
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, String>>,
) -> Result<T, String> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(format!("Timed out after {}ms", limit.as_millis())))
}
