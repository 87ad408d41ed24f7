//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{RuntimeSettings, SessionRuntime, SessionSnapshot, SseEvent};
use crate::state_machine::{ConvContext, ConvState, Event};
use crate::tracking::{InMemoryTrackingStore, TrackingLookup, TrackingRecord};
use crate::transcript::Turn;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};

// ============================================================================
// Mock Side Effects
// ============================================================================

/// A single port invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    SubmitClaim { raw_text: String },
    ConnectAgent,
    Relay { text: String },
    NotifyOnDelayUpdate { email: String },
}

/// Side effects that remember every call
#[derive(Default)]
pub struct MockSideEffects {
    calls: Mutex<Vec<RecordedCall>>,
    /// Calls that ran to completion, success or failure
    finished: AtomicUsize,
    latency: Option<Duration>,
    failure: Option<String>,
}

#[allow(dead_code)]
impl MockSideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Every call sleeps before answering
    pub fn slow(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn finished_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::ConnectAgent))
            .count()
    }

    async fn observe(&self, call: RecordedCall) -> Result<(), String> {
        self.calls.lock().unwrap().push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClaimSubmitter for MockSideEffects {
    async fn submit_claim(&self, _session_id: &str, raw_text: &str) -> Result<String, String> {
        self.observe(RecordedCall::SubmitClaim {
            raw_text: raw_text.to_string(),
        })
        .await?;
        Ok("claim received".to_string())
    }
}

#[async_trait]
impl AgentConnector for MockSideEffects {
    async fn connect_agent(&self, _session_id: &str) -> Result<(), String> {
        self.observe(RecordedCall::ConnectAgent).await
    }

    async fn relay(&self, _session_id: &str, text: &str) -> Result<(), String> {
        self.observe(RecordedCall::Relay {
            text: text.to_string(),
        })
        .await
    }
}

#[async_trait]
impl DelayNotifier for MockSideEffects {
    async fn notify_on_delay_update(&self, _session_id: &str, email: &str) -> Result<(), String> {
        self.observe(RecordedCall::NotifyOnDelayUpdate {
            email: email.to_string(),
        })
        .await
    }
}

// ============================================================================
// Faulty Tracking Lookup
// ============================================================================

/// Lookup that blows up, for exercising reply failure recovery
pub struct PanickingLookup;

impl TrackingLookup for PanickingLookup {
    fn lookup(&self, _tracking_number: &str) -> Option<TrackingRecord> {
        panic!("tracking backend unavailable")
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

pub struct TestRuntime {
    pub effects: Arc<MockSideEffects>,
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<SseEvent>,
    pub pending: Arc<AtomicBool>,
    pub snapshot: Arc<RwLock<SessionSnapshot>>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

pub struct TestRuntimeBuilder {
    session_id: String,
    tracking: Arc<dyn TrackingLookup>,
    effects: Option<MockSideEffects>,
    settings: RuntimeSettings,
}

#[allow(dead_code)]
impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            session_id: "test-session".to_string(),
            tracking: Arc::new(InMemoryTrackingStore::seeded()),
            effects: None,
            settings: RuntimeSettings {
                reply_delay: Duration::ZERO,
                effect_timeout: Duration::from_secs(1),
                ..RuntimeSettings::default()
            },
        }
    }

    pub fn tracking(mut self, tracking: Arc<dyn TrackingLookup>) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn effects(mut self, effects: MockSideEffects) -> Self {
        self.effects = Some(effects);
        self
    }

    pub fn effect_timeout(mut self, timeout: Duration) -> Self {
        self.settings.effect_timeout = timeout;
        self
    }

    pub fn escalation_threshold(mut self, threshold: u32) -> Self {
        self.settings.escalation_threshold = threshold;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.settings.idle_timeout = timeout;
        self
    }

    pub fn build(self) -> TestRuntime {
        let effects = Arc::new(self.effects.unwrap_or_default());
        let context = ConvContext::new(&self.session_id, self.tracking)
            .with_escalation_threshold(self.settings.escalation_threshold);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);
        let pending = Arc::new(AtomicBool::new(false));
        let snapshot = Arc::new(RwLock::new(SessionSnapshot::default()));

        let mut runtime = SessionRuntime::new(
            context,
            effects.clone(),
            self.settings,
            event_rx,
            broadcast_tx,
            pending.clone(),
            snapshot.clone(),
        );

        let handle = tokio::spawn(async move {
            runtime.greet().await;
            runtime.run().await;
        });

        TestRuntime {
            effects,
            event_tx,
            broadcast_rx,
            pending,
            snapshot,
            _runtime_handle: handle,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl TestRuntime {
    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }

    /// Send a user message the way the session manager does
    pub async fn send_message(&self, text: &str) {
        self.pending.store(true, Ordering::SeqCst);
        self.event_tx
            .send(Event::user_message(text))
            .await
            .expect("Failed to send message");
    }

    /// Send a message and wait for its reply to be recorded
    pub async fn exchange(&mut self, text: &str) {
        self.send_message(text).await;
        assert!(
            self.wait_for_done(Duration::from_secs(2)).await,
            "no reply for {text:?}"
        );
    }

    /// Wait for `ReplyDone` event with timeout
    pub async fn wait_for_done(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(SseEvent::ReplyDone)) => return true,
                _ => continue,
            }
        }
        false
    }

    /// Wait for an `Error` event and return its message
    pub async fn wait_for_error(&mut self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(SseEvent::Error { message })) => return Some(message),
                _ => continue,
            }
        }
        None
    }

    /// Effects run on their own tasks, so poll until `count` calls were seen
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.effects.recorded_calls().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.effects.recorded_calls().len() >= count
    }

    pub async fn turns(&self) -> Vec<Turn> {
        self.snapshot.read().await.transcript.turns().to_vec()
    }

    pub async fn state(&self) -> ConvState {
        self.snapshot.read().await.state.clone()
    }

    pub async fn last_turn(&self) -> Turn {
        self.turns().await.pop().expect("transcript is empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{SessionManager, SubmitError, PROCESSING_ERROR, WELCOME_TURN_ID};
    use crate::transcript::Role;

    #[tokio::test]
    async fn test_mock_side_effects_record_calls() {
        let mock = MockSideEffects::new();
        mock.connect_agent("s").await.unwrap();
        mock.relay("s", "hi").await.unwrap();
        assert_eq!(
            mock.recorded_calls(),
            vec![
                RecordedCall::ConnectAgent,
                RecordedCall::Relay {
                    text: "hi".to_string()
                }
            ]
        );

        let failing = MockSideEffects::failing("down");
        assert_eq!(failing.connect_agent("s").await, Err("down".to_string()));
        assert_eq!(failing.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_welcome_then_numbered_turns() {
        let mut rt = TestRuntime::builder().build();
        rt.exchange("help").await;

        let turns = rt.turns().await;
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].id, WELCOME_TURN_ID);
        assert_eq!(turns[0].role, Role::Assistant);
        assert_eq!(turns[1].id, "user-1");
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].content, "help");
        assert_eq!(turns[2].id, "assistant-1");
        assert_eq!(turns[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_repeated_session_start_is_ignored() {
        let mut rt = TestRuntime::builder().build();
        rt.event_tx.send(Event::SessionStarted).await.unwrap();
        rt.exchange("help").await;

        let turns = rt.turns().await;
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].id, WELCOME_TURN_ID);
        assert_eq!(turns[1].id, "user-1");
        assert_eq!(rt.state().await, ConvState::default());
    }

    #[tokio::test]
    async fn test_tracking_lookup_reply() {
        let mut rt = TestRuntime::builder().build();
        rt.exchange("Where is TRK123456789").await;

        let reply = rt.last_turn().await;
        assert!(reply.content.contains("Chicago Distribution Center"));
        assert!(rt.effects.recorded_calls().is_empty());
        assert!(!rt.pending.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_claim_receives_raw_text() {
        let mut rt = TestRuntime::builder().build();
        rt.exchange("TRK555555555").await;
        assert!(rt.state().await.awaiting_claim_details);

        let text = "Yes, my email is Pat@Example.com, it had 3 books";
        rt.exchange(text).await;
        assert!(rt.wait_for_calls(1, Duration::from_secs(1)).await);

        assert_eq!(
            rt.effects.recorded_calls(),
            vec![RecordedCall::SubmitClaim {
                raw_text: text.to_string()
            }]
        );
        assert!(!rt.state().await.awaiting_claim_details);
        assert_eq!(
            rt.last_turn().await.content,
            "Your missing package claim has been submitted. We'll get back to you shortly."
        );
    }

    #[tokio::test]
    async fn test_delay_opt_in_notifies_email() {
        let mut rt = TestRuntime::builder().build();
        rt.exchange("TRK987654321").await;
        rt.exchange("yes please, bob@example.com").await;
        assert!(rt.wait_for_calls(1, Duration::from_secs(1)).await);

        assert_eq!(
            rt.effects.recorded_calls(),
            vec![RecordedCall::NotifyOnDelayUpdate {
                email: "bob@example.com".to_string()
            }]
        );
        assert!(!rt.state().await.awaiting_delay_opt_in);
    }

    #[tokio::test]
    async fn test_handoff_relays_later_turns() {
        let mut rt = TestRuntime::builder().build();
        rt.exchange("I need a human").await;
        rt.exchange("hello?").await;
        assert!(rt.wait_for_calls(2, Duration::from_secs(1)).await);

        assert_eq!(
            rt.effects.recorded_calls(),
            vec![
                RecordedCall::ConnectAgent,
                RecordedCall::Relay {
                    text: "hello?".to_string()
                }
            ]
        );

        // The relayed turn is recorded without an assistant reply
        let turns = rt.turns().await;
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[3].role, Role::User);
        assert!(rt.state().await.agent_handoff_active);
    }

    #[tokio::test]
    async fn test_bad_input_streak_connects_agent_once() {
        let mut rt = TestRuntime::builder().build();
        for _ in 0..5 {
            rt.exchange("asdf").await;
        }
        assert_eq!(rt.effects.connect_count(), 0);
        assert_eq!(rt.state().await.consecutive_bad_inputs, 5);

        rt.exchange("asdf").await;
        assert!(rt.wait_for_calls(1, Duration::from_secs(1)).await);
        assert_eq!(rt.effects.connect_count(), 1);
        assert!(rt.state().await.agent_handoff_active);

        // Now relayed rather than counted
        rt.exchange("asdf").await;
        assert!(rt.wait_for_calls(2, Duration::from_secs(1)).await);
        assert_eq!(rt.effects.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_effect_does_not_fail_turn() {
        let mut rt = TestRuntime::builder()
            .effects(MockSideEffects::failing("claims backend down"))
            .build();
        rt.exchange("TRK555555555").await;
        rt.exchange("a@b.com, it was a lamp").await;

        assert!(rt.wait_for_calls(1, Duration::from_secs(1)).await);
        assert_eq!(rt.effects.recorded_calls().len(), 1);
        assert_eq!(
            rt.last_turn().await.content,
            "Your missing package claim has been submitted. We'll get back to you shortly."
        );
    }

    #[tokio::test]
    async fn test_slow_effect_is_cut_off() {
        let mut rt = TestRuntime::builder()
            .effects(MockSideEffects::slow(Duration::from_secs(30)))
            .effect_timeout(Duration::from_millis(20))
            .build();

        rt.send_message("agent please").await;
        assert!(rt.wait_for_done(Duration::from_secs(2)).await);
        assert!(rt.wait_for_calls(1, Duration::from_secs(1)).await);
        assert!(!rt.pending.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rt.effects.connect_count(), 1);
        assert_eq!(rt.effects.finished_count(), 0);
    }

    #[tokio::test]
    async fn test_reply_done_before_slow_effect_finishes() {
        let mut rt = TestRuntime::builder()
            .effects(MockSideEffects::slow(Duration::from_millis(800)))
            .effect_timeout(Duration::from_secs(5))
            .build();

        let started = tokio::time::Instant::now();
        rt.send_message("agent please").await;
        assert!(rt.wait_for_done(Duration::from_secs(2)).await);
        assert!(started.elapsed() < Duration::from_millis(500));

        // The agent connection is still in flight, yet the session takes input
        assert!(!rt.pending.load(Ordering::SeqCst));
        assert_eq!(rt.turns().await.len(), 3);
        assert!(rt.wait_for_calls(1, Duration::from_secs(1)).await);
        assert_eq!(rt.effects.finished_count(), 0);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(rt.effects.finished_count(), 1);
    }

    #[tokio::test]
    async fn test_engine_failure_keeps_session_usable() {
        let mut rt = TestRuntime::builder()
            .tracking(Arc::new(PanickingLookup))
            .build();

        rt.send_message("TRK123456789").await;
        let error = rt.wait_for_error(Duration::from_secs(2)).await;
        assert_eq!(error.as_deref(), Some(PROCESSING_ERROR));
        assert!(rt.wait_for_done(Duration::from_secs(2)).await);
        assert!(!rt.pending.load(Ordering::SeqCst));
        assert_eq!(
            rt.snapshot.read().await.last_error.as_deref(),
            Some(PROCESSING_ERROR)
        );

        // Only the user turn was recorded for the failed exchange
        assert_eq!(rt.turns().await.len(), 2);

        rt.exchange("help").await;
        assert!(rt.last_turn().await.content.contains("TRK123456789"));
    }

    #[tokio::test]
    async fn test_custom_escalation_threshold() {
        let mut rt = TestRuntime::builder().escalation_threshold(1).build();
        rt.exchange("???").await;
        assert_eq!(rt.effects.connect_count(), 0);
        rt.exchange("???").await;
        assert!(rt.wait_for_calls(1, Duration::from_secs(1)).await);
        assert_eq!(rt.effects.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_idle_runtime_stops() {
        let rt = TestRuntime::builder()
            .idle_timeout(Duration::from_millis(50))
            .build();
        assert!(!rt.event_tx.is_closed());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rt.event_tx.is_closed());
        assert!(rt.event_tx.send(Event::user_message("hi")).await.is_err());
        assert_eq!(rt.turns().await.len(), 1);
    }

    fn manager_with(
        tracking: Arc<dyn TrackingLookup>,
        settings: RuntimeSettings,
    ) -> SessionManager {
        SessionManager::new(tracking, Arc::new(MockSideEffects::new()), settings)
    }

    fn manager(reply_delay: Duration) -> SessionManager {
        manager_with(
            Arc::new(InMemoryTrackingStore::seeded()),
            RuntimeSettings {
                reply_delay,
                ..RuntimeSettings::default()
            },
        )
    }

    async fn wait_for_reply_done(rx: &mut broadcast::Receiver<SseEvent>) -> bool {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                if let Ok(SseEvent::ReplyDone) = rx.recv().await {
                    break;
                }
            }
        })
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn test_manager_creates_greeted_session() {
        let manager = manager(Duration::ZERO);
        let (id, handle) = manager.create_session().await;

        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.transcript.len(), 1);
        assert_eq!(snapshot.transcript.turns()[0].id, WELCOME_TURN_ID);
        assert_eq!(snapshot.state, ConvState::default());
        assert!(snapshot.last_error.is_none());
        assert!(manager.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_manager_rejects_bad_submissions() {
        let manager = manager(Duration::ZERO);
        let (id, _) = manager.create_session().await;

        assert_eq!(
            manager.submit("missing", "hi").await,
            Err(SubmitError::NotFound)
        );
        assert_eq!(
            manager.submit(&id, "   ").await,
            Err(SubmitError::EmptyMessage)
        );
    }

    #[tokio::test]
    async fn test_manager_rejects_second_message_while_pending() {
        let manager = manager(Duration::from_millis(300));
        let (id, handle) = manager.create_session().await;
        let mut rx = handle.subscribe();

        manager.submit(&id, "help").await.unwrap();
        assert!(handle.is_pending());
        assert_eq!(
            manager.submit(&id, "help again").await,
            Err(SubmitError::ReplyPending)
        );

        assert!(wait_for_reply_done(&mut rx).await);
        assert!(!handle.is_pending());
        assert_eq!(handle.snapshot().await.transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_manager_clears_last_error_on_next_submit() {
        let manager = manager_with(
            Arc::new(PanickingLookup),
            RuntimeSettings {
                reply_delay: Duration::ZERO,
                ..RuntimeSettings::default()
            },
        );
        let (id, handle) = manager.create_session().await;
        let mut rx = handle.subscribe();

        manager.submit(&id, "TRK123456789").await.unwrap();
        assert!(wait_for_reply_done(&mut rx).await);
        assert_eq!(
            handle.snapshot().await.last_error.as_deref(),
            Some(PROCESSING_ERROR)
        );

        manager.submit(&id, "help").await.unwrap();
        assert!(handle.snapshot().await.last_error.is_none());
        assert!(wait_for_reply_done(&mut rx).await);
        assert!(handle.snapshot().await.last_error.is_none());
    }

    #[tokio::test]
    async fn test_manager_forgets_idle_sessions() {
        let manager = manager_with(
            Arc::new(InMemoryTrackingStore::seeded()),
            RuntimeSettings {
                reply_delay: Duration::ZERO,
                idle_timeout: Duration::from_millis(50),
                ..RuntimeSettings::default()
            },
        );
        let (id, handle) = manager.create_session().await;
        assert!(manager.get(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!handle.is_live());
        assert!(manager.get(&id).await.is_none());
        assert_eq!(
            manager.submit(&id, "hi").await,
            Err(SubmitError::NotFound)
        );

        // Creating another session sweeps the stopped one out
        let (other, _) = manager.create_session().await;
        assert!(!manager.end(&id).await);
        assert!(manager.end(&other).await);
    }

    #[tokio::test]
    async fn test_manager_end_forgets_session() {
        let manager = manager(Duration::ZERO);
        let (id, _) = manager.create_session().await;

        assert!(manager.end(&id).await);
        assert!(!manager.end(&id).await);
        assert_eq!(
            manager.submit(&id, "hi").await,
            Err(SubmitError::NotFound)
        );
    }
}
