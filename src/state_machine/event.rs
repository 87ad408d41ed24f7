//! Events that can occur in a conversation

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Session opened; produces the greeting
    SessionStarted,
    /// Free-text user turn
    UserMessage { text: String },
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }
}
