//! API request and response types

use crate::state_machine::ConvState;
use crate::transcript::Turn;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for a newly created session
#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// Response with a session's transcript and state
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: ConvState,
    pub turns: Vec<Turn>,
    pub pending: bool,
    /// Notice from the last failed reply, if the user has not written since
    pub last_error: Option<String>,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
