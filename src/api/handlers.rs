//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, SessionCreatedResponse, SessionResponse,
    SuccessResponse,
};
use super::AppState;
use crate::runtime::{SseEvent, SubmitError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/end", post(end_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/chat", post(send_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let (session_id, handle) = state.sessions.create_session().await;
    let snapshot = handle.snapshot().await;

    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id,
            turns: snapshot.transcript.into_turns(),
        }),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;
    let snapshot = handle.snapshot().await;

    Ok(Json(SessionResponse {
        session_id: id,
        state: snapshot.state,
        turns: snapshot.transcript.into_turns(),
        pending: handle.is_pending(),
        last_error: snapshot.last_error,
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.sessions.end(&id).await {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;

    // Subscribe before reading the snapshot so nothing falls in between
    let broadcast_rx = handle.subscribe();
    let init_event = SseEvent::Init {
        snapshot: handle.snapshot().await,
        pending: handle.is_pending(),
    };

    Ok(sse_stream(init_event, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    state.sessions.submit(&id, &req.text).await?;
    Ok(Json(ChatResponse { queued: true }))
}

async fn get_version() -> &'static str {
    concat!("parcel-desk ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        let message = err.to_string();
        match err {
            SubmitError::NotFound => AppError::NotFound(message),
            SubmitError::EmptyMessage => AppError::BadRequest(message),
            SubmitError::ReplyPending => AppError::Conflict(message),
            SubmitError::Closed => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
