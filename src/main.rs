//! Parcel Desk - package tracking support chat
//!
//! A Rust backend implementing a rule-driven conversation state machine
//! that answers shipment questions and hands off to human agents.

mod api;
mod config;
mod extract;
mod runtime;
mod state_machine;
mod tracking;
mod transcript;

use api::{create_router, AppState};
use config::AppConfig;
use runtime::{LoggingSideEffects, SessionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracking::InMemoryTrackingStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel_desk=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "Loaded configuration");

    // Tracking data
    let store = match &config.tracking_db {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading tracking data");
            InMemoryTrackingStore::from_json_file(path).map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Failed to load tracking data");
                e
            })?
        }
        None => InMemoryTrackingStore::seeded(),
    };
    tracing::info!(records = store.len(), "Tracking store ready");

    // Create application state
    let sessions = SessionManager::new(
        Arc::new(store),
        Arc::new(LoggingSideEffects),
        config.runtime_settings(),
    );
    let state = AppState::new(Arc::new(sessions));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Parcel Desk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
