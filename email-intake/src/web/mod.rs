//! Web server module for the email intake endpoint.
//!
//! Routes:
//! - `POST /email_intake`: land a webhook payload and its summary in blob storage
//! - `GET /health`: liveness check

pub mod auth;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::storage::BlobStore;

pub use auth::{is_key_verification_enabled, verify_function_key};
pub use handlers::{email_intake, health, AppState, HealthResponse};

/// Build the application router.
pub fn router<S: BlobStore>(state: AppState<S>) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/email_intake", post(email_intake::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
