//! HTTP endpoint handlers.
//!
//! The intake handler runs the whole request inline:
//! 1. Verify the function key (if configured)
//! 2. Parse the JSON body
//! 3. Check that storage is configured
//! 4. Write the raw payload and the summary
//! 5. Return both blob paths

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::error::IntakeError;
use crate::intake::{ingest_email, IntakePayload, IntakeReceipt};
use crate::storage::BlobStore;
use crate::web::auth::{is_key_verification_enabled, presented_key, verify_function_key};
use crate::Config;

/// Shared application state.
///
/// `store` is `None` when no connection string is configured; intake requests
/// then fail with 500 while health checks keep answering.
pub struct AppState<S> {
    pub config: Arc<Config>,
    pub store: Option<Arc<S>>,
}

impl<S> AppState<S> {
    pub fn new(config: Config, store: Option<S>) -> Self {
        Self {
            config: Arc::new(config),
            store: store.map(Arc::new),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: self.store.clone(),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Email Intake
// =============================================================================

/// Email intake endpoint.
pub async fn email_intake<S: BlobStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    info!(body_length = body.len(), "email_intake_started");

    match handle_intake(&state, &headers, query.as_deref(), &body).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_intake<S: BlobStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<IntakeReceipt, IntakeError> {
    if is_key_verification_enabled(&state.config.function_key) {
        let expected = state.config.function_key.as_deref().unwrap_or_default();
        let presented = presented_key(headers, query);
        if !verify_function_key(expected, presented.as_deref()) {
            return Err(IntakeError::Unauthorized);
        }
    }

    let payload = IntakePayload::from_slice(body).map_err(|e| {
        error!(body_length = body.len(), "request_body_not_valid_json");
        e
    })?;

    info!(
        internet_message_id = ?payload.internet_message_id(),
        subject = payload.subject().unwrap_or_default(),
        "email_received"
    );

    let store = state.store.as_deref().ok_or_else(|| {
        error!("blob_connection_string_not_set");
        IntakeError::Configuration
    })?;

    let receipt = ingest_email(store, &payload).await?;

    info!(
        raw_blob_path = %receipt.raw_blob_path,
        summary_blob_path = %receipt.summary_blob_path,
        "email_intake_complete"
    );

    Ok(receipt)
}
