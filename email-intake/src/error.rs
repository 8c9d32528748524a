//! Intake error taxonomy and its mapping onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// Function key missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Body absent, not JSON, or not a JSON object
    #[error("Invalid JSON payload")]
    InvalidPayload,

    /// No storage connection string configured
    #[error("Storage connection not configured")]
    Configuration,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to serialize blob: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntakeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::Unauthorized => StatusCode::UNAUTHORIZED,
            IntakeError::InvalidPayload => StatusCode::BAD_REQUEST,
            IntakeError::Configuration
            | IntakeError::Storage(_)
            | IntakeError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            IntakeError::Storage(_) | IntakeError::Serialize(_) => {
                error!(error = %self, "email_intake_failed");
                (status, "Internal Server Error").into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
