//! HTTP and storage errors.

use std::path::{Path, PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Failures of the project store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file exists but is not a valid store.
    #[error("Corrupt store snapshot '{path}': {message}")]
    Corrupt {
        /// Snapshot path.
        path: PathBuf,
        /// Parse error.
        message: String,
    },

    /// Reading or writing the snapshot failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the snapshot failed.
    #[error("Store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a `Corrupt` error.
    #[must_use]
    pub fn corrupt(path: &Path, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

/// Error type for API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was malformed or failed validation.
    #[error("{0}")]
    BadRequest(String),
    /// No caller identity was supplied.
    #[error("Authentication required")]
    Unauthorized,
    /// The resource does not exist or belongs to someone else.
    #[error("{0}")]
    NotFound(String),
    /// Something failed on our side.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Creates a `BadRequest` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// The 404 used for owner-scoped project routes.
    #[must_use]
    pub fn project_not_found() -> Self {
        Self::NotFound("Project not found or access denied".to_string())
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "Store operation failed");
        Self::Internal("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
