use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::provider::ProviderError;

/// Gateway errors. Every variant maps to exactly one of 400, 404 or 500.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Malformed body or missing/invalid fields.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model discovery found nothing, neither for the default vendor nor for any vendor.
    #[error("No language models available. Make sure the model provider is reachable and offers at least one model.")]
    NoModelsAvailable,

    /// The underlying model call failed or was rejected.
    #[error("Provider error ({code}): {message}")]
    Provider { message: String, code: String },

    /// No route matches the method and path.
    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },

    /// Anything else that went wrong while handling the request.
    #[error("{0}")]
    InternalError(String),
}

impl LlmError {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NoModelsAvailable | Self::Provider { .. } | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The status phrase in lowercase with spaces replaced by underscores,
    /// e.g. `internal_server_error`.
    pub fn error_type(&self) -> String {
        error_type_for(self.status_code())
    }

    /// The error envelope returned to clients.
    pub fn envelope(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetails {
                r#type: self.error_type(),
                message: self.to_string(),
            },
        }
    }
}

impl From<ProviderError> for LlmError {
    fn from(error: ProviderError) -> Self {
        Self::Provider {
            message: error.message,
            code: error.code,
        }
    }
}

fn error_type_for(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_lowercase()
        .replace(' ', "_")
}

/// The only error shape the gateway ever returns.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    r#type: String,
    message: String,
}

impl IntoResponse for LlmError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            log::error!("Server error ({}): {}", status.as_u16(), self);
        } else {
            log::debug!("Client error ({}): {}", status.as_u16(), self);
        }

        (status, Json(self.envelope())).into_response()
    }
}
