//! Responses for requests that never reach a handler.

use std::any::Any;

use axum::response::{IntoResponse, Response};
use http::{Method, Uri};
use llm::LlmError;

/// Any path or method without a route.
pub(crate) async fn not_found(method: Method, uri: Uri) -> LlmError {
    LlmError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

/// Turns a handler panic into a 500 error envelope.
pub(crate) fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "Internal server error".to_string()
    };

    LlmError::InternalError(message).into_response()
}
