//! OpenAI-compatible chat completion gateway in front of a pluggable model provider.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Json, State, rejection::BytesRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use config::LlmConfig;

mod error;
pub mod messages;
pub mod provider;
mod registry;
mod server;
mod sse;
mod token_counter;
mod translator;

pub use error::{ErrorResponse, LlmError};
pub use registry::ModelRegistry;
pub use translator::{ChatCompletionStream, CompletionTranslator};

use messages::ChatCompletionRequest;
use provider::ModelProvider;
use server::LlmServer;

pub(crate) type Result<T> = std::result::Result<T, LlmError>;

/// Creates an axum router for the chat completion and model listing endpoints.
///
/// Models are discovered before the router is returned. A failed discovery is logged and
/// retried by the first request that needs a model. Request bodies are not size limited.
pub async fn router(config: &LlmConfig, provider: Arc<dyn ModelProvider>) -> Router {
    let server = LlmServer::new(config, provider);
    server.initialize().await;

    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .layer(DefaultBodyLimit::disable())
        .with_state(server)
}

/// Handle chat completion requests.
///
/// The body is read in full before parsing. With `stream: true` the reply is sent as
/// Server-Sent Events, otherwise as one JSON document.
async fn chat_completions(
    State(server): State<LlmServer>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    let body = body.map_err(|e| LlmError::InvalidRequest(e.body_text()))?;

    let request: ChatCompletionRequest =
        serde_json::from_slice(&body).map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

    if request.messages.is_empty() {
        return Err(LlmError::InvalidRequest("messages must not be empty".to_string()));
    }

    log::info!(
        "Chat completion requested for model {}",
        request.model.as_deref().unwrap_or("<default>")
    );
    log::debug!("Request has {} messages", request.messages.len());
    log::debug!("Streaming: {}", request.is_streaming());

    if request.is_streaming() {
        let stream = server.completions_stream(request).await?;

        log::debug!("Returning streaming response");
        Ok(sse::chunks_to_sse(stream))
    } else {
        let response = server.completions(request).await?;

        log::debug!(
            "Chat completion successful, returning {} characters",
            response.choices[0].message.content.len()
        );

        Ok(Json(response).into_response())
    }
}

/// Handle list models requests.
async fn list_models(State(server): State<LlmServer>) -> Result<impl IntoResponse> {
    let response = server.list_models().await?;

    log::debug!("Returning {} models", response.data.len());
    Ok(Json(response))
}
