//! Server-Sent Events framing of streamed completions.

use std::convert::Infallible;

use axum::{
    http::{HeaderValue, header::CONNECTION},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use futures::StreamExt;

use crate::{error::LlmError, translator::ChatCompletionStream};

/// Write every chunk as one `data:` event as soon as it is produced, then `data: [DONE]`.
///
/// When the provider fails mid-stream, one last event carrying the error envelope is written
/// and the stream closes without a terminal chunk and without `[DONE]`.
pub(crate) fn chunks_to_sse(stream: ChatCompletionStream) -> Response {
    let events = futures::stream::unfold(Some(stream), |state| async move {
        let mut stream = state?;

        let event = match stream.next().await {
            Some(Ok(chunk)) => match serde_json::to_string(&chunk) {
                Ok(json) => Event::default().data(json),
                Err(e) => {
                    let error = LlmError::InternalError(format!("Failed to serialize chunk: {e}"));
                    return Some((error_event(&error), None));
                }
            },
            Some(Err(error)) => return Some((error_event(&error), None)),
            None => return Some((Ok(Event::default().data("[DONE]")), None)),
        };

        Some((Ok(event), Some(stream)))
    });

    let mut response = Sse::new(events).into_response();

    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    response
}

fn error_event(error: &LlmError) -> Result<Event, Infallible> {
    log::error!("Stream aborted: {error}");

    let data = serde_json::to_string(&error.envelope())
        .unwrap_or_else(|_| r#"{"error":{"type":"internal_server_error","message":"stream aborted"}}"#.to_string());

    Ok(Event::default().data(data))
}
