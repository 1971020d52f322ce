//! Mock of an OpenAI-compatible upstream, for the `openai` provider.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use indoc::formatdoc;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Builder for the upstream mock.
pub struct OpenAIMock {
    models: Vec<String>,
    fragments: Vec<String>,
    error: Option<(StatusCode, String)>,
    malformed: bool,
}

/// A running upstream mock.
pub struct RunningOpenAIMock {
    pub address: SocketAddr,
    state: Arc<MockState>,
}

struct MockState {
    models: Vec<String>,
    fragments: Vec<String>,
    error: Option<(StatusCode, String)>,
    malformed: bool,
    last_request: Mutex<Option<(Option<String>, Value)>>,
}

impl Default for OpenAIMock {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIMock {
    pub fn new() -> Self {
        Self {
            models: vec!["gpt-4".to_string(), "gpt-4-turbo".to_string()],
            fragments: vec!["Hello".to_string(), " from".to_string(), " upstream".to_string()],
            error: None,
            malformed: false,
        }
    }

    pub fn with_fragments(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|fragment| fragment.to_string()).collect();
        self
    }

    /// Every completion is answered with this status and body.
    pub fn with_error(mut self, status: StatusCode, message: impl Into<String>) -> Self {
        self.error = Some((status, message.into()));
        self
    }

    /// A truncated, unparsable frame follows the first fragment.
    pub fn with_malformed_frame(mut self) -> Self {
        self.malformed = true;
        self
    }

    pub async fn spawn(self) -> RunningOpenAIMock {
        let state = Arc::new(MockState {
            models: self.models,
            fragments: self.fragments,
            error: self.error,
            malformed: self.malformed,
            last_request: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/models", get(list_models))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningOpenAIMock { address, state }
    }
}

impl RunningOpenAIMock {
    /// The `[llm.provider]` section pointing at this mock.
    pub fn config(&self) -> String {
        formatdoc! {r#"
            [llm.provider]
            type = "openai"
            vendor = "upstream"
            base_url = "http://{}/v1"
            api_key = "test-key"
        "#, self.address}
    }

    /// Authorization header and body of the last completion request.
    pub fn last_request(&self) -> Option<(Option<String>, Value)> {
        self.state.last_request.lock().unwrap().clone()
    }
}

async fn list_models(State(state): State<Arc<MockState>>) -> Json<Value> {
    let data: Vec<Value> = state
        .models
        .iter()
        .map(|id| json!({ "id": id, "object": "model", "created": 1700000000, "owned_by": "openai" }))
        .collect();

    Json(json!({ "object": "list", "data": data }))
}

async fn chat_completions(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    *state.last_request.lock().unwrap() = Some((authorization, body));

    if let Some((status, message)) = &state.error {
        return (*status, message.clone()).into_response();
    }

    let mut sse = String::new();

    for (i, fragment) in state.fragments.iter().enumerate() {
        let chunk = json!({
            "id": "chatcmpl-upstream",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4",
            "choices": [{ "index": 0, "delta": { "content": fragment }, "finish_reason": null }]
        });

        sse.push_str(&format!("data: {chunk}\n\n"));

        if i == 0 && state.malformed {
            sse.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\n\n");
        }
    }

    let last = json!({
        "id": "chatcmpl-upstream",
        "object": "chat.completion.chunk",
        "created": 1700000000,
        "model": "gpt-4",
        "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }]
    });

    sse.push_str(&format!("data: {last}\n\n"));
    sse.push_str("data: [DONE]\n\n");

    ([(axum::http::header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
}
