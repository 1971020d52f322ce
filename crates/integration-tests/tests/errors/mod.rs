use std::sync::Arc;

use async_trait::async_trait;
use integration_tests::{
    TestServer,
    llms::{ScriptedProvider, Step},
};
use llm::provider::{ModelFilter, ModelHandle, ModelProvider, ProviderError, ProviderMessage, TextStream};
use reqwest::Method;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

struct PanickingProvider;

#[async_trait]
impl ModelProvider for PanickingProvider {
    async fn discover(&self, _: Option<&ModelFilter>) -> Result<Vec<ModelHandle>, ProviderError> {
        Ok(vec![ModelHandle::new("acme", "fast")])
    }

    #[allow(clippy::panic)]
    async fn invoke(
        &self,
        _: &ModelHandle,
        _: Vec<ProviderMessage>,
        _: CancellationToken,
    ) -> Result<TextStream, ProviderError> {
        panic!("provider exploded")
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

#[tokio::test]
async fn malformed_json() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    let response = server.client.post_raw("/v1/chat/completions", "{\"messages\": [").await;

    assert_eq!(response.status(), 400);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body: Value = response.json().await.unwrap();
    let message = body["error"]["message"].as_str().unwrap();

    assert_eq!(body["error"]["type"], "bad_request");
    assert!(message.starts_with("Invalid request: "), "{message}");
}

#[tokio::test]
async fn empty_body() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    let response = server.client.post_raw("/v1/chat/completions", "").await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn invalid_messages() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    let bodies = [
        json!({}),
        json!({ "messages": "Hello" }),
        json!({ "messages": [] }),
        json!({ "messages": [{ "role": "tool", "content": "Hello" }] }),
        json!({ "messages": [{ "role": "user" }] }),
    ];

    for body in bodies {
        let response = server.client.post("/v1/chat/completions", &body).await;
        assert_eq!(response.status(), 400, "{body}");

        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error"]["type"], "bad_request", "{body}");
    }
}

#[tokio::test]
async fn empty_messages_envelope() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    let body: Value = server
        .client
        .post("/v1/chat/completions", &json!({ "messages": [] }))
        .await
        .json()
        .await
        .unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "type": "bad_request",
        "message": "Invalid request: messages must not be empty"
      }
    }
    "#);
}

#[tokio::test]
async fn unknown_route() {
    let server = TestServer::builder().build("").await;

    let response = server.client.request(Method::PUT, "/v1/completions").send().await.unwrap();

    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "type": "not_found",
        "message": "Route PUT /v1/completions not found"
      }
    }
    "#);
}

#[tokio::test]
async fn wrong_method_on_known_route() {
    let server = TestServer::builder().build("").await;

    let response = server.client.get("/v1/chat/completions").await;

    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Route GET /v1/chat/completions not found");
}

#[tokio::test]
async fn provider_failure() {
    let provider = ScriptedProvider::hi_there().with_invoke_error("rate limited upstream", "Throttled");
    let server = TestServer::with_provider(Arc::new(provider)).await;

    let response = server
        .client
        .post("/v1/chat/completions", &json!({ "messages": [{ "role": "user", "content": "Hi" }] }))
        .await;

    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "type": "internal_server_error",
        "message": "Provider error (Throttled): rate limited upstream"
      }
    }
    "#);
}

#[tokio::test]
async fn failure_during_buffered_generation() {
    let provider = ScriptedProvider::new(
        &[("acme", "fast")],
        vec![
            Step::Fragment("Hi "),
            Step::Fail("stream broke"),
        ],
    );

    let server = TestServer::with_provider(Arc::new(provider)).await;

    let response = server
        .client
        .post("/v1/chat/completions", &json!({ "messages": [{ "role": "user", "content": "Hi" }] }))
        .await;

    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Provider error (ScriptFailure): stream broke");
}

#[tokio::test]
async fn handler_panic_is_an_internal_error() {
    let server = TestServer::with_provider(Arc::new(PanickingProvider)).await;

    let response = server
        .client
        .post("/v1/chat/completions", &json!({ "messages": [{ "role": "user", "content": "Hi" }] }))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "type": "internal_server_error",
        "message": "provider exploded"
      }
    }
    "#);

    let health = server.client.get("/health").await;
    assert_eq!(health.status(), 200);
}
