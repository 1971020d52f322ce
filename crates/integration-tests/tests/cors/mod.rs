use std::sync::Arc;

use indoc::indoc;
use integration_tests::{TestServer, llms::ScriptedProvider};
use reqwest::Method;
use serde_json::json;

#[tokio::test]
async fn preflight_on_any_path() {
    let server = TestServer::builder().build("").await;

    for path in ["/v1/chat/completions", "/v1/models", "/not/a/route"] {
        let response = server.client.request(Method::OPTIONS, path).send().await.unwrap();

        assert_eq!(response.status(), 200, "{path}");

        let headers = response.headers().clone();

        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type, Authorization");
        assert!(response.bytes().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn configured_values() {
    let server = TestServer::builder()
        .build(indoc! {r#"
            [server.cors]
            allow_origin = "https://app.example.com"
            allow_methods = ["POST"]
            allow_headers = ["Content-Type", "X-Request-Id"]
        "#})
        .await;

    let response = server.client.get("/v1/models").await;
    let headers = response.headers();

    assert_eq!(headers["access-control-allow-origin"], "https://app.example.com");
    assert_eq!(headers["access-control-allow-methods"], "POST");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type, X-Request-Id");
}

#[tokio::test]
async fn headers_on_every_response() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    let ok = server
        .client
        .post("/v1/chat/completions", &json!({ "messages": [{ "role": "user", "content": "Hi" }] }))
        .await;

    let streamed = server
        .client
        .post(
            "/v1/chat/completions",
            &json!({ "stream": true, "messages": [{ "role": "user", "content": "Hi" }] }),
        )
        .await;

    let bad_request = server.client.post_raw("/v1/chat/completions", "{").await;
    let not_found = server.client.get("/nowhere").await;

    for response in [ok, streamed, bad_request, not_found] {
        assert_eq!(response.headers()["access-control-allow-origin"], "*", "{}", response.status());
    }
}

#[tokio::test]
async fn headers_on_internal_errors() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::new(&[], Vec::new()))).await;

    let response = server.client.get("/v1/models").await;

    assert_eq!(response.status(), 500);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
