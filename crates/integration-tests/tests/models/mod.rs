use std::sync::Arc;

use integration_tests::{TestServer, llms::ScriptedProvider};
use indoc::indoc;
use serde_json::Value;

#[tokio::test]
async fn lists_discovered_models() {
    let provider = ScriptedProvider::new(&[("acme", "fast"), ("acme", "smart")], Vec::new());

    let server = TestServer::builder()
        .provider(Arc::new(provider))
        .build(indoc! {r#"
            [llm]
            default_vendor = "acme"
            owned_by = "acme-labs"
        "#})
        .await;

    let response = server.client.get("/v1/models").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, {
        ".data[].created" => "[created]",
    }, @r#"
    {
      "object": "list",
      "data": [
        {
          "id": "acme-fast",
          "object": "model",
          "created": "[created]",
          "owned_by": "acme-labs"
        },
        {
          "id": "acme-smart",
          "object": "model",
          "created": "[created]",
          "owned_by": "acme-labs"
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn other_vendor_is_used_when_default_has_no_models() {
    let provider = ScriptedProvider::new(&[("other", "large")], Vec::new());
    let server = TestServer::with_provider(Arc::new(provider)).await;

    let body: Value = server.client.get("/v1/models").await.json().await.unwrap();

    assert_eq!(body["data"][0]["id"], "other-large");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn echo_provider_models_by_default() {
    let server = TestServer::builder()
        .build(indoc! {r#"
            [llm.provider]
            type = "echo"
            vendor = "relay"
            families = ["echo", "parrot"]
        "#})
        .await;

    let body: Value = server.client.get("/v1/models").await.json().await.unwrap();

    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|model| model["id"].as_str().unwrap())
        .collect();

    assert_eq!(ids, vec!["relay-echo", "relay-parrot"]);
}

#[tokio::test]
async fn no_models_is_an_internal_error() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::new(&[], Vec::new()))).await;

    let response = server.client.get("/v1/models").await;

    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "type": "internal_server_error",
        "message": "No language models available. Make sure the model provider is reachable and offers at least one model."
      }
    }
    "#);
}
