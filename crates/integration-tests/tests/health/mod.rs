use indoc::indoc;
use integration_tests::TestServer;
use serde_json::Value;

#[tokio::test]
async fn reports_healthy_with_label() {
    let server = TestServer::builder()
        .build(indoc! {r#"
            [server.health]
            label = "relay-integration"
        "#})
        .await;

    let response = server.client.get("/health").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, { ".timestamp" => "[timestamp]" }, @r#"
    {
      "status": "healthy",
      "timestamp": "[timestamp]",
      "server": "relay-integration"
    }
    "#);
}

#[tokio::test]
async fn custom_path() {
    let server = TestServer::builder()
        .build(indoc! {r#"
            [server.health]
            path = "/status"
        "#})
        .await;

    assert_eq!(server.client.get("/status").await.status(), 200);
    assert_eq!(server.client.get("/health").await.status(), 404);
}

#[tokio::test]
async fn disabled() {
    let server = TestServer::builder()
        .build(indoc! {r#"
            [server.health]
            enabled = false
        "#})
        .await;

    let response = server.client.get("/health").await;

    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Route GET /health not found");
}
