use std::sync::Arc;

use integration_tests::{TestServer, llms::ScriptedProvider};
use server::ServerError;

#[tokio::test]
async fn second_start_is_refused() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    match server.server.start().await {
        Err(ServerError::AlreadyRunning(address)) => assert_eq!(address, server.address),
        other => unreachable!("expected AlreadyRunning, got {other:?}"),
    }

    assert_eq!(server.client.get("/health").await.status(), 200);
}

#[tokio::test]
async fn stop_closes_the_listener() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    assert_eq!(server.server.local_addr().await, Some(server.address));

    server.server.stop().await.unwrap();

    assert_eq!(server.server.local_addr().await, None);

    let result = reqwest::get(format!("http://{}/health", server.address)).await;
    assert!(result.is_err());

    // Stopping again does nothing.
    server.server.stop().await.unwrap();
}

#[tokio::test]
async fn restart_after_stop() {
    let server = TestServer::with_provider(Arc::new(ScriptedProvider::hi_there())).await;

    server.server.stop().await.unwrap();

    let address = server.server.start().await.unwrap();
    let response = reqwest::get(format!("http://{address}/v1/models")).await.unwrap();

    assert_eq!(response.status(), 200);
}
