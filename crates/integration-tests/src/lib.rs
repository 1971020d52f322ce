//! Harness running the real gateway on an ephemeral port.

pub mod llms;

use std::{net::SocketAddr, sync::Arc};

use config::Config;
use llm::provider::ModelProvider;
use server::{ServeConfig, Server};

/// Test client for making HTTP requests to the test server
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a POST request to the given path with a raw body
    pub async fn post_raw(&self, path: &str, body: &'static str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    /// Build a request with any method
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }
}

/// Builder for [`TestServer`].
#[derive(Default)]
pub struct TestServerBuilder {
    provider: Option<Arc<dyn ModelProvider>>,
}

impl TestServerBuilder {
    /// Serve completions from this provider instead of the configured one.
    pub fn provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Start the gateway with the given TOML configuration.
    pub async fn build(self, config_toml: &str) -> TestServer {
        let config: Config = toml::from_str(config_toml).unwrap();
        config.validate().unwrap();

        let server = Server::new(ServeConfig {
            listen_address: "127.0.0.1:0".parse().unwrap(),
            config,
            provider: self.provider,
        });

        let address = server.start().await.unwrap();

        TestServer {
            client: TestClient::new(format!("http://{address}")),
            address,
            server,
        }
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    pub server: Server,
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    /// Start with the given provider and default configuration.
    pub async fn with_provider(provider: Arc<dyn ModelProvider>) -> Self {
        Self::builder().provider(provider).build("").await
    }
}
