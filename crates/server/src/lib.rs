//! Relay server library.
//!
//! Provides a reusable server to run Relay either from the binary, or from the integration tests.

#![deny(missing_docs)]

mod cors;
mod fallback;
mod health;

use std::{io, net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use config::Config;
use llm::provider::{ModelProvider, ProviderError};
use thiserror::Error;
use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;

/// Configuration for serving Relay.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized Relay TOML configuration.
    pub config: Config,
    /// Model provider answering completions. Built from `config.llm.provider` when not set.
    pub provider: Option<Arc<dyn ModelProvider>>,
}

/// Errors of the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` was called while a listener from an earlier `start` is still active.
    #[error("Server is already running on {0}")]
    AlreadyRunning(SocketAddr),
    /// The listening socket could not be bound.
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Requested address.
        address: SocketAddr,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The configured model provider could not be created.
    #[error("Failed to create model provider: {0}")]
    Provider(#[from] ProviderError),
    /// The configuration is not usable, e.g. CORS values that are not valid header values.
    #[error("Invalid configuration: {0}")]
    Config(#[from] anyhow::Error),
    /// The accept loop failed or could not be joined.
    #[error("HTTP server failed: {0}")]
    Serve(String),
}

struct Running {
    address: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<io::Result<()>>,
}

/// One listening instance of the gateway.
///
/// At most one listener is active per `Server`: starting twice without stopping is an error.
pub struct Server {
    config: ServeConfig,
    running: Mutex<Option<Running>>,
}

impl Server {
    /// Creates a stopped server.
    pub fn new(config: ServeConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    /// Binds the listener and starts accepting connections in the background.
    ///
    /// Returns the bound address, which differs from the configured one when port 0 was requested.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut running = self.running.lock().await;

        if let Some(running) = running.as_ref() {
            log::warn!("Refusing to start a second listener, already running on {}", running.address);
            return Err(ServerError::AlreadyRunning(running.address));
        }

        let app = app(&self.config).await?;
        let address = self.config.listen_address;

        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;

        let address = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { address, source })?;

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone().cancelled_owned();

        let handle = tokio::spawn(async move { axum::serve(listener, app).with_graceful_shutdown(signal).await });

        log::info!("Chat completions available at: http://{address}/v1/chat/completions");

        *running = Some(Running {
            address,
            shutdown,
            handle,
        });

        Ok(address)
    }

    /// Stops accepting connections and waits for open ones to finish. Stopping a stopped server does nothing.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let Some(running) = self.running.lock().await.take() else {
            log::debug!("Server is not running, nothing to stop");
            return Ok(());
        };

        log::info!("Stopping server on {}", running.address);
        running.shutdown.cancel();

        match running.handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ServerError::Serve(e.to_string())),
            Err(e) => Err(ServerError::Serve(e.to_string())),
        }
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|running| running.address)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.shutdown.cancel();
        }
    }
}

/// Builds the full application: completion routes, health, fallbacks, panic handling and CORS.
async fn app(config: &ServeConfig) -> Result<Router, ServerError> {
    let provider = match &config.provider {
        Some(provider) => provider.clone(),
        None => llm::provider::from_config(&config.config.llm.provider)?,
    };

    let mut app = llm::router(&config.config.llm, provider).await;

    let health = &config.config.server.health;

    if health.enabled {
        let label = health.label.clone();
        app = app.route(&health.path, get(move || health::health(label.clone())));
    }

    let app = app
        .fallback(fallback::not_found)
        .method_not_allowed_fallback(fallback::not_found)
        .layer(CatchPanicLayer::custom(fallback::panic_response));

    Ok(cors::apply(app, &config.config.server.cors)?)
}

/// Starts Relay and runs it until Ctrl-C is received.
pub async fn serve(config: ServeConfig) -> anyhow::Result<()> {
    let server = Server::new(config);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    log::info!("Received Ctrl-C, shutting down");

    server.stop().await?;

    Ok(())
}
