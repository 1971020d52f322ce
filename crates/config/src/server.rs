//! HTTP server configuration settings.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::{CorsConfig, HealthConfig};

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// Health endpoint configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,
}
