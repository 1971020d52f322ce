//! Relay configuration structures to map the relay.toml configuration.

#![deny(missing_docs)]

mod cors;
mod health;
mod llm;
mod loader;
mod server;

use std::path::Path;

pub use cors::{CorsConfig, HttpMethod};
pub use health::HealthConfig;
pub use llm::{EchoProviderConfig, LlmConfig, LlmProviderConfig, OpenAiProviderConfig};
use serde::Deserialize;
pub use server::ServerConfig;

/// Main configuration structure for the Relay application.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat completion gateway settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates values that deserialization alone cannot reject.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}
