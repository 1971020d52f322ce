//! Configuration of the chat completion gateway and the model provider behind it.

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Chat completion gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Vendor queried first during model discovery. When it has no models,
    /// discovery falls back to any vendor.
    pub default_vendor: String,
    /// Label reported as `owned_by` in the model listing.
    pub owned_by: String,
    /// The model provider answering completions.
    pub provider: LlmProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_vendor: "relay".to_string(),
            owned_by: "relay".to_string(),
            provider: LlmProviderConfig::default(),
        }
    }
}

/// Model provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum LlmProviderConfig {
    /// Offline provider repeating the last user turn back.
    Echo(EchoProviderConfig),
    /// Any upstream speaking the OpenAI chat completion protocol.
    Openai(OpenAiProviderConfig),
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self::Echo(EchoProviderConfig::default())
    }
}

impl LlmProviderConfig {
    /// The vendor label every discovered model of this provider carries.
    pub fn vendor(&self) -> &str {
        match self {
            Self::Echo(config) => &config.vendor,
            Self::Openai(config) => &config.vendor,
        }
    }
}

/// Configuration of the echo provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EchoProviderConfig {
    /// Vendor label of the advertised models.
    pub vendor: String,
    /// Model families advertised, in discovery order.
    pub families: Vec<String>,
}

impl Default for EchoProviderConfig {
    fn default() -> Self {
        Self {
            vendor: "relay".to_string(),
            families: vec!["echo".to_string()],
        }
    }
}

/// Configuration of an OpenAI-compatible upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiProviderConfig {
    /// Vendor label given to every upstream model.
    pub vendor: String,
    /// Base URL of the upstream API, e.g. `https://api.openai.com/v1`.
    pub base_url: Url,
    /// Bearer token sent to the upstream.
    #[serde(default)]
    pub api_key: Option<SecretString>,
}
