pub mod echo;
#[cfg(test)]
pub(crate) mod fake;
pub mod openai;

use std::{fmt, pin::Pin, sync::Arc};

use async_trait::async_trait;
use config::LlmProviderConfig;
use futures::Stream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Incremental text produced by a model, one item per fragment.
///
/// Fragment boundaries are meaningful: the gateway forwards every item as exactly one
/// streamed chunk and never re-chunks or coalesces them.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// A concrete model a provider can serve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelHandle {
    pub vendor: String,
    pub family: String,
}

impl ModelHandle {
    pub fn new(vendor: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            family: family.into(),
        }
    }

    /// Composite identifier exposed to clients, `vendor-family`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.vendor, self.family)
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.vendor, self.family)
    }
}

/// Narrows model discovery. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFilter {
    pub vendor: Option<String>,
    pub family: Option<String>,
}

impl ModelFilter {
    pub fn vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: Some(vendor.into()),
            family: None,
        }
    }

    pub fn matches(&self, model: &ModelHandle) -> bool {
        let vendor = self.vendor.as_deref().is_none_or(|vendor| vendor == model.vendor);
        let family = self.family.as_deref().is_none_or(|family| family == model.family);

        vendor && family
    }
}

/// Providers only know two kinds of turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    pub turn: Turn,
    pub content: String,
}

/// A failed or rejected model call, including quota and authorization failures.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    /// Provider specific classification, e.g. an upstream status code.
    pub code: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

/// The capability the gateway needs from whatever actually runs the models.
///
/// Note for async_trait: the gateway holds providers as trait objects, so the trait has to
/// stay dyn-compatible.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// List the models currently available, optionally narrowed by a filter.
    async fn discover(&self, filter: Option<&ModelFilter>) -> Result<Vec<ModelHandle>, ProviderError>;

    /// Start generating a reply for the given turns.
    ///
    /// Errors returned here happen before any text is produced. Errors during generation are
    /// yielded from the stream. Implementations stop producing fragments once `cancellation`
    /// is triggered.
    async fn invoke(
        &self,
        model: &ModelHandle,
        messages: Vec<ProviderMessage>,
        cancellation: CancellationToken,
    ) -> Result<TextStream, ProviderError>;

    /// Provider label used in logs.
    fn name(&self) -> &str;
}

/// Build the provider described by the configuration.
pub fn from_config(config: &LlmProviderConfig) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let provider: Arc<dyn ModelProvider> = match config {
        LlmProviderConfig::Echo(config) => Arc::new(echo::EchoProvider::new(config.clone())),
        LlmProviderConfig::Openai(config) => Arc::new(openai::OpenAiProvider::new(config.clone())?),
    };

    log::debug!("Using the '{}' model provider", provider.name());

    Ok(provider)
}
