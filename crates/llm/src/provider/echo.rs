//! Offline provider answering with the last user turn, one word per fragment.

use async_trait::async_trait;
use config::EchoProviderConfig;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{ModelFilter, ModelHandle, ModelProvider, ProviderError, ProviderMessage, TextStream, Turn};

pub struct EchoProvider {
    config: EchoProviderConfig,
}

impl EchoProvider {
    pub fn new(config: EchoProviderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelProvider for EchoProvider {
    async fn discover(&self, filter: Option<&ModelFilter>) -> Result<Vec<ModelHandle>, ProviderError> {
        let models = self
            .config
            .families
            .iter()
            .map(|family| ModelHandle::new(&self.config.vendor, family))
            .filter(|model| filter.is_none_or(|filter| filter.matches(model)))
            .collect();

        Ok(models)
    }

    async fn invoke(
        &self,
        model: &ModelHandle,
        messages: Vec<ProviderMessage>,
        cancellation: CancellationToken,
    ) -> Result<TextStream, ProviderError> {
        if !self.config.families.contains(&model.family) {
            return Err(ProviderError::new(
                format!("model '{model}' is not served by this provider"),
                "ModelNotFound",
            ));
        }

        let content = messages
            .into_iter()
            .rev()
            .find(|message| message.turn == Turn::User)
            .map(|message| message.content)
            .unwrap_or_default();

        let fragments: Vec<Result<String, ProviderError>> = content
            .split_inclusive(' ')
            .map(|fragment| Ok(fragment.to_string()))
            .collect();

        let stream = futures::stream::iter(fragments).take_until(cancellation.cancelled_owned());

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "echo"
    }
}
