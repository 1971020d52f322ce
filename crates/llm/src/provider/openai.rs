//! Provider forwarding to any upstream speaking the OpenAI chat completion protocol.

mod input;
mod output;

use async_trait::async_trait;
use config::OpenAiProviderConfig;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, header::AUTHORIZATION};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use self::{
    input::{OpenAIMessage, OpenAIRequest},
    output::{OpenAIModelsResponse, OpenAIStreamChunk},
};

use super::{ModelFilter, ModelHandle, ModelProvider, ProviderError, ProviderMessage, TextStream};

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderError> {
        // No request timeout: completions run until the upstream finishes or the client goes away.
        let client = Client::builder().build().map_err(|e| {
            log::error!("Failed to create HTTP client for OpenAI provider: {e}");
            ProviderError::new(format!("failed to create HTTP client: {e}"), "ClientError")
        })?;

        let base_url = config.base_url.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header(AUTHORIZATION, format!("Bearer {}", key.expose_secret())),
            None => builder,
        }
    }
}

/// Turn a non-2xx upstream response into an error carrying the status as code.
async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    log::error!("OpenAI API error ({status}): {error_text}");

    Err(ProviderError::new(error_text, status.as_u16().to_string()))
}

fn connection_error(e: reqwest::Error) -> ProviderError {
    ProviderError::new(format!("Failed to reach upstream: {e}"), "ConnectionError")
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn discover(&self, filter: Option<&ModelFilter>) -> Result<Vec<ModelHandle>, ProviderError> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(connection_error)?;

        let response = check_status(response).await?;

        let response_text = response.text().await.map_err(connection_error)?;

        let models_response: OpenAIModelsResponse = sonic_rs::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse OpenAI models list response: {e}");
            log::error!("Raw response that failed to parse: {response_text}");
            ProviderError::new(format!("invalid models response: {e}"), "InvalidResponse")
        })?;

        let models = models_response
            .data
            .into_iter()
            .map(|model| ModelHandle::new(&self.config.vendor, model.id))
            .filter(|model| filter.is_none_or(|filter| filter.matches(model)))
            .collect::<Vec<_>>();

        log::debug!("Discovered {} upstream models at {}", models.len(), self.base_url);

        Ok(models)
    }

    async fn invoke(
        &self,
        model: &ModelHandle,
        messages: Vec<ProviderMessage>,
        cancellation: CancellationToken,
    ) -> Result<TextStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = OpenAIRequest {
            model: &model.family,
            messages: messages.into_iter().map(OpenAIMessage::from).collect(),
            stream: true,
        };

        let send = self.authorize(self.client.post(&url)).json(&request).send();

        let response = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                return Err(ProviderError::new("request was cancelled", "Cancelled"));
            }
            response = send => response.map_err(connection_error)?,
        };

        let response = check_status(response).await?;

        let fragments = response.bytes_stream().eventsource().filter_map(|event| async move {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("SSE parsing error in OpenAI stream: {e}");
                    return Some(Err(ProviderError::new(format!("upstream stream failed: {e}"), "StreamError")));
                }
            };

            if event.data == "[DONE]" {
                return None;
            }

            match sonic_rs::from_str::<OpenAIStreamChunk<'_>>(&event.data) {
                Ok(chunk) => chunk.into_fragment().map(Ok),
                Err(e) => {
                    log::error!("Failed to parse OpenAI streaming chunk: {e}");
                    log::debug!("Raw chunk that failed to parse: {}", event.data);

                    Some(Err(ProviderError::new(format!("invalid upstream chunk: {e}"), "InvalidResponse")))
                }
            }
        });

        // Dropping the byte stream closes the upstream connection.
        let stream = fragments.take_until(cancellation.cancelled_owned());

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
