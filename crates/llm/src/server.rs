use std::sync::Arc;

use config::LlmConfig;

use crate::{
    messages::{ChatCompletionRequest, ChatCompletionResponse, Model, ModelsResponse, ObjectType},
    provider::ModelProvider,
    registry::ModelRegistry,
    translator::{self, ChatCompletionStream, CompletionTranslator},
};

#[derive(Clone)]
pub(crate) struct LlmServer {
    shared: Arc<LlmServerInner>,
}

struct LlmServerInner {
    registry: Arc<ModelRegistry>,
    translator: CompletionTranslator,
    owned_by: String,
}

impl LlmServer {
    pub fn new(config: &LlmConfig, provider: Arc<dyn ModelProvider>) -> Self {
        let registry = Arc::new(ModelRegistry::new(provider.clone(), &config.default_vendor));
        let translator = CompletionTranslator::new(registry.clone(), provider);

        Self {
            shared: Arc::new(LlmServerInner {
                registry,
                translator,
                owned_by: config.owned_by.clone(),
            }),
        }
    }

    /// Discover models up front. Failures are not fatal, requests retry the discovery.
    pub async fn initialize(&self) {
        if let Err(e) = self.shared.registry.initialize().await {
            log::warn!("Model discovery failed at startup, retrying on first request: {e}");
        }
    }

    pub async fn completions(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionResponse> {
        self.shared.translator.completions(request).await
    }

    pub async fn completions_stream(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionStream> {
        self.shared.translator.completions_stream(request).await
    }

    pub async fn list_models(&self) -> crate::Result<ModelsResponse> {
        self.shared.registry.ensure_initialized().await?;

        let created = translator::unix_now();

        let data = self
            .shared
            .registry
            .list_models()
            .into_iter()
            .map(|id| Model {
                id,
                object: ObjectType::Model,
                created,
                owned_by: self.shared.owned_by.clone(),
            })
            .collect();

        Ok(ModelsResponse {
            object: ObjectType::List,
            data,
        })
    }
}
