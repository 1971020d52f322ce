//! Bridges protocol requests to the model provider and back.

mod stream;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use self::stream::ChatCompletionStream;

use crate::{
    error::LlmError,
    messages::{
        ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole, FinishReason, ObjectType,
        Usage,
    },
    provider::{ModelHandle, ModelProvider, ProviderMessage, Turn},
    registry::ModelRegistry,
    token_counter,
};

use self::stream::{CHANNEL_CAPACITY, ChunkHeader};

pub struct CompletionTranslator {
    registry: Arc<ModelRegistry>,
    provider: Arc<dyn ModelProvider>,
}

impl CompletionTranslator {
    pub fn new(registry: Arc<ModelRegistry>, provider: Arc<dyn ModelProvider>) -> Self {
        Self { registry, provider }
    }

    /// Run a completion to the end and return the whole reply at once.
    pub async fn completions(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let model = self.resolve_model(&request).await?;
        let prompt_tokens = token_counter::estimate_prompt_tokens(&request.messages);

        let cancellation = CancellationToken::new();
        // Cancels the provider call if this future is dropped before the reply is complete.
        let guard = cancellation.clone().drop_guard();

        let mut fragments = self
            .provider
            .invoke(&model, provider_messages(request.messages), cancellation)
            .await?;

        let mut content = String::new();

        while let Some(fragment) = fragments.next().await {
            content.push_str(&fragment?);
        }

        guard.disarm();

        let completion_tokens = token_counter::estimate_tokens(&content);

        Ok(ChatCompletionResponse {
            id: completion_id(),
            object: ObjectType::ChatCompletion,
            created: created_timestamp(),
            model: model.id(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: ChatRole::Assistant,
                    content,
                },
                finish_reason: FinishReason::Stop,
            }],
            usage: Usage::new(prompt_tokens, completion_tokens),
        })
    }

    /// Start a completion and return its chunks as they are produced.
    ///
    /// The provider is invoked before returning, so failures that happen before any text is
    /// generated surface here rather than inside the stream.
    pub async fn completions_stream(&self, request: ChatCompletionRequest) -> Result<ChatCompletionStream, LlmError> {
        let model = self.resolve_model(&request).await?;
        let cancellation = CancellationToken::new();

        let fragments = self
            .provider
            .invoke(&model, provider_messages(request.messages), cancellation.clone())
            .await?;

        let header = ChunkHeader {
            id: completion_id(),
            created: created_timestamp(),
            model: model.id(),
        };

        log::debug!("Streaming completion {} from model {}", header.id, header.model);

        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(stream::produce(header, fragments, sender, cancellation.clone()));

        Ok(ChatCompletionStream::new(receiver, cancellation))
    }

    async fn resolve_model(&self, request: &ChatCompletionRequest) -> Result<ModelHandle, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::InvalidRequest("messages must not be empty".to_string()));
        }

        if request.temperature.is_some() || request.max_tokens.is_some() {
            log::debug!(
                "Ignoring advisory parameters temperature={:?} max_tokens={:?}",
                request.temperature,
                request.max_tokens
            );
        }

        self.registry.ensure_initialized().await?;

        let model = self
            .registry
            .select_model(request.model.as_deref())
            .ok_or(LlmError::NoModelsAvailable)?;

        log::debug!("Routing completion to model {model}");

        Ok(model)
    }
}

/// The provider knows no system turn, system messages are sent as user turns.
fn provider_messages(messages: Vec<ChatMessage>) -> Vec<ProviderMessage> {
    messages
        .into_iter()
        .map(|message| ProviderMessage {
            turn: match message.role {
                ChatRole::System | ChatRole::User => Turn::User,
                ChatRole::Assistant => Turn::Assistant,
            },
            content: message.content,
        })
        .collect()
}

fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

/// Unix seconds that never go backwards within this process, even if the wall clock does.
fn created_timestamp() -> u64 {
    static LAST_CREATED: AtomicU64 = AtomicU64::new(0);

    let now = unix_now();
    let previous = LAST_CREATED.fetch_max(now, Ordering::SeqCst);

    previous.max(now)
}
