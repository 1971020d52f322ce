use serde::Serialize;

use crate::provider::{ProviderMessage, Turn};

/// Request body for the upstream `/chat/completions` endpoint.
#[derive(Debug, Serialize)]
pub(super) struct OpenAIRequest<'a> {
    /// Upstream model id, the family part of the composite id.
    pub(super) model: &'a str,
    pub(super) messages: Vec<OpenAIMessage>,
    /// Always true, fragments are forwarded as they arrive.
    pub(super) stream: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct OpenAIMessage {
    pub(super) role: &'static str,
    pub(super) content: String,
}

impl From<ProviderMessage> for OpenAIMessage {
    fn from(message: ProviderMessage) -> Self {
        let role = match message.turn {
            Turn::User => "user",
            Turn::Assistant => "assistant",
        };

        Self {
            role,
            content: message.content,
        }
    }
}
