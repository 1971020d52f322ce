use std::borrow::Cow;

use serde::Deserialize;

/// Response of the upstream `/models` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct OpenAIModelsResponse {
    pub(super) data: Vec<OpenAIModel>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIModel {
    pub(super) id: String,
}

/// One `data:` frame of an upstream streaming completion.
#[derive(Debug, Deserialize)]
pub(super) struct OpenAIStreamChunk<'a> {
    #[serde(borrow, default)]
    pub(super) choices: Vec<OpenAIStreamChoice<'a>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIStreamChoice<'a> {
    #[serde(borrow, default)]
    pub(super) delta: OpenAIDelta<'a>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct OpenAIDelta<'a> {
    #[serde(borrow, default)]
    pub(super) content: Option<Cow<'a, str>>,
}

impl OpenAIStreamChunk<'_> {
    /// Text carried by the first choice, if any.
    pub(super) fn into_fragment(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(Cow::into_owned)
    }
}
