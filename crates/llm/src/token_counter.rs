//! Token usage estimation.
//!
//! No tokenizer is involved: usage is approximated as one token per four characters,
//! rounded up. The numbers reported in `usage` are estimates, not measurements, and will
//! differ from what a model's own tokenizer would count.

use crate::messages::ChatMessage;

const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a piece of text, `ceil(chars / 4)`.
pub(crate) fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();

    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

/// Estimate the prompt tokens over the concatenation of all message contents.
pub(crate) fn estimate_prompt_tokens(messages: &[ChatMessage]) -> u32 {
    let prompt: String = messages.iter().map(|message| message.content.as_str()).collect();

    estimate_tokens(&prompt)
}
