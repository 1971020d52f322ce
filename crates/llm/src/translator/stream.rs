use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    error::LlmError,
    messages::{ChatCompletionChunk, ChatMessageDelta, ChatRole, ChunkChoice, FinishReason, ObjectType},
    provider::TextStream,
};

/// Chunks in flight between the producer task and the HTTP writer.
pub(super) const CHANNEL_CAPACITY: usize = 16;

type ChunkResult = Result<ChatCompletionChunk, LlmError>;

/// A streamed completion, consumed exactly once.
///
/// Dropping the stream before it is exhausted cancels the provider call behind it.
pub struct ChatCompletionStream {
    receiver: mpsc::Receiver<ChunkResult>,
    guard: Option<DropGuard>,
}

impl ChatCompletionStream {
    pub(super) fn new(receiver: mpsc::Receiver<ChunkResult>, cancellation: CancellationToken) -> Self {
        Self {
            receiver,
            guard: Some(cancellation.drop_guard()),
        }
    }
}

impl Stream for ChatCompletionStream {
    type Item = ChunkResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.receiver.poll_recv(cx) {
            Poll::Ready(None) => {
                // The producer is done, nothing left to cancel.
                if let Some(guard) = this.guard.take() {
                    guard.disarm();
                }

                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// Values shared by every chunk of one response.
pub(super) struct ChunkHeader {
    pub(super) id: String,
    pub(super) created: u64,
    pub(super) model: String,
}

impl ChunkHeader {
    fn chunk(&self, delta: ChatMessageDelta, finish_reason: Option<FinishReason>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: ObjectType::ChatCompletionChunk,
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }

    fn role(&self) -> ChatCompletionChunk {
        let delta = ChatMessageDelta {
            role: Some(ChatRole::Assistant),
            content: None,
        };

        self.chunk(delta, None)
    }

    fn content(&self, fragment: String) -> ChatCompletionChunk {
        let delta = ChatMessageDelta {
            role: None,
            content: Some(fragment),
        };

        self.chunk(delta, None)
    }

    fn stop(&self) -> ChatCompletionChunk {
        self.chunk(ChatMessageDelta::default(), Some(FinishReason::Stop))
    }
}

/// Push the chunks of one completion onto the channel: the role chunk, one chunk per
/// fragment, then the terminal chunk. A provider error is sent as the last item instead of
/// the terminal chunk.
pub(super) async fn produce(
    header: ChunkHeader,
    mut fragments: TextStream,
    sender: mpsc::Sender<ChunkResult>,
    cancellation: CancellationToken,
) {
    if sender.send(Ok(header.role())).await.is_err() {
        return;
    }

    let mut count = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                log::debug!("Completion {} cancelled after {count} fragment(s)", header.id);
                return;
            }
            next = fragments.next() => next,
        };

        let item = match next {
            Some(Ok(fragment)) => Ok(header.content(fragment)),
            Some(Err(error)) => {
                log::error!("Provider failed mid-stream in completion {}: {error}", header.id);

                // Nothing to do if the client is already gone.
                let _ = sender.send(Err(LlmError::from(error))).await;
                return;
            }
            None => break,
        };

        if sender.send(item).await.is_err() {
            log::debug!("Client went away during completion {}", header.id);
            return;
        }

        count += 1;
    }

    log::debug!("Completion {} finished with {count} fragment(s)", header.id);

    let _ = sender.send(Ok(header.stop())).await;
}
