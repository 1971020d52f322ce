//! Scripted provider for unit tests.

use std::{
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{ModelFilter, ModelHandle, ModelProvider, ProviderError, ProviderMessage, TextStream};

#[derive(Clone, Debug)]
pub(crate) enum Step {
    Fragment(&'static str),
    Fail(&'static str),
    /// Never yields, until the invocation is cancelled.
    Hang,
}

#[derive(Default)]
pub(crate) struct FakeProvider {
    pub(crate) models: Vec<ModelHandle>,
    pub(crate) steps: Vec<Step>,
    pub(crate) invoke_error: Option<ProviderError>,
    pub(crate) invocations: AtomicUsize,
    pub(crate) cancelled: Arc<AtomicBool>,
    pub(crate) received: Mutex<Vec<ProviderMessage>>,
    pub(crate) invoked_model: Mutex<Option<ModelHandle>>,
}

impl FakeProvider {
    pub(crate) fn new(models: &[(&str, &str)], steps: Vec<Step>) -> Self {
        Self {
            models: models
                .iter()
                .map(|(vendor, family)| ModelHandle::new(*vendor, *family))
                .collect(),
            steps,
            ..Default::default()
        }
    }

    pub(crate) fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelProvider for FakeProvider {
    async fn discover(&self, filter: Option<&ModelFilter>) -> Result<Vec<ModelHandle>, ProviderError> {
        Ok(self
            .models
            .iter()
            .filter(|model| filter.is_none_or(|filter| filter.matches(model)))
            .cloned()
            .collect())
    }

    async fn invoke(
        &self,
        model: &ModelHandle,
        messages: Vec<ProviderMessage>,
        cancellation: CancellationToken,
    ) -> Result<TextStream, ProviderError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        *self.received.lock().unwrap() = messages;
        *self.invoked_model.lock().unwrap() = Some(model.clone());

        if let Some(error) = &self.invoke_error {
            return Err(error.clone());
        }

        let finished = CancellationToken::new();
        let watch = watch_cancellation(cancellation.clone(), finished.clone(), self.cancelled.clone());
        tokio::spawn(watch);

        Ok(Box::pin(Tracked {
            inner: Box::pin(scripted(self.steps.clone(), cancellation)),
            _finished: finished.drop_guard(),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Records whether `cancellation` fired. Ends once the stream handed out is dropped, so
/// invocations that run to completion leave nothing behind.
async fn watch_cancellation(cancellation: CancellationToken, finished: CancellationToken, cancelled: Arc<AtomicBool>) {
    tokio::select! {
        _ = cancellation.cancelled() => {}
        _ = finished.cancelled() => {}
    }

    if cancellation.is_cancelled() {
        cancelled.store(true, Ordering::SeqCst);
    }
}

/// Stream wrapper that signals `finished` when dropped.
struct Tracked {
    inner: TextStream,
    _finished: DropGuard,
}

impl Stream for Tracked {
    type Item = Result<String, ProviderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

fn scripted(
    steps: Vec<Step>,
    cancellation: CancellationToken,
) -> impl futures::Stream<Item = Result<String, ProviderError>> + Send {
    futures::stream::iter(steps).then(move |step| {
        let cancellation = cancellation.clone();

        async move {
            match step {
                Step::Fragment(text) => Some(Ok(text.to_string())),
                Step::Fail(message) => Some(Err(ProviderError::new(message, "Failed"))),
                Step::Hang => {
                    cancellation.cancelled().await;
                    None
                }
            }
        }
    })
    .take_while(|item| futures::future::ready(item.is_some()))
    .filter_map(futures::future::ready)
}
