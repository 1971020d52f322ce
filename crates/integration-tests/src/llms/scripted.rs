//! In-process model provider following a fixed script.

use std::{
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use llm::provider::{ModelFilter, ModelHandle, ModelProvider, ProviderError, ProviderMessage, TextStream};
use tokio_util::sync::{CancellationToken, DropGuard};

/// One step of a scripted generation.
#[derive(Clone, Debug)]
pub enum Step {
    /// Yield this fragment.
    Fragment(&'static str),
    /// Fail the generation with this message.
    Fail(&'static str),
    /// Yield this fragment every 20ms until cancelled.
    Drip(&'static str),
}

/// Provider answering every invocation with the same steps.
///
/// Records what it was asked and whether the gateway cancelled it.
pub struct ScriptedProvider {
    models: Vec<ModelHandle>,
    steps: Vec<Step>,
    invoke_error: Option<ProviderError>,
    invocations: AtomicUsize,
    cancelled: Arc<AtomicBool>,
    received: Mutex<Vec<ProviderMessage>>,
}

impl ScriptedProvider {
    pub fn new(models: &[(&str, &str)], steps: Vec<Step>) -> Self {
        Self {
            models: models
                .iter()
                .map(|(vendor, family)| ModelHandle::new(*vendor, *family))
                .collect(),
            steps,
            invoke_error: None,
            invocations: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicBool::new(false)),
            received: Mutex::new(Vec::new()),
        }
    }

    /// `acme-fast` generating `"Hi "` and `"there!"`.
    pub fn hi_there() -> Self {
        Self::new(&[("acme", "fast")], vec![Step::Fragment("Hi "), Step::Fragment("there!")])
    }

    /// Every invocation fails before producing text.
    pub fn with_invoke_error(mut self, message: &str, code: &str) -> Self {
        self.invoke_error = Some(ProviderError::new(message, code));
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<ProviderMessage> {
        self.received.lock().unwrap().clone()
    }

    /// Wait until the gateway cancelled an invocation, or give up after five seconds.
    pub async fn wait_for_cancellation(&self) -> bool {
        let wait = async {
            while !self.cancelled.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };

        tokio::time::timeout(Duration::from_secs(5), wait).await.is_ok()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
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
        _model: &ModelHandle,
        messages: Vec<ProviderMessage>,
        cancellation: CancellationToken,
    ) -> Result<TextStream, ProviderError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        *self.received.lock().unwrap() = messages;

        if let Some(error) = &self.invoke_error {
            return Err(error.clone());
        }

        let finished = CancellationToken::new();
        let watch = watch_cancellation(cancellation.clone(), finished.clone(), self.cancelled.clone());
        tokio::spawn(watch);

        let stream = futures::stream::iter(self.steps.clone())
            .flat_map(|step| match step {
                Step::Fragment(text) => futures::stream::once(async move { Ok::<_, ProviderError>(text.to_string()) }).boxed(),
                Step::Fail(message) => {
                    futures::stream::once(async move { Err(ProviderError::new(message, "ScriptFailure")) }).boxed()
                }
                Step::Drip(text) => futures::stream::repeat(text)
                    .then(|text| async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(text.to_string())
                    })
                    .boxed(),
            })
            .take_until(cancellation.cancelled_owned());

        Ok(Box::pin(Tracked {
            inner: Box::pin(stream),
            _finished: finished.drop_guard(),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
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
