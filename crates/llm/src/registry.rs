//! Discovery and selection of the models requests are routed to.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::{
    error::LlmError,
    provider::{ModelFilter, ModelHandle, ModelProvider},
};

/// Cached list of usable models.
///
/// The list is replaced as a whole on every initialization, so concurrent readers observe
/// either the previous or the new list, never a mix of both.
pub struct ModelRegistry {
    provider: Arc<dyn ModelProvider>,
    default_vendor: String,
    models: RwLock<Arc<Vec<ModelHandle>>>,
    initializing: Mutex<()>,
}

impl ModelRegistry {
    pub fn new(provider: Arc<dyn ModelProvider>, default_vendor: impl Into<String>) -> Self {
        Self {
            provider,
            default_vendor: default_vendor.into(),
            models: RwLock::new(Arc::new(Vec::new())),
            initializing: Mutex::new(()),
        }
    }

    /// Discover models, preferring the default vendor and falling back to any vendor.
    pub async fn initialize(&self) -> Result<(), LlmError> {
        let filter = ModelFilter::vendor(&self.default_vendor);
        let mut models = self.provider.discover(Some(&filter)).await?;

        if models.is_empty() {
            log::debug!(
                "No models found for default vendor '{}', falling back to any vendor",
                self.default_vendor
            );

            models = self.provider.discover(None).await?;
        }

        if models.is_empty() {
            log::warn!("Model provider '{}' offers no models", self.provider.name());
            return Err(LlmError::NoModelsAvailable);
        }

        log::info!(
            "Discovered {} model(s): {}",
            models.len(),
            models.iter().map(ModelHandle::id).collect::<Vec<_>>().join(", ")
        );

        *self.models.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(models);

        Ok(())
    }

    /// Initialize unless a previous initialization already found models.
    ///
    /// Concurrent callers wait for one discovery instead of each running their own.
    pub async fn ensure_initialized(&self) -> Result<(), LlmError> {
        if self.is_initialized() {
            return Ok(());
        }

        let _guard = self.initializing.lock().await;

        if self.is_initialized() {
            return Ok(());
        }

        self.initialize().await
    }

    pub fn is_initialized(&self) -> bool {
        !self.snapshot().is_empty()
    }

    /// Composite ids of every cached model, in discovery order.
    pub fn list_models(&self) -> Vec<String> {
        self.snapshot().iter().map(ModelHandle::id).collect()
    }

    /// Resolve a requested name to a model.
    ///
    /// Tries the composite id first, then the bare family. Unknown or absent names resolve to
    /// the first discovered model. Returns `None` only while nothing has been discovered.
    pub fn select_model(&self, name: Option<&str>) -> Option<ModelHandle> {
        let models = self.snapshot();
        let first = models.first()?;

        let Some(name) = name else {
            return Some(first.clone());
        };

        let selected = models
            .iter()
            .find(|model| model.id() == name)
            .or_else(|| models.iter().find(|model| model.family == name))
            .unwrap_or_else(|| {
                log::debug!("Model '{name}' not found, using '{first}'");
                first
            });

        Some(selected.clone())
    }

    fn snapshot(&self) -> Arc<Vec<ModelHandle>> {
        self.models.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
