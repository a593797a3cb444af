use crate::photo::{ImageError, ImageLoader, ImageProperties};
use crate::prompt::build_identification_prompt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use trailguard_engine::{DecodingConfig, EngineError, EngineLoader, LlmSession};

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("model not initialized")]
    NotInitialized,
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("engine returned no output")]
    EmptyOutput,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("worker task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Owns the single engine session.
///
/// At most one generation runs at a time. Initialize and cleanup wait for
/// the running generation so a session is never released mid-call.
pub struct InferenceAdapter {
    loader: Arc<dyn EngineLoader>,
    images: ImageLoader,
    config: DecodingConfig,
    generation_timeout: Duration,
    session: Mutex<Option<Arc<dyn LlmSession>>>,
    engine_lock: Arc<tokio::sync::Mutex<()>>,
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter")
            .field("backend", &self.loader.name())
            .field("config", &self.config)
            .field("generation_timeout", &self.generation_timeout)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl InferenceAdapter {
    pub fn new(loader: Arc<dyn EngineLoader>, generation_timeout: Duration) -> Self {
        Self {
            loader,
            images: ImageLoader::new(),
            config: DecodingConfig::default(),
            generation_timeout,
            session: Mutex::new(None),
            engine_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn with_image_loader(mut self, images: ImageLoader) -> Self {
        self.images = images;
        self
    }

    pub fn with_decoding(mut self, config: DecodingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.loader.name()
    }

    pub fn decoding(&self) -> &DecodingConfig {
        &self.config
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<dyn LlmSession>>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_initialized(&self) -> bool {
        self.slot().is_some()
    }

    fn current(&self) -> Option<Arc<dyn LlmSession>> {
        self.slot().clone()
    }

    /// Load a session from `model_path`, replacing any current one.
    ///
    /// On failure the adapter is left uninitialized.
    pub async fn initialize(&self, model_path: &Path) -> Result<()> {
        let _engine = self.engine_lock.lock().await;
        let previous = self.slot().take();
        release(previous);

        if !model_path.is_file() {
            tracing::warn!(model_path = ?model_path, failure = "engine", "Model artifact missing");
            return Err(EngineError::ModelNotFound(model_path.to_path_buf()).into());
        }

        let loader = Arc::clone(&self.loader);
        let path: PathBuf = model_path.to_path_buf();
        let config = self.config;
        let started = std::time::Instant::now();
        let session = tokio::task::spawn_blocking(move || loader.create_session(&path, &config))
            .await
            .map_err(|e| AdapterError::Join(e.to_string()))?
            .inspect_err(|e| {
                tracing::error!(
                    model_path = ?model_path,
                    failure = "engine",
                    error = %e,
                    "Engine session creation failed"
                );
            })?;

        tracing::info!(
            model_path = ?model_path,
            backend = %self.loader.name(),
            model = %session.model_name(),
            load_ms = started.elapsed().as_millis() as u64,
            "Engine session ready"
        );
        *self.slot() = Some(Arc::from(session));
        Ok(())
    }

    /// Run one generation for the image at `image_ref` and return the raw text.
    pub async fn identify(&self, image_ref: &str, prompt: &str) -> Result<String> {
        if !self.is_initialized() {
            return Err(AdapterError::NotInitialized);
        }

        let images = self.images.clone();
        let reference = image_ref.to_string();
        let properties = tokio::task::spawn_blocking(move || {
            images.load(&reference).map(|img| ImageProperties::probe(&img))
        })
        .await
        .map_err(|e| AdapterError::Join(e.to_string()))?
        .inspect_err(|e| {
            tracing::warn!(image = %image_ref, failure = "image", error = %e, "Image unavailable");
        })?;
        let full_prompt = build_identification_prompt(prompt, &properties);

        // Held by the worker, so a timed-out call still blocks the next one.
        let engine = Arc::clone(&self.engine_lock).lock_owned().await;
        let session = self.current().ok_or(AdapterError::NotInitialized)?;

        let started = std::time::Instant::now();
        let worker = tokio::task::spawn_blocking(move || {
            let _engine = engine;
            session.generate(&full_prompt)
        });
        let output = match tokio::time::timeout(self.generation_timeout, worker).await {
            Err(_) => {
                tracing::error!(
                    timeout = ?self.generation_timeout,
                    failure = "engine",
                    "Generation timed out"
                );
                return Err(AdapterError::Timeout(self.generation_timeout));
            }
            Ok(joined) => joined.map_err(|e| AdapterError::Join(e.to_string()))?,
        };
        let text = output.inspect_err(|e| {
            tracing::error!(failure = "engine", error = %e, "Generation failed");
        })?;

        tracing::debug!(
            chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            width = properties.width,
            height = properties.height,
            "Generation finished"
        );
        if text.trim().is_empty() {
            tracing::warn!(failure = "engine", "Engine returned blank output");
            return Err(AdapterError::EmptyOutput);
        }
        Ok(text)
    }

    /// Release the session if there is one. Safe to call repeatedly.
    pub async fn cleanup(&self) {
        let _engine = self.engine_lock.lock().await;
        let previous = self.slot().take();
        release(previous);
    }
}

fn release(session: Option<Arc<dyn LlmSession>>) {
    let Some(session) = session else {
        return;
    };
    match session.release() {
        Ok(()) => tracing::info!(model = %session.model_name(), "Engine session released"),
        Err(e) => tracing::warn!(
            model = %session.model_name(),
            error = %e,
            "Engine session release failed"
        ),
    }
}
