//! The request/response surface the UI talks to.
//!
//! `InferenceBridge` owns all process-wide state (download record, engine
//! session) and composes the model store, downloader, adapter and
//! normalizer. Every operation answers with a response value; internal
//! errors become `success: false` plus a message.

use crate::config::InferenceConfig;
use crate::dto::*;
use crate::error::{BridgeError, Result};
use serde::Serialize;
use std::sync::Arc;
use trailguard_events::{event_names, DownloadProgressEvent, EventBusRef, ModelLifecycleEvent};
use trailguard_identification::{
    fill_empty_fields, normalize, pipeline_fallback, AdapterError, IdentificationResult,
    InferenceAdapter, DEFAULT_PROMPT,
};
use trailguard_models::{DownloadState, ModelDownloader, ModelError, ModelStore};

const MODEL_NOT_READY: &str = "Model not ready. Please download and initialize the model first.";

pub struct InferenceBridge {
    store: ModelStore,
    downloads: DownloadState,
    downloader: ModelDownloader,
    adapter: InferenceAdapter,
    events: EventBusRef,
    config: InferenceConfig,
}

impl std::fmt::Debug for InferenceBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceBridge")
            .field("artifact", &self.store.artifact_path())
            .field("adapter", &self.adapter)
            .field("download", &self.downloads.snapshot())
            .finish()
    }
}

impl InferenceBridge {
    pub fn new(
        store: ModelStore,
        adapter: InferenceAdapter,
        events: EventBusRef,
        config: InferenceConfig,
    ) -> Result<Self> {
        let downloader = ModelDownloader::new(config.connect_timeout(), config.read_timeout())?;
        Ok(Self {
            store,
            downloads: DownloadState::new(),
            downloader,
            adapter,
            events,
            config,
        })
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    fn emit<T: Serialize>(&self, topic: &str, payload: &T) {
        if let Ok(payload) = serde_json::to_value(payload) {
            self.events.emit(topic, payload);
        }
    }

    fn lifecycle(&self, initialized: bool) -> ModelLifecycleEvent {
        ModelLifecycleEvent {
            initialized,
            model_path: Some(self.store.artifact_path().display().to_string()),
            backend: Some(self.adapter.backend_name().to_string()),
        }
    }

    pub async fn initialize_model(&self, request: InitializeRequest) -> InitializeResponse {
        if request.model_path.trim().is_empty() {
            return InitializeResponse {
                success: false,
                message: Some("Model path is required".to_string()),
            };
        }
        let path = self.store.resolve(request.model_path.trim());
        let was_initialized = self.adapter.is_initialized();
        match self.adapter.initialize(&path).await {
            Ok(()) => {
                self.emit(event_names::MODEL_LOADED, &self.lifecycle(true));
                InitializeResponse {
                    success: true,
                    message: Some("Model initialized successfully".to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(model_path = ?path, error = %e, "initializeModel failed");
                if was_initialized {
                    self.emit(event_names::MODEL_RELEASED, &self.lifecycle(false));
                }
                InitializeResponse {
                    success: false,
                    message: Some(format!("Failed to initialize model: {e}")),
                }
            }
        }
    }

    fn validate_identify(&self, request: &IdentifyRequest) -> Result<()> {
        if request.image_path.trim().is_empty() {
            return Err(BridgeError::InvalidRequest("Image path is required".to_string()));
        }
        if let Some(max_tokens) = request.max_tokens {
            if max_tokens <= 0 {
                return Err(BridgeError::InvalidRequest(format!(
                    "maxTokens must be positive, got {max_tokens}"
                )));
            }
        }
        if let Some(temperature) = request.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(BridgeError::InvalidRequest(format!(
                    "temperature must be within [0, 1], got {temperature}"
                )));
            }
        }

        let decoding = self.adapter.decoding();
        let fixed_tokens = request.max_tokens.map_or(true, |t| t == decoding.max_tokens as i64);
        let fixed_temp = request
            .temperature
            .map_or(true, |t| (t - decoding.temperature as f64).abs() < 1e-6);
        if !fixed_tokens || !fixed_temp {
            tracing::debug!(
                requested_max_tokens = ?request.max_tokens,
                requested_temperature = ?request.temperature,
                max_tokens = decoding.max_tokens,
                temperature = decoding.temperature,
                "Decoding parameters are fixed per session; request values ignored"
            );
        }
        Ok(())
    }

    pub async fn identify_object(&self, request: IdentifyRequest) -> IdentifyResponse {
        if let Err(e) = self.validate_identify(&request) {
            return IdentifyResponse::failed(e.to_string());
        }
        let prompt = request
            .prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PROMPT);

        match self.adapter.identify(request.image_path.trim(), prompt).await {
            Ok(raw) => IdentifyResponse::ok(normalize(&raw)),
            // A blank answer is still an answer: the safe fallback.
            Err(AdapterError::EmptyOutput) => IdentifyResponse::ok(normalize("")),
            Err(AdapterError::NotInitialized) => {
                IdentifyResponse::failed("Model not initialized")
            }
            Err(e) => IdentifyResponse::failed(format!("Failed to identify object: {e}")),
        }
    }

    pub fn is_model_ready(&self) -> ReadyResponse {
        ReadyResponse {
            ready: self.adapter.is_initialized() && self.store.artifact_exists(),
        }
    }

    fn download_url(&self, requested: &str) -> Result<String> {
        let requested = requested.trim();
        if !requested.is_empty() {
            return Ok(requested.to_string());
        }
        self.config
            .default_model_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| BridgeError::InvalidRequest("Model URL is required".to_string()))
    }

    pub async fn download_model(&self, request: DownloadRequest) -> DownloadResponse {
        let url = match self.download_url(&request.model_url) {
            Ok(url) => url,
            Err(e) => {
                return DownloadResponse {
                    success: false,
                    progress: None,
                    message: Some(e.to_string()),
                }
            }
        };

        let result = self
            .downloader
            .download(&url, &self.store, &self.downloads, |snapshot| {
                self.emit(
                    event_names::DOWNLOAD_PROGRESS,
                    &DownloadProgressEvent::now(snapshot.progress, snapshot.status),
                );
            })
            .await;

        let progress = Some(self.downloads.snapshot().progress);
        match result {
            Ok(bytes) => {
                tracing::info!(bytes, "downloadModel finished");
                DownloadResponse {
                    success: true,
                    progress,
                    message: Some("Model downloaded successfully".to_string()),
                }
            }
            Err(ModelError::DownloadInProgress) => DownloadResponse {
                success: false,
                progress,
                message: Some("Download already in progress".to_string()),
            },
            Err(e) => DownloadResponse {
                success: false,
                progress,
                message: Some(format!("Failed to download model: {e}")),
            },
        }
    }

    pub fn get_download_progress(&self) -> ProgressResponse {
        let snapshot = self.downloads.snapshot();
        ProgressResponse {
            progress: snapshot.progress,
            status: snapshot.status,
        }
    }

    pub async fn cleanup(&self) -> CleanupResponse {
        let was_initialized = self.adapter.is_initialized();
        self.adapter.cleanup().await;
        if was_initialized {
            self.emit(event_names::MODEL_RELEASED, &self.lifecycle(false));
        }
        CleanupResponse { success: true }
    }

    pub fn cancel_download(&self) -> CancelResponse {
        let cancelled = self.downloads.cancel();
        tracing::info!(cancelled, "cancelDownload");
        CancelResponse { cancelled }
    }

    pub fn get_model_status(&self) -> ModelStatusResponse {
        let snapshot = self.downloads.snapshot();
        let initialized = self.adapter.is_initialized();
        let artifact_present = self.store.artifact_exists();
        ModelStatusResponse {
            ready: initialized && artifact_present,
            initialized,
            artifact_present,
            artifact_path: self.store.artifact_path().display().to_string(),
            default_model_url: self.config.default_model_url.clone(),
            backend: self.adapter.backend_name().to_string(),
            progress: snapshot.progress,
            status: snapshot.status,
        }
    }

    /// Full identification for the result screen. Always yields a result.
    pub async fn get_identification(
        &self,
        image_path: String,
        prompt: Option<String>,
    ) -> IdentificationResult {
        if !self.is_model_ready().ready {
            tracing::warn!("getIdentification called before the model is ready");
            return pipeline_fallback(MODEL_NOT_READY);
        }
        let response = self
            .identify_object(IdentifyRequest {
                image_path,
                prompt,
                max_tokens: None,
                temperature: None,
            })
            .await;
        match response {
            IdentifyResponse {
                success: true,
                result: Some(result),
                ..
            } => fill_empty_fields(result),
            IdentifyResponse { message, .. } => pipeline_fallback(
                message.as_deref().unwrap_or("AI identification failed"),
            ),
        }
    }
}

/// Shared handle managed by Tauri.
pub type SharedBridge = Arc<InferenceBridge>;
