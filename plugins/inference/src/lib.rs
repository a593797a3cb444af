//! On-device identification bridge for the Trail Guard app.
//!
//! Exposes model provisioning and photo identification to the webview as
//! `plugin:trailguard-inference|<command>`. The Tauri-free core is
//! [`InferenceBridge`]; commands are thin wrappers around it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, Runtime};
use trailguard_engine::{EngineLoader, MockEngineLoader};
use trailguard_gemma::GemmaOnnxLoader;
use trailguard_identification::InferenceAdapter;
use trailguard_models::ModelStore;

mod adapters;
mod bridge;
mod commands;
mod config;
mod dto;
mod error;

pub use bridge::{InferenceBridge, SharedBridge};
pub use config::{Backend, InferenceConfig};
pub use dto::*;
pub use error::{BridgeError, Result};

use adapters::TauriEventBus;

const PLUGIN_NAME: &str = "trailguard-inference";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Engine backend selected by `config`. The tokenizer falls back to the
/// copy bundled in `resource_dir`.
pub fn engine_loader(config: &InferenceConfig, resource_dir: &Path) -> Arc<dyn EngineLoader> {
    match config.backend {
        Backend::Onnx => {
            let tokenizer: PathBuf = config
                .tokenizer_path
                .clone()
                .unwrap_or_else(|| resource_dir.join(TOKENIZER_FILE));
            Arc::new(GemmaOnnxLoader::new(tokenizer))
        }
        Backend::Mock => Arc::new(MockEngineLoader),
    }
}

pub fn init<R: Runtime>() -> TauriPlugin<R, Option<InferenceConfig>> {
    Builder::<R, Option<InferenceConfig>>::new(PLUGIN_NAME)
        .invoke_handler(tauri::generate_handler![
            commands::initialize_model,
            commands::identify_object,
            commands::is_model_ready,
            commands::download_model,
            commands::get_download_progress,
            commands::cleanup,
            commands::cancel_download,
            commands::get_model_status,
            commands::get_identification,
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();

            let data_dir = app
                .path()
                .app_data_dir()
                .map_err(|e| BridgeError::Setup(format!("app data dir: {e}")))?;
            let resource_dir = app
                .path()
                .resource_dir()
                .map_err(|e| BridgeError::Setup(format!("resource dir: {e}")))?;

            let store = ModelStore::with_layout(
                data_dir,
                config.models_dir.clone(),
                config.model_filename.clone(),
            );
            let adapter = InferenceAdapter::new(
                engine_loader(&config, &resource_dir),
                config.generation_timeout(),
            );
            let events = Arc::new(TauriEventBus::new(app.clone()));

            tracing::info!(
                backend = config.backend.as_str(),
                artifact = ?store.artifact_path(),
                "Inference plugin ready"
            );

            let bridge = InferenceBridge::new(store, adapter, events, config)?;
            app.manage::<SharedBridge>(Arc::new(bridge));
            Ok(())
        })
        .build()
}
