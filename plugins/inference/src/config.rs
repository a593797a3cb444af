//! Plugin configuration, read from `plugins.trailguard-inference` in `tauri.conf.json`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use trailguard_models::{DEFAULT_MODELS_DIR, DEFAULT_MODEL_FILENAME};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Gemma on ONNX Runtime.
    #[default]
    Onnx,
    /// Canned answers, no model runtime.
    Mock,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Onnx => "onnx",
            Backend::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InferenceConfig {
    pub backend: Backend,
    pub models_dir: String,
    pub model_filename: String,
    /// Defaults to `tokenizer.json` in the app resource dir.
    pub tokenizer_path: Option<PathBuf>,
    /// Used by `downloadModel` when the request carries no URL.
    pub default_model_url: Option<String>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub generation_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            models_dir: DEFAULT_MODELS_DIR.to_string(),
            model_filename: DEFAULT_MODEL_FILENAME.to_string(),
            tokenizer_path: None,
            default_model_url: None,
            connect_timeout_secs: 30,
            read_timeout_secs: 60,
            generation_timeout_secs: 120,
        }
    }
}

impl InferenceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(1))
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs.max(1))
    }
}
