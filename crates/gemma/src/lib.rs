//! Gemma backend on ONNX Runtime.
//!
//! Loads a decoder-only Gemma export plus its `tokenizer.json` and generates
//! text with the shared seeded [`Sampler`](trailguard_engine::Sampler).

mod kv;
mod runner;
mod template;

pub use runner::GemmaSession;
pub use template::{chat_prompt, END_OF_TURN};

use std::path::{Path, PathBuf};
use trailguard_engine::{DecodingConfig, EngineError, EngineLoader, LlmSession};

/// [`EngineLoader`] for Gemma ONNX exports.
#[derive(Debug, Clone)]
pub struct GemmaOnnxLoader {
    tokenizer_path: PathBuf,
}

impl GemmaOnnxLoader {
    pub fn new(tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            tokenizer_path: tokenizer_path.into(),
        }
    }
}

impl EngineLoader for GemmaOnnxLoader {
    fn name(&self) -> &str {
        "gemma-onnx"
    }

    fn create_session(
        &self,
        model_path: &Path,
        config: &DecodingConfig,
    ) -> trailguard_engine::Result<Box<dyn LlmSession>> {
        if !model_path.is_file() {
            return Err(EngineError::ModelNotFound(model_path.to_path_buf()));
        }
        let session = GemmaSession::load(model_path, &self.tokenizer_path, *config)?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_model_is_reported_before_loading() {
        let dir = tempdir().unwrap();
        let loader = GemmaOnnxLoader::new(dir.path().join("tokenizer.json"));
        let err = loader
            .create_session(&dir.path().join("absent.onnx"), &DecodingConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::ModelNotFound(_)));
    }

    #[test]
    fn test_missing_tokenizer_fails_session() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"not really onnx").unwrap();
        let loader = GemmaOnnxLoader::new(dir.path().join("tokenizer.json"));
        let err = loader
            .create_session(&model, &DecodingConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Tokenizer(_)));
    }
}
