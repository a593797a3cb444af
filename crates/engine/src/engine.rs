use serde::{Deserialize, Serialize};
use std::path::Path;

/// Decoding parameters fixed when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodingConfig {
    pub max_tokens: usize,
    pub top_k: usize,
    pub top_p: f32,
    pub temperature: f32,
    /// Sampling seed. A fixed seed makes identical inputs produce identical output.
    pub seed: u64,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            top_k: 40,
            top_p: 0.9,
            temperature: 0.7,
            seed: 0,
        }
    }
}

/// A loaded model ready to accept generation calls.
///
/// Sessions are not reentrant; callers serialize `generate`.
pub trait LlmSession: Send + Sync {
    /// Run one blocking generation for `prompt` and return the raw text.
    fn generate(&self, prompt: &str) -> crate::Result<String>;

    fn model_name(&self) -> &str;

    /// Free engine resources ahead of drop. Errors are reported, never fatal.
    fn release(&self) -> crate::Result<()> {
        Ok(())
    }
}

/// Factory for engine sessions.
///
/// Backend crates implement this so the bridge depends on the contract,
/// not on a concrete runtime.
pub trait EngineLoader: Send + Sync {
    /// Human-readable backend name (e.g. "gemma-onnx", "mock").
    fn name(&self) -> &str;

    /// Create a session from the artifact at `model_path`.
    ///
    /// Fails for a missing, corrupt or unsupported artifact, or when the
    /// runtime cannot allocate the session.
    fn create_session(
        &self,
        model_path: &Path,
        config: &DecodingConfig,
    ) -> crate::Result<Box<dyn LlmSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decoding_parameters() {
        let config = DecodingConfig::default();
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.top_k, 40);
        assert!((config.top_p - 0.9).abs() < f32::EPSILON);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.seed, 0);
    }
}
