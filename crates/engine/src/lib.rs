mod engine;
mod mock;
mod sampler;

pub use engine::{DecodingConfig, EngineLoader, LlmSession};
pub use mock::{MockEngineLoader, MockSession, MOCK_RESPONSE};
pub use sampler::Sampler;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("failed to release session: {0}")]
    Release(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
