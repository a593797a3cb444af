//! Canned backend for running the app without a model runtime.

use crate::{DecodingConfig, EngineLoader, LlmSession};
use std::path::Path;

/// What every mock generation returns.
pub const MOCK_RESPONSE: &str = r#"Here is my analysis.
{
  "commonName": "Mock Mushroom",
  "scientificName": "Mockus testicus",
  "confidence": 85,
  "edibility": "not-edible",
  "description": "Mock result for development builds. Real identification needs the ONNX backend.",
  "habitat": "Mock forest environments",
  "features": ["Mock cap", "Mock stem", "Mock gills"],
  "warnings": ["This is test data only"],
  "guideId": "mock-guide"
}"#;

#[derive(Debug, Default)]
pub struct MockEngineLoader;

impl EngineLoader for MockEngineLoader {
    fn name(&self) -> &str {
        "mock"
    }

    fn create_session(
        &self,
        model_path: &Path,
        _config: &DecodingConfig,
    ) -> crate::Result<Box<dyn LlmSession>> {
        tracing::warn!(model_path = ?model_path, "Using mock inference backend");
        Ok(Box::new(MockSession))
    }
}

#[derive(Debug)]
pub struct MockSession;

impl LlmSession for MockSession {
    fn generate(&self, _prompt: &str) -> crate::Result<String> {
        Ok(MOCK_RESPONSE.to_string())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_session_is_deterministic() {
        let session = MockEngineLoader
            .create_session(Path::new("unused"), &DecodingConfig::default())
            .unwrap();
        let a = session.generate("identify").unwrap();
        let b = session.generate("identify").unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"commonName\""));
        assert!(session.release().is_ok());
    }
}
