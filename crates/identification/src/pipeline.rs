use crate::normalize::{fallback_result, PIPELINE_FALLBACK_CONFIDENCE};
use crate::result::IdentificationResult;

/// Replace blank display fields of an engine answer with readable placeholders.
pub fn fill_empty_fields(mut result: IdentificationResult) -> IdentificationResult {
    fn fill(field: &mut String, placeholder: &str) {
        if field.trim().is_empty() {
            *field = placeholder.to_string();
        }
    }
    fill(&mut result.common_name, "Unknown Species");
    fill(&mut result.scientific_name, "Species unknown");
    fill(&mut result.description, "No description available");
    result
}

/// Result for an identification that never got an engine answer.
pub fn pipeline_fallback(message: &str) -> IdentificationResult {
    fallback_result(
        format!("AI identification failed: {message}"),
        PIPELINE_FALLBACK_CONFIDENCE,
    )
}
