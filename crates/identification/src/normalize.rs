//! Raw model text to [`IdentificationResult`].
//!
//! Two steps: [`parse_raw`] makes one strict attempt at the embedded JSON
//! object, then [`coerce`] reads every canonical field with its default.
//! Neither step can fail.

use crate::result::{Edibility, IdentificationResult};
use serde_json::{Map, Value};

/// Confidence of the fallback built when engine text cannot be parsed.
pub const ENGINE_FALLBACK_CONFIDENCE: u8 = 30;
/// Confidence of the fallback built when the engine never answered.
pub const PIPELINE_FALLBACK_CONFIDENCE: u8 = 0;

const UNKNOWN: &str = "Unknown";
const DEFAULT_CONFIDENCE: u8 = 50;

/// Outcome of the strict parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RawParse {
    Parsed(Map<String, Value>),
    Unparseable,
}

/// Byte range from the first `{` through the last `}`.
fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

pub fn parse_raw(raw: &str) -> RawParse {
    let Some(span) = json_span(raw) else {
        return RawParse::Unparseable;
    };
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(fields)) => RawParse::Parsed(fields),
        Ok(_) => RawParse::Unparseable,
        Err(e) => {
            tracing::debug!(error = %e, "Embedded JSON did not parse");
            RawParse::Unparseable
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn confidence_field(fields: &Map<String, Value>) -> Option<u8> {
    let value = match fields.get("confidence")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}

fn list_field(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = fields.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

/// Read every canonical field from `fields`, substituting defaults for
/// anything absent or of the wrong type. `raw` is the description default.
pub fn coerce(fields: &Map<String, Value>, raw: &str) -> IdentificationResult {
    IdentificationResult {
        common_name: string_field(fields, "commonName").unwrap_or_else(|| UNKNOWN.to_string()),
        scientific_name: string_field(fields, "scientificName")
            .unwrap_or_else(|| UNKNOWN.to_string()),
        confidence: confidence_field(fields).unwrap_or(DEFAULT_CONFIDENCE),
        edibility: string_field(fields, "edibility")
            .map(|label| Edibility::from_label(&label))
            .unwrap_or_default(),
        description: string_field(fields, "description").unwrap_or_else(|| raw.to_string()),
        habitat: string_field(fields, "habitat").unwrap_or_default(),
        features: list_field(fields, "features"),
        warnings: list_field(fields, "warnings"),
        guide_id: string_field(fields, "guideId").unwrap_or_default(),
    }
}

/// The safe "unknown, do not consume" answer.
pub fn fallback_result(description: impl Into<String>, confidence: u8) -> IdentificationResult {
    IdentificationResult {
        common_name: "Unknown Species".to_string(),
        scientific_name: "Species unknown".to_string(),
        confidence,
        edibility: Edibility::NotEdible,
        description: description.into(),
        habitat: UNKNOWN.to_string(),
        features: vec!["Analysis incomplete".to_string()],
        warnings: vec!["Unable to determine safety - do not consume".to_string()],
        guide_id: String::new(),
    }
}

/// Normalize raw engine output. Never fails.
pub fn normalize(raw: &str) -> IdentificationResult {
    match parse_raw(raw) {
        RawParse::Parsed(fields) => coerce(&fields, raw),
        RawParse::Unparseable => {
            tracing::debug!(raw_len = raw.len(), "Using fallback identification");
            fallback_result(raw, ENGINE_FALLBACK_CONFIDENCE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_json_span() {
        assert_eq!(json_span("a {x} b {y} c"), Some("{x} b {y}"));
        assert_eq!(json_span("} before {"), None);
        assert_eq!(json_span("no braces"), None);
        assert_eq!(json_span("{ unterminated"), None);
    }

    #[test]
    fn test_non_object_json_is_unparseable() {
        assert_eq!(parse_raw("{}"), RawParse::Parsed(Map::new()));
        assert_eq!(parse_raw("{1, 2}"), RawParse::Unparseable);
    }

    #[test]
    fn test_confidence_coercion() {
        let read = |v: Value| confidence_field(&fields(json!({ "confidence": v })));
        assert_eq!(read(json!(80)), Some(80));
        assert_eq!(read(json!(79.6)), Some(80));
        assert_eq!(read(json!(250)), Some(100));
        assert_eq!(read(json!(-3)), Some(0));
        assert_eq!(read(json!("65%")), Some(65));
        assert_eq!(read(json!("high")), None);
        assert_eq!(read(json!(null)), None);
    }

    #[test]
    fn test_wrong_types_fall_back_per_field() {
        let result = coerce(
            &fields(json!({
                "commonName": 42,
                "scientificName": null,
                "edibility": true,
                "habitat": ["forest"],
                "features": "not a list",
                "warnings": ["Do not eat", {"nested": 1}, 7],
                "guideId": "fly-agaric"
            })),
            "raw text",
        );
        assert_eq!(result.common_name, "Unknown");
        assert_eq!(result.scientific_name, "Unknown");
        assert_eq!(result.confidence, 50);
        assert_eq!(result.edibility, Edibility::NotEdible);
        assert_eq!(result.description, "raw text");
        assert_eq!(result.habitat, "");
        assert!(result.features.is_empty());
        assert_eq!(result.warnings, vec!["Do not eat", "7"]);
        assert_eq!(result.guide_id, "fly-agaric");
    }

    #[test]
    fn test_full_answer_round_trips_fields() {
        let raw = r#"{"commonName":"Fly Agaric","scientificName":"Amanita muscaria",
            "confidence":92,"edibility":"poisonous","description":"Red cap, white spots",
            "habitat":"Birch woods","features":["Red cap"],"warnings":["Toxic"],"guideId":"amanita"}"#;
        let result = normalize(raw);
        assert_eq!(result.common_name, "Fly Agaric");
        assert_eq!(result.edibility, Edibility::Toxic);
        assert_eq!(result.confidence, 92);
        assert_eq!(result.habitat, "Birch woods");
        assert_eq!(result.guide_id, "amanita");
    }
}
