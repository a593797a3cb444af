//! Integration tests for response normalization.
//!
//! Every input, however malformed, must produce a fully populated result.

use trailguard_identification::{
    fallback_result, normalize, parse_raw, Edibility, IdentificationResult, RawParse,
};

fn expected_fallback(description: &str) -> IdentificationResult {
    IdentificationResult {
        common_name: "Unknown Species".to_string(),
        scientific_name: "Species unknown".to_string(),
        confidence: 30,
        edibility: Edibility::NotEdible,
        description: description.to_string(),
        habitat: "Unknown".to_string(),
        features: vec!["Analysis incomplete".to_string()],
        warnings: vec!["Unable to determine safety - do not consume".to_string()],
        guide_id: String::new(),
    }
}

// =============================================================================
// Fallback Path
// =============================================================================

mod fallback {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), expected_fallback(""));
    }

    #[test]
    fn test_unterminated_object() {
        let raw = "{not valid json";
        assert_eq!(parse_raw(raw), RawParse::Unparseable);
        assert_eq!(normalize(raw), expected_fallback(raw));
    }

    #[test]
    fn test_malformed_object_between_braces() {
        let raw = "Answer: {commonName: Chanterelle, confidence: high}";
        assert_eq!(normalize(raw), expected_fallback(raw));
    }

    #[test]
    fn test_close_brace_before_open_brace() {
        let raw = "} nothing useful {";
        assert_eq!(normalize(raw), expected_fallback(raw));
    }

    #[test]
    fn test_fallback_helper_matches_engine_fallback() {
        assert_eq!(fallback_result("x", 30), expected_fallback("x"));
    }

    #[test]
    fn test_fallback_always_warns() {
        for raw in ["", "plain prose", "{", "}", "{]"] {
            let result = normalize(raw);
            assert!(!result.warnings.is_empty(), "no warning for {raw:?}");
            assert_eq!(result.edibility, Edibility::NotEdible);
        }
    }
}

// =============================================================================
// Success Path
// =============================================================================

mod success {
    use super::*;

    #[test]
    fn test_json_embedded_in_prose() {
        let raw = "I think it's a {\"commonName\":\"Chanterelle\",\"confidence\":80,\"edibility\":\"edible\"}";
        let result = normalize(raw);
        assert_eq!(result.common_name, "Chanterelle");
        assert_eq!(result.confidence, 80);
        assert_eq!(result.edibility, Edibility::Edible);
        assert_eq!(result.scientific_name, "Unknown");
        assert_eq!(result.habitat, "");
        assert_eq!(result.guide_id, "");
        assert!(result.features.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.description, raw);
    }

    #[test]
    fn test_valid_json_missing_every_field() {
        let result = normalize("{}");
        assert_eq!(result.common_name, "Unknown");
        assert_eq!(result.scientific_name, "Unknown");
        assert_eq!(result.confidence, 50);
        assert_eq!(result.edibility, Edibility::NotEdible);
        assert_eq!(result.description, "{}");
    }

    #[test]
    fn test_fenced_code_block() {
        let raw = "```json\n{\"commonName\":\"Death Cap\",\"scientificName\":\"Amanita phalloides\",\
                   \"confidence\":95,\"edibility\":\"deadly\",\"warnings\":[\"Lethal\"]}\n```";
        let result = normalize(raw);
        assert_eq!(result.common_name, "Death Cap");
        assert_eq!(result.edibility, Edibility::Toxic);
        assert_eq!(result.warnings, vec!["Lethal"]);
    }

    #[test]
    fn test_unknown_edibility_is_not_edible() {
        let result = normalize(r#"{"edibility":"probably fine"}"#);
        assert_eq!(result.edibility, Edibility::NotEdible);
    }

    #[test]
    fn test_serialized_result_has_every_field() {
        let json = serde_json::to_value(normalize("garbage")).unwrap();
        for key in [
            "commonName",
            "scientificName",
            "confidence",
            "edibility",
            "description",
            "habitat",
            "features",
            "warnings",
            "guideId",
        ] {
            assert!(!json[key].is_null(), "{key} is null");
        }
    }
}
