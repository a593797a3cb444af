use crate::photo::ImageProperties;

/// Instruction used when the caller does not supply one.
pub const DEFAULT_PROMPT: &str = "Identify this plant or mushroom. Provide the common name, \
scientific name, edibility status (toxic/not-edible/edible), description, habitat, key \
features, and any safety warnings.";

const OUTPUT_SCHEMA: &str = r#"{
    "commonName": "string",
    "scientificName": "string",
    "confidence": number (0-100),
    "edibility": "toxic" | "not-edible" | "edible",
    "description": "string",
    "habitat": "string",
    "features": ["string array"],
    "warnings": ["string array"],
    "guideId": "string"
}"#;

/// Append the output schema and the probed image properties to `base`.
///
/// Pure: the same base and properties always give the same prompt.
pub fn build_identification_prompt(base: &str, image: &ImageProperties) -> String {
    let base = if base.trim().is_empty() {
        DEFAULT_PROMPT
    } else {
        base.trim()
    };
    format!(
        "{base}\n\n\
         Please analyze this image and provide the following information in JSON format:\n\
         {OUTPUT_SCHEMA}\n\n\
         Image properties: {}\n\n\
         Focus on identifying plants, mushrooms, or other natural objects. \
         Be accurate about edibility and provide safety warnings when appropriate.",
        image.describe()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> ImageProperties {
        ImageProperties {
            width: 640,
            height: 480,
            center_rgb: [120, 80, 40],
        }
    }

    #[test]
    fn test_prompt_carries_schema_and_properties() {
        let prompt = build_identification_prompt("What mushroom is this?", &props());
        assert!(prompt.starts_with("What mushroom is this?\n\n"));
        for field in [
            "commonName",
            "scientificName",
            "confidence",
            "edibility",
            "habitat",
            "features",
            "warnings",
            "guideId",
        ] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(prompt.contains(
            "Image properties: Image: 640x480, aspect ratio: 1.33, center color: RGB(120,80,40)"
        ));
    }

    #[test]
    fn test_blank_base_uses_default_prompt() {
        let prompt = build_identification_prompt("   ", &props());
        assert!(prompt.starts_with(DEFAULT_PROMPT));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(
            build_identification_prompt("x", &props()),
            build_identification_prompt("x", &props())
        );
    }
}
