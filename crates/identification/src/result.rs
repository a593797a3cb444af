use serde::{Deserialize, Serialize};

/// Safety classification attached to every result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Edibility {
    Toxic,
    /// The safe default whenever the answer is indeterminate.
    #[default]
    NotEdible,
    Edible,
}

impl Edibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edibility::Toxic => "toxic",
            Edibility::NotEdible => "not-edible",
            Edibility::Edible => "edible",
        }
    }

    /// Read a model-written label. Unrecognised labels are `NotEdible`.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "toxic" | "poisonous" | "deadly" | "lethal" => Edibility::Toxic,
            "edible" => Edibility::Edible,
            _ => Edibility::NotEdible,
        }
    }
}

impl std::fmt::Display for Edibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical identification answer. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    pub common_name: String,
    pub scientific_name: String,
    /// 0..=100
    pub confidence: u8,
    pub edibility: Edibility,
    pub description: String,
    pub habitat: String,
    pub features: Vec<String>,
    pub warnings: Vec<String>,
    pub guide_id: String,
}
