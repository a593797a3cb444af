//! Event contracts shared between the inference bridge and the UI layer.
//!
//! The bridge reports long-running work (model downloads, model lifecycle)
//! through events rather than return values. Keeping the payloads here means
//! the producer and every consumer agree on field names and status strings.

mod bus;

pub use bus::{EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus};

use serde::{Deserialize, Serialize};

/// Lifecycle of the most recent model download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    #[default]
    Idle,
    Downloading,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` persist until the next download starts.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress side channel emitted while `downloadModel` runs.
///
/// Producers: inference plugin (downloader)
/// Consumers: frontend (settings / model screen)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgressEvent {
    /// Integer percentage, 0..=100.
    pub progress: u8,
    pub status: DownloadStatus,
    /// Timestamp in milliseconds since epoch.
    #[serde(default)]
    pub ts_ms: i64,
}

impl DownloadProgressEvent {
    pub fn now(progress: u8, status: DownloadStatus) -> Self {
        Self {
            progress,
            status,
            ts_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Emitted after an engine session is created or released.
///
/// Producers: inference plugin (adapter)
/// Consumers: frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLifecycleEvent {
    pub initialized: bool,
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default)]
    pub backend: Option<String>,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Download progress (one per distinct percentage, final one is terminal).
    pub const DOWNLOAD_PROGRESS: &str = "inference:download_progress";
    /// Engine session created.
    pub const MODEL_LOADED: &str = "inference:model_loaded";
    /// Engine session released.
    pub const MODEL_RELEASED: &str = "inference:model_released";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&DownloadStatus::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
        assert_eq!(DownloadStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(DownloadStatus::Completed.is_terminal());
        assert!(DownloadStatus::Failed.is_terminal());
        assert!(!DownloadStatus::Idle.is_terminal());
        assert!(!DownloadStatus::Downloading.is_terminal());
    }

    #[test]
    fn test_progress_event_deserialize_minimal() {
        let json = r#"{"progress": 42, "status": "downloading"}"#;
        let event: DownloadProgressEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.progress, 42);
        assert_eq!(event.status, DownloadStatus::Downloading);
        assert_eq!(event.ts_ms, 0);
    }
}
