mod download;
mod state;

use std::path::{Path, PathBuf};

pub use download::{download_stream, percent, ModelDownloader};
pub use state::{DownloadSnapshot, DownloadState};
pub use trailguard_events::DownloadStatus;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("download already in progress")]
    DownloadInProgress,
    #[error("download cancelled")]
    Cancelled,
    #[error("invalid model url: {0}")]
    InvalidUrl(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;

pub const DEFAULT_MODELS_DIR: &str = "gemma_models";
pub const DEFAULT_MODEL_FILENAME: &str = "gemma-3n-2b-it-int4.onnx";

/// On-disk home of the single model artifact.
///
/// The layout is `<root>/<models_dir>/<filename>` and never changes for the
/// lifetime of the store, so callers never have to remember where a download
/// went before initializing from it.
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
    models_dir: String,
    filename: String,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_layout(root, DEFAULT_MODELS_DIR, DEFAULT_MODEL_FILENAME)
    }

    pub fn with_layout(
        root: impl Into<PathBuf>,
        models_dir: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            models_dir: models_dir.into(),
            filename: filename.into(),
        }
    }

    /// Store rooted in the platform data dir, for tools running outside the app.
    pub fn default_location() -> Self {
        let root = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trailguard");
        Self::new(root)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(&self.models_dir)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.models_dir().join(&self.filename)
    }

    /// Where an in-flight download writes before it is renamed into place.
    pub fn partial_path(&self) -> PathBuf {
        self.artifact_path().with_extension("part")
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn artifact_exists(&self) -> bool {
        std::fs::metadata(self.artifact_path())
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Map the path a caller asked to initialize from onto the artifact path.
    ///
    /// The store owns exactly one artifact, so every request resolves to it.
    pub fn resolve(&self, requested: &str) -> PathBuf {
        let artifact = self.artifact_path();
        let requested_path = Path::new(requested);
        let matches = requested_path == artifact
            || requested_path == Path::new(&self.filename)
            || requested_path.file_name() == Some(std::ffi::OsStr::new(&self.filename));
        if !matches {
            tracing::debug!(
                requested = %requested,
                artifact = ?artifact,
                "Requested model path differs from store artifact; using store artifact"
            );
        }
        artifact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_artifact_path_is_fixed_layout() {
        let store = ModelStore::new("/data/app");
        assert_eq!(
            store.artifact_path(),
            PathBuf::from("/data/app/gemma_models/gemma-3n-2b-it-int4.onnx")
        );
        assert_eq!(
            store.partial_path(),
            PathBuf::from("/data/app/gemma_models/gemma-3n-2b-it-int4.part")
        );
    }

    #[test]
    fn test_artifact_exists_requires_file() {
        let dir = tempdir().unwrap();
        let store = ModelStore::with_layout(dir.path(), "models", "model.onnx");
        assert!(!store.artifact_exists());

        // A directory with the artifact's name is not an artifact.
        std::fs::create_dir_all(store.artifact_path()).unwrap();
        assert!(!store.artifact_exists());
        std::fs::remove_dir(store.artifact_path()).unwrap();

        std::fs::write(store.artifact_path(), b"weights").unwrap();
        assert!(store.artifact_exists());
    }

    #[test]
    fn test_resolve_always_returns_artifact() {
        let store = ModelStore::new("/data/app");
        let artifact = store.artifact_path();
        assert_eq!(store.resolve("gemma-3n-2b-it-int4.onnx"), artifact);
        assert_eq!(store.resolve("/somewhere/else/other.bin"), artifact);
        assert_eq!(store.resolve(artifact.to_str().unwrap()), artifact);
    }
}
