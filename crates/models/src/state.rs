//! Process-wide record of the most recent download.

use crate::{ModelError, Result};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use trailguard_events::DownloadStatus;

/// `{progress, status}` as one value so readers never see a mixed pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadSnapshot {
    pub progress: u8,
    pub status: DownloadStatus,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: DownloadSnapshot,
    cancel: Option<CancellationToken>,
}

/// Tracks the current or last download.
///
/// Starts at `{0, idle}`. Only `begin` resets it; terminal values stay until
/// the next download starts.
#[derive(Debug, Default)]
pub struct DownloadState {
    inner: Mutex<Inner>,
}

impl DownloadState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> DownloadSnapshot {
        self.lock().snapshot
    }

    /// Claim the download slot and reset to `{0, downloading}`.
    ///
    /// Fails without touching the state if another download holds the slot.
    pub fn begin(&self) -> Result<CancellationToken> {
        let mut inner = self.lock();
        if inner.snapshot.status == DownloadStatus::Downloading {
            return Err(ModelError::DownloadInProgress);
        }
        let token = CancellationToken::new();
        inner.snapshot = DownloadSnapshot {
            progress: 0,
            status: DownloadStatus::Downloading,
        };
        inner.cancel = Some(token.clone());
        Ok(token)
    }

    /// Record a new percentage. Progress never moves backwards within a download.
    pub fn report(&self, progress: u8) {
        let mut inner = self.lock();
        if inner.snapshot.status != DownloadStatus::Downloading {
            return;
        }
        inner.snapshot.progress = inner.snapshot.progress.max(progress.min(100));
    }

    pub fn complete(&self) {
        let mut inner = self.lock();
        inner.snapshot = DownloadSnapshot {
            progress: 100,
            status: DownloadStatus::Completed,
        };
        inner.cancel = None;
    }

    /// Mark failed, keeping the last reported progress.
    pub fn fail(&self) {
        let mut inner = self.lock();
        inner.snapshot.status = DownloadStatus::Failed;
        inner.cancel = None;
    }

    /// Cancel the in-flight download. Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        match &self.lock().cancel {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
