use crate::{DownloadSnapshot, DownloadState, ModelError, ModelStore, Result};
use futures::{Stream, StreamExt};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Integer percentage of `downloaded` over a known `total`, floored.
///
/// Unknown (or zero) totals report 0 until the download completes.
pub fn percent(downloaded: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => {
            ((downloaded as u128 * 100) / total as u128).min(100) as u8
        }
        _ => 0,
    }
}

/// Fetches the model artifact into a [`ModelStore`].
#[derive(Debug, Clone)]
pub struct ModelDownloader {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl ModelDownloader {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("trailguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ModelError::DownloadFailed(e.to_string()))?;
        Ok(Self::with_client(client, read_timeout))
    }

    pub fn with_client(client: reqwest::Client, read_timeout: Duration) -> Self {
        Self {
            client,
            read_timeout,
        }
    }

    /// Download `url` into the store's artifact path.
    ///
    /// `on_event` sees `{0, downloading}` first, then one snapshot per
    /// distinct percentage, and always ends with a terminal snapshot.
    pub async fn download<F>(
        &self,
        url: &str,
        store: &ModelStore,
        state: &DownloadState,
        on_event: F,
    ) -> Result<u64>
    where
        F: FnMut(DownloadSnapshot),
    {
        let cancel = state.begin()?;
        let mut reporter = ProgressReporter::start(state, store, on_event);

        tracing::info!(url = %url, dest = ?store.artifact_path(), "Downloading model");

        let result = match self.open(url, &cancel).await {
            Ok(response) => {
                let total = response.content_length().filter(|t| *t > 0);
                write_stream(
                    response.bytes_stream(),
                    total,
                    store,
                    &cancel,
                    self.read_timeout,
                    |downloaded, total| reporter.bytes(downloaded, total),
                )
                .await
            }
            Err(e) => Err(e),
        };

        reporter.finish(result)
    }

    async fn open(&self, url: &str, cancel: &CancellationToken) -> Result<reqwest::Response> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| ModelError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ModelError::InvalidUrl(format!(
                "unsupported scheme `{}`",
                parsed.scheme()
            )));
        }

        let request = self.client.get(parsed).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ModelError::Cancelled),
            res = request => res.map_err(|e| ModelError::DownloadFailed(e.to_string()))?,
        };

        if !response.status().is_success() {
            return Err(ModelError::DownloadFailed(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }
        Ok(response)
    }
}

/// Same contract as [`ModelDownloader::download`], for an already-open byte stream.
pub async fn download_stream<S, B, E, F>(
    stream: S,
    total: Option<u64>,
    store: &ModelStore,
    state: &DownloadState,
    read_timeout: Duration,
    on_event: F,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(DownloadSnapshot),
{
    let cancel = state.begin()?;
    let mut reporter = ProgressReporter::start(state, store, on_event);
    let result = write_stream(
        stream,
        total,
        store,
        &cancel,
        read_timeout,
        |downloaded, total| reporter.bytes(downloaded, total),
    )
    .await;
    reporter.finish(result)
}

/// Bridges byte counts to `DownloadState` and the event callback.
///
/// Dropped before `finish` (the download future was abandoned), it marks the
/// download failed, emits the terminal snapshot and removes the partial file.
struct ProgressReporter<'a, F: FnMut(DownloadSnapshot)> {
    state: &'a DownloadState,
    store: &'a ModelStore,
    on_event: F,
    last: Option<u8>,
    finished: bool,
}

impl<'a, F> ProgressReporter<'a, F>
where
    F: FnMut(DownloadSnapshot),
{
    fn start(state: &'a DownloadState, store: &'a ModelStore, on_event: F) -> Self {
        let mut reporter = Self {
            state,
            store,
            on_event,
            last: Some(0),
            finished: false,
        };
        (reporter.on_event)(state.snapshot());
        reporter
    }

    fn bytes(&mut self, downloaded: u64, total: Option<u64>) {
        let progress = percent(downloaded, total);
        if self.last.is_some_and(|last| progress <= last) {
            return;
        }
        self.last = Some(progress);
        self.state.report(progress);
        (self.on_event)(self.state.snapshot());
    }

    fn finish(mut self, result: Result<u64>) -> Result<u64> {
        self.finished = true;
        match &result {
            Ok(bytes) => {
                self.state.complete();
                tracing::info!(bytes, "Model download completed");
            }
            Err(e) => {
                self.state.fail();
                tracing::warn!(error = %e, "Model download failed");
            }
        }
        (self.on_event)(self.state.snapshot());
        result
    }
}

impl<F> Drop for ProgressReporter<'_, F>
where
    F: FnMut(DownloadSnapshot),
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("Model download abandoned");
        self.state.fail();
        (self.on_event)(self.state.snapshot());
        let _ = std::fs::remove_file(self.store.partial_path());
    }
}

async fn write_stream<S, B, E, F>(
    stream: S,
    total: Option<u64>,
    store: &ModelStore,
    cancel: &CancellationToken,
    read_timeout: Duration,
    on_chunk: F,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(u64, Option<u64>),
{
    tokio::fs::create_dir_all(store.models_dir()).await?;

    let tmp = store.partial_path();
    // The file handle is dropped inside `copy_to_file`, so it is closed
    // before the partial file is renamed or removed.
    let copied = copy_to_file(stream, total, &tmp, cancel, read_timeout, on_chunk).await;

    match copied {
        Ok(bytes) => match tokio::fs::rename(&tmp, store.artifact_path()).await {
            Ok(()) => Ok(bytes),
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(ModelError::IoError(e))
            }
        },
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e)
        }
    }
}

async fn copy_to_file<S, B, E, F>(
    stream: S,
    total: Option<u64>,
    dest: &Path,
    cancel: &CancellationToken,
    read_timeout: Duration,
    mut on_chunk: F,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(u64, Option<u64>),
{
    let mut file = tokio::fs::File::create(dest).await?;
    futures::pin_mut!(stream);

    let mut downloaded: u64 = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ModelError::Cancelled),
            next = tokio::time::timeout(read_timeout, stream.next()) => next,
        };

        let chunk = match next {
            Err(_) => {
                return Err(ModelError::DownloadFailed(format!(
                    "no data received for {}ms",
                    read_timeout.as_millis()
                )))
            }
            Ok(None) => break,
            Ok(Some(chunk)) => chunk.map_err(|e| ModelError::DownloadFailed(e.to_string()))?,
        };

        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        downloaded += bytes.len() as u64;
        on_chunk(downloaded, total);
    }

    if let Some(total) = total {
        if downloaded < total {
            return Err(ModelError::DownloadFailed(format!(
                "connection closed after {downloaded} of {total} bytes"
            )));
        }
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(downloaded)
}
