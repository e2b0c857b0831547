use thiserror::Error;

use crate::pipeline::DownloadPlan;
use crate::storage::PersistError;
use crate::types::{AlbumDetail, DownloadSummary};

/// Failures surfaced by a content source. The job controller treats every
/// variant the same way (job failure); the split exists for logs and tests.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The client could not be constructed or configured; surfaced once at
    /// startup and disables submission.
    #[error("{0}")]
    Unavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("response too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Receives log lines generated while a job runs. Implemented over the
/// engine event channel in production and over a plain `Vec` in tests.
pub trait ProgressSink: Send + Sync {
    fn log(&self, line: &str);
}

/// The content-source collaborator. Internals (site layout, parsing,
/// image hosting) stay behind this boundary; the engine only needs these
/// three operations.
#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetches and normalizes album metadata plus the chapter listing.
    async fn fetch_metadata(&self, album_id: &str) -> Result<AlbumDetail, SourceError>;

    /// Executes the configured pipeline for one album: stage ordering,
    /// per-plugin kwargs, directory layout. Runs to completion or failure
    /// within the call; there is no in-flight cancellation.
    async fn download(
        &self,
        album_id: &str,
        plan: &DownloadPlan,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadSummary, SourceError>;

    /// URL of the album cover image.
    fn cover_url(&self, album_id: &str) -> String;
}
