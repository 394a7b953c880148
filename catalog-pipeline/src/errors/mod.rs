//! Error types for the catalog pipeline.

use catalog_repository::{SearchError, StoreError};
use thiserror::Error;

/// Errors that can occur while ingesting feeds.
///
/// Manifest errors abort the run; every other variant is scoped to the feed
/// being processed.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The feed manifest could not be fetched or decoded.
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// A feed payload could not be downloaded.
    #[error("Download error: {0}")]
    DownloadError(String),

    /// The descriptor does not publish a usable payload URL.
    #[error("Feed {0} has no json.gz payload")]
    MissingFeedUrl(String),

    /// The feed cache could not be read or written.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// A cached payload could not be decompressed or read.
    #[error("Feed read error: {0}")]
    ReadError(String),

    /// Error from the shared store.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A feed worker terminated abnormally.
    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl PipelineError {
    /// Create a manifest error.
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::ManifestError(msg.into())
    }

    /// Create a download error.
    pub fn download(msg: impl Into<String>) -> Self {
        Self::DownloadError(msg.into())
    }

    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::CacheError(msg.into())
    }

    /// Create a read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::ReadError(msg.into())
    }

    /// Create a worker error.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerError(msg.into())
    }
}

/// Why a single feed record could not be ingested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The line is not a JSON object.
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// A required attribute is absent or empty.
    #[error("Record is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Errors that stop the search indexer.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// The search engine failed its health check.
    #[error("Search engine unreachable: {0}")]
    SearchUnreachable(String),

    /// Error from the shared store.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// A document could not be written to the search engine.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),
}
