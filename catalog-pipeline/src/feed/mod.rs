//! Feed acquisition: manifest, payload downloads, the on-disk cache and
//! the streaming record reader.

mod cache;
mod http;
mod manifest;
mod reader;

pub use cache::{CacheStatus, FeedCache};
pub use http::{FeedCredentials, HttpFeedSource};
pub use manifest::parse_manifest;
pub use reader::{FeedLine, FeedReader};

use async_trait::async_trait;

use crate::errors::PipelineError;
use catalog_shared::FeedDescriptor;

/// Remote origin of the feed manifest and feed payloads.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the list of currently published feeds, in manifest order.
    ///
    /// Any failure is a [`PipelineError::ManifestError`] and aborts the run.
    async fn fetch_manifest(&self) -> Result<Vec<FeedDescriptor>, PipelineError>;

    /// Download a compressed feed payload.
    async fn download(&self, url: &str) -> Result<Vec<u8>, PipelineError>;
}
