//! Feed ingestion: manifest fetch, parallel feed processing and record
//! normalization.

mod pool;
mod processor;
mod record;
mod report;
mod telemetry;

pub use pool::FeedDispatcher;
pub use processor::FeedProcessor;
pub use record::ingest_line;
pub use report::{FeedOutcome, FeedReport, RecordFailure, RunReport};
pub use telemetry::MemorySampler;

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{FeedCacheConfig, IngestConfig};
use crate::errors::PipelineError;
use crate::feed::{FeedCache, FeedSource};
use catalog_repository::CatalogStore;

/// Runs one ingestion pass over every feed in the manifest.
pub struct FeedIngester {
    source: Arc<dyn FeedSource>,
    dispatcher: FeedDispatcher,
}

impl FeedIngester {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn CatalogStore>,
        cache_config: FeedCacheConfig,
        config: IngestConfig,
    ) -> Self {
        let workers = config.workers;
        let cache = Arc::new(FeedCache::new(cache_config, source.clone()));
        let processor = Arc::new(FeedProcessor::new(cache, store, config));

        Self {
            source,
            dispatcher: FeedDispatcher::new(processor, workers),
        }
    }

    /// Fetch the manifest and process every listed feed.
    ///
    /// Only a manifest failure (or a crashed worker) fails the run; feed
    /// failures are reported per feed.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let feeds = self.source.fetch_manifest().await?;
        info!(feeds = feeds.len(), "Dispatching feeds");
        self.dispatcher.dispatch(feeds).await
    }
}
