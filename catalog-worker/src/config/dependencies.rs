//! Dependency initialization and wiring for the catalog worker.

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::WorkerError;
use catalog_pipeline::feed::{FeedSource, HttpFeedSource};
use catalog_pipeline::{FeedIngester, SearchIndexer};
use catalog_repository::{
    CatalogStore, IndexConfig, OpenSearchClient, RedisStore, SearchEngineClient,
};

/// Container for the shared store connection.
pub struct Dependencies {
    store: RedisStore,
}

impl Dependencies {
    /// Connect to Redis and verify it answers.
    pub async fn connect(settings: &Settings) -> Result<Self, WorkerError> {
        info!(redis_url = %settings.redis_url, "Initializing dependencies");

        let store = RedisStore::connect(&settings.redis_url).await?;
        store.ping().await?;

        info!("Redis connection verified");
        Ok(Self { store })
    }

    fn store(&self) -> Arc<dyn CatalogStore> {
        Arc::new(self.store.clone())
    }

    /// Build the feed ingester.
    pub fn ingester(&self, settings: &Settings) -> Result<FeedIngester, WorkerError> {
        let manifest_url = settings
            .manifest_url
            .as_deref()
            .ok_or_else(|| WorkerError::config("FEED_MANIFEST_URL is required for ingest"))?;

        let source: Arc<dyn FeedSource> = Arc::new(HttpFeedSource::new(
            manifest_url,
            settings.credentials(),
            settings.http_timeout(),
        )?);

        let config = settings.ingest_config();
        info!(
            workers = config.workers,
            slow_mode = config.slow_mode,
            cache_dir = %settings.cache_dir.display(),
            "Feed ingester configured"
        );

        Ok(FeedIngester::new(
            source,
            self.store(),
            settings.cache_config(),
            config,
        ))
    }

    /// Build the search indexer.
    pub async fn indexer(&self, settings: &Settings) -> Result<SearchIndexer, WorkerError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index = %settings.opensearch_index,
            "Connecting to OpenSearch"
        );

        let search = OpenSearchClient::new(
            &settings.opensearch_url,
            IndexConfig::new(settings.opensearch_index.clone()),
        )
        .await?;
        let search: Arc<dyn SearchEngineClient> = Arc::new(search);

        Ok(SearchIndexer::new(
            self.store(),
            search,
            settings.indexer_config(),
        ))
    }
}
