//! Search indexer loop.
//!
//! Drains the `solr-loader` queue into the search engine. Jobs only carry a
//! product id, so every job indexes the product as currently stored.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::IndexerConfig;
use crate::errors::IndexerError;
use catalog_repository::{CatalogStore, SearchEngineClient, SearchError, StoreError};
use catalog_shared::{JobKey, ProductDocument, QueueName};

/// Where the indexer loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    /// About to check search engine health.
    Polling,
    /// Working through the pending jobs.
    Scanning,
    /// Nothing to do on the last pass; waiting for producers.
    IdleBackoff,
    /// Stopped; the search engine is unusable.
    Fatal,
}

/// Outcome of one scan over the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Jobs whose product was indexed and committed.
    pub indexed: usize,
    /// Jobs claimed elsewhere or removed before they could be read.
    pub skipped: usize,
    /// Jobs dropped because their product or payload was unusable.
    pub orphaned: usize,
    /// Jobs pending once the pass ended.
    pub remaining: usize,
}

impl PassReport {
    /// Whether the pass removed at least one job from the queue.
    pub fn made_progress(&self) -> bool {
        self.indexed + self.orphaned > 0
    }
}

/// Consumer of the index queue.
pub struct SearchIndexer {
    store: Arc<dyn CatalogStore>,
    search: Arc<dyn SearchEngineClient>,
    config: IndexerConfig,
    state: IndexerState,
}

impl SearchIndexer {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        search: Arc<dyn SearchEngineClient>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            search,
            config,
            state: IndexerState::Polling,
        }
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    /// Create the index if needed, then index jobs until a fatal error.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IndexerError> {
        info!("Starting search indexer");
        if let Err(e) = self.search.ensure_index_exists().await {
            error!(error = %e, "Could not prepare the search index");
            self.state = IndexerState::Fatal;
            return Err(match e {
                SearchError::ConnectionError(msg) => IndexerError::SearchUnreachable(msg),
                other => other.into(),
            });
        }

        loop {
            self.step().await?;
        }
    }

    /// Perform the work of the current state and move to the next one.
    pub async fn step(&mut self) -> Result<IndexerState, IndexerError> {
        let result = match self.state {
            IndexerState::Polling => self.poll().await,
            IndexerState::Scanning => self.scan_pass().await.map(|pass| {
                // Jobs claimed elsewhere stay pending; a pass that removed nothing backs off.
                if pass.remaining == 0 || !pass.made_progress() {
                    IndexerState::IdleBackoff
                } else {
                    IndexerState::Polling
                }
            }),
            IndexerState::IdleBackoff => self.idle_backoff().await.map(|_| IndexerState::Polling),
            IndexerState::Fatal => Err(IndexerError::SearchUnreachable(
                "indexer already stopped".to_string(),
            )),
        };

        match result {
            Ok(next) => {
                debug!(from = ?self.state, to = ?next, "Indexer state change");
                self.state = next;
                Ok(next)
            }
            Err(e) => {
                error!(error = %e, "Search indexer stopped");
                self.state = IndexerState::Fatal;
                Err(e)
            }
        }
    }

    async fn poll(&self) -> Result<IndexerState, IndexerError> {
        match self.search.health_check().await {
            Ok(true) => Ok(IndexerState::Scanning),
            Ok(false) => Err(IndexerError::SearchUnreachable(
                "health check reported an unhealthy cluster".to_string(),
            )),
            Err(e) => Err(IndexerError::SearchUnreachable(e.to_string())),
        }
    }

    /// Process every job currently in the index queue once.
    #[instrument(skip(self))]
    pub async fn scan_pass(&self) -> Result<PassReport, IndexerError> {
        let keys = self.store.scan(QueueName::SearchLoader).await?;
        let mut pass = PassReport::default();

        for key in &keys {
            if !self
                .store
                .claim(key, self.config.visibility_timeout)
                .await?
            {
                pass.skipped += 1;
                continue;
            }

            let job = match self.store.fetch(key).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    pass.skipped += 1;
                    continue;
                }
                Err(StoreError::InvalidKey { key: raw, reason }) => {
                    warn!(key = %raw, reason = %reason, "Dropping unreadable index job");
                    self.store.remove(key).await?;
                    pass.orphaned += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let product_id = job.payload.product();
            let Some(product) = self.store.load(&product_id).await? else {
                warn!(job = %key, product = %product_id, "Dropping index job for missing product");
                self.store.remove(key).await?;
                pass.orphaned += 1;
                continue;
            };

            self.index(key, &ProductDocument::from(&product)).await?;
            pass.indexed += 1;
            let remaining = self.store.count(QueueName::SearchLoader).await?;
            info!(slug = %product.slug, remaining, "Indexed product");
        }

        pass.remaining = self.store.count(QueueName::SearchLoader).await?;
        debug!(
            indexed = pass.indexed,
            skipped = pass.skipped,
            orphaned = pass.orphaned,
            remaining = pass.remaining,
            "Scan pass finished"
        );
        Ok(pass)
    }

    async fn index(&self, key: &JobKey, document: &ProductDocument) -> Result<(), IndexerError> {
        self.search.index_document(document).await?;
        self.store.remove(key).await?;
        Ok(())
    }

    /// Wait at least one `idle_interval` or until a producer signals, then
    /// keep waiting in `idle_interval` slices while the index queue is empty.
    pub async fn idle_backoff(&self) -> Result<usize, IndexerError> {
        let queue = QueueName::SearchLoader;
        let mut pending = self
            .store
            .wait_for_change(queue, self.config.idle_interval)
            .await?;
        while pending == 0 {
            pending = self
                .store
                .wait_for_jobs(queue, self.config.idle_interval)
                .await?;
        }
        debug!(pending, "Index queue has work");
        Ok(pending)
    }
}
