//! Per-feed ingestion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use super::record::ingest_line;
use super::report::{FeedOutcome, FeedReport, RecordFailure};
use super::telemetry::MemorySampler;
use crate::config::IngestConfig;
use crate::errors::PipelineError;
use crate::feed::{FeedCache, FeedReader};
use catalog_repository::{CatalogStore, WriteBatch};
use catalog_shared::{FeedDescriptor, Product, QueueJob};

/// Processes one feed at a time: cache refresh, record ingestion and batched writes.
pub struct FeedProcessor {
    cache: Arc<FeedCache>,
    store: Arc<dyn CatalogStore>,
    config: IngestConfig,
}

impl FeedProcessor {
    pub fn new(cache: Arc<FeedCache>, store: Arc<dyn CatalogStore>, config: IngestConfig) -> Self {
        Self {
            cache,
            store,
            config,
        }
    }

    /// Process `feed` as of now.
    pub async fn process(&self, feed: &FeedDescriptor, sampler: &mut MemorySampler) -> FeedReport {
        self.process_at(feed, Utc::now(), sampler).await
    }

    /// Process `feed`, judging its validity window against `now`.
    ///
    /// Failures never escape: they end up in the report's outcome.
    #[instrument(skip_all, fields(feed = %feed.label()))]
    pub async fn process_at(
        &self,
        feed: &FeedDescriptor,
        now: DateTime<Utc>,
        sampler: &mut MemorySampler,
    ) -> FeedReport {
        if !feed.is_live_at(now) {
            info!(active = feed.active, "Skipping feed outside its validity window");
            return FeedReport::skipped(feed.label());
        }

        let mut report = FeedReport::new(feed.label());
        match self.ingest(feed, sampler, &mut report).await {
            Ok(()) => info!(
                records = report.records,
                ingested = report.ingested,
                failures = report.failures.len(),
                flushes = report.flushes,
                "Feed completed"
            ),
            Err(e) => {
                error!(error = %e, records = report.records, "Feed failed");
                report.outcome = FeedOutcome::Failed(e.to_string());
            }
        }
        report
    }

    async fn ingest(
        &self,
        feed: &FeedDescriptor,
        sampler: &mut MemorySampler,
        report: &mut FeedReport,
    ) -> Result<(), PipelineError> {
        report.cache = Some(self.cache.ensure_fresh(feed).await?);

        let mut reader = FeedReader::open(self.cache.path_for(feed), self.config.line_buffer);
        let mut batch: WriteBatch = WriteBatch::new(self.store.clone());
        let mut buffered = 0;

        let read_result = loop {
            let line = match reader.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            };
            report.records += 1;

            match ingest_line(feed, &line.bytes) {
                Ok(product) => {
                    self.buffer_product(&mut batch, product, sampler, report);
                    buffered += 1;
                }
                Err(error) => {
                    warn!(line = line.number, error = %error, "Skipping feed record");
                    report.failures.push(RecordFailure {
                        line: line.number,
                        error,
                    });
                }
            }

            if self.config.slow_mode || buffered > self.config.flush_threshold {
                batch.flush().await?;
                report.flushes = batch.flush_count();
                buffered = 0;
            }

            if self.config.slow_mode && !self.config.delay_per_record.is_zero() {
                tokio::time::sleep(self.config.delay_per_record).await;
            }
        };

        // Records read before a read error are still written.
        let flush_result = batch.flush().await;
        report.flushes = batch.flush_count();
        read_result?;
        flush_result?;
        Ok(())
    }

    fn buffer_product(
        &self,
        batch: &mut WriteBatch,
        product: Product,
        sampler: &mut MemorySampler,
        report: &mut FeedReport,
    ) {
        let id = product.id;
        let image_jobs: Vec<QueueJob> = product
            .cacheable_image_urls()
            .iter()
            .map(|url| QueueJob::image(url.clone(), id))
            .collect();

        batch.save_product(product);
        report.image_jobs += image_jobs.len();
        for job in image_jobs {
            batch.enqueue(job);
        }
        batch.enqueue(QueueJob::index(id));
        report.index_jobs += 1;
        report.ingested += 1;

        let memory = sampler.sample();
        batch.record_telemetry(sampler.hostname(), memory, self.config.telemetry_ttl);
    }
}
