//! Fixed pool of feed workers fed through a bounded channel.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument};

use super::processor::FeedProcessor;
use super::report::{FeedReport, RunReport};
use super::telemetry::MemorySampler;
use crate::errors::PipelineError;
use catalog_shared::FeedDescriptor;

/// Hands feed descriptors to `workers` long-lived tasks.
///
/// The channel holds at most one pending descriptor per worker, so the
/// dispatcher waits whenever every worker is busy.
pub struct FeedDispatcher {
    processor: Arc<FeedProcessor>,
    workers: usize,
}

impl FeedDispatcher {
    pub fn new(processor: Arc<FeedProcessor>, workers: usize) -> Self {
        Self {
            processor,
            workers: workers.max(1),
        }
    }

    /// Process every feed and wait for all workers to drain.
    #[instrument(skip_all, fields(feeds = feeds.len(), workers = self.workers))]
    pub async fn dispatch(&self, feeds: Vec<FeedDescriptor>) -> Result<RunReport, PipelineError> {
        let (tx, rx) = mpsc::channel::<FeedDescriptor>(self.workers);
        let rx = Arc::new(Mutex::new(rx));

        let handles: Vec<_> = (0..self.workers)
            .map(|worker| {
                let rx = rx.clone();
                let processor = self.processor.clone();
                tokio::spawn(async move { run_worker(worker, rx, processor).await })
            })
            .collect();

        for feed in feeds {
            tx.send(feed)
                .await
                .map_err(|e| PipelineError::ChannelError(format!("All feed workers stopped: {}", e)))?;
        }
        drop(tx);

        let mut report = RunReport::default();
        for (worker, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(feeds) => report.feeds.extend(feeds),
                Err(e) => {
                    error!(worker, error = %e, "Feed worker terminated abnormally");
                    return Err(PipelineError::worker(format!("worker {}: {}", worker, e)));
                }
            }
        }

        info!(
            completed = report.completed(),
            skipped = report.skipped(),
            failed = report.failed(),
            ingested = report.ingested(),
            "Ingestion run finished"
        );
        Ok(report)
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<FeedDescriptor>>>,
    processor: Arc<FeedProcessor>,
) -> Vec<FeedReport> {
    let mut sampler = MemorySampler::new();
    let mut reports = Vec::new();

    loop {
        // The lock is released before the feed is processed.
        let next = rx.lock().await.recv().await;
        let Some(feed) = next else {
            break;
        };
        debug!(worker, feed = %feed.label(), "Worker picked up feed");
        reports.push(processor.process(&feed, &mut sampler).await);
    }

    debug!(worker, feeds = reports.len(), "Feed worker finished");
    reports
}
