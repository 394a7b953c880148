//! Per-feed and per-run ingestion reports.

use crate::errors::RecordError;
use crate::feed::CacheStatus;

/// How a feed ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Inactive or outside its validity window.
    Skipped,
    /// Every line was read; individual records may still have failed.
    Completed,
    /// The feed stopped early.
    Failed(String),
}

/// A record that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub line: usize,
    pub error: RecordError,
}

/// Result of processing one feed.
#[derive(Debug, Clone)]
pub struct FeedReport {
    /// `publisher_id/shop_id`.
    pub feed: String,
    pub outcome: FeedOutcome,
    pub cache: Option<CacheStatus>,
    /// Non-blank lines read.
    pub records: usize,
    /// Products saved, including ones still buffered if a flush later failed.
    pub ingested: usize,
    pub index_jobs: usize,
    pub image_jobs: usize,
    pub failures: Vec<RecordFailure>,
    pub flushes: usize,
}

impl FeedReport {
    pub fn new(feed: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            outcome: FeedOutcome::Completed,
            cache: None,
            records: 0,
            ingested: 0,
            index_jobs: 0,
            image_jobs: 0,
            failures: Vec::new(),
            flushes: 0,
        }
    }

    pub fn skipped(feed: impl Into<String>) -> Self {
        Self {
            outcome: FeedOutcome::Skipped,
            ..Self::new(feed)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FeedOutcome::Failed(_))
    }
}

/// Result of one ingestion run, one entry per dispatched feed.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub feeds: Vec<FeedReport>,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.count(|f| f.outcome == FeedOutcome::Completed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|f| f.outcome == FeedOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(FeedReport::is_failed)
    }

    pub fn ingested(&self) -> usize {
        self.feeds.iter().map(|f| f.ingested).sum()
    }

    pub fn record_failures(&self) -> usize {
        self.feeds.iter().map(|f| f.failures.len()).sum()
    }

    /// Report for `feed` (`publisher_id/shop_id`), if it was dispatched.
    pub fn feed(&self, feed: &str) -> Option<&FeedReport> {
        self.feeds.iter().find(|f| f.feed == feed)
    }

    fn count(&self, predicate: impl Fn(&FeedReport) -> bool) -> usize {
        self.feeds.iter().filter(|f| predicate(f)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_totals() {
        let mut completed = FeedReport::new("1/1");
        completed.ingested = 3;
        completed.failures.push(RecordFailure {
            line: 2,
            error: RecordError::MissingField("id"),
        });
        let mut failed = FeedReport::new("1/2");
        failed.outcome = FeedOutcome::Failed("Download error: 503".to_string());
        failed.ingested = 1;

        let report = RunReport {
            feeds: vec![completed, failed, FeedReport::skipped("1/3")],
        };

        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.ingested(), 4);
        assert_eq!(report.record_failures(), 1);
        assert!(report.feed("1/2").unwrap().is_failed());
        assert!(report.feed("9/9").is_none());
    }
}
