//! Configuration for the pipeline components.
//!
//! Each component receives its own immutable config value at construction.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of feed workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Records buffered before a flush is forced outside slow mode.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 200;

/// Lifetime of a memory telemetry sample.
pub const TELEMETRY_TTL: Duration = Duration::from_secs(60);

/// Maximum age of a cached feed payload.
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for the feed processor and its worker pool.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Number of long-lived feed workers.
    pub workers: usize,
    /// Flush once more than this many records are buffered.
    pub flush_threshold: usize,
    /// Flush after every record and sleep `delay_per_record` between records.
    pub slow_mode: bool,
    /// Delay applied after each record in slow mode.
    pub delay_per_record: Duration,
    /// Expiry of memory telemetry samples.
    pub telemetry_ttl: Duration,
    /// Capacity of the channel between the decompressing reader and a worker.
    pub line_buffer: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            slow_mode: true,
            delay_per_record: Duration::ZERO,
            telemetry_ttl: TELEMETRY_TTL,
            line_buffer: 256,
        }
    }
}

/// Configuration for the on-disk feed cache.
#[derive(Debug, Clone)]
pub struct FeedCacheConfig {
    /// Directory holding `{publisher_id}_{shop_id}.ljson.gz` files.
    pub dir: PathBuf,
    /// Payloads older than this are downloaded again.
    pub max_age: Duration,
}

impl FeedCacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }
}

/// Configuration for the search indexer loop.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// How long a single idle wait lasts before the queue size is checked again.
    pub idle_interval: Duration,
    /// How long a claimed job stays hidden from other indexers.
    pub visibility_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(5),
            visibility_timeout: Duration::from_secs(300),
        }
    }
}
