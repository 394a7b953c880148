//! Command-line and environment settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use catalog_pipeline::config::{DEFAULT_FLUSH_THRESHOLD, TELEMETRY_TTL};
use catalog_pipeline::feed::FeedCredentials;
use catalog_pipeline::{FeedCacheConfig, IndexerConfig, IngestConfig};

/// Default Redis URL.
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch the feed manifest and ingest every live feed once
    Ingest,
    /// Index queued products until stopped
    Index,
}

/// Every option can also be set through the environment variable shown in `--help`.
#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-worker")]
#[command(about = "Product catalog feed ingestion and search indexing", long_about = None)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Feed manifest URL, required by `ingest`
    #[arg(long, env = "FEED_MANIFEST_URL", global = true)]
    pub manifest_url: Option<String>,

    /// Feed aggregator user name
    #[arg(long, env = "FEED_USERNAME", global = true)]
    pub feed_username: Option<String>,

    /// Feed aggregator password
    #[arg(long, env = "FEED_PASSWORD", hide_env_values = true, global = true)]
    pub feed_password: Option<String>,

    /// Number of feeds processed in parallel
    #[arg(long, env = "FEED_WORKERS", default_value_t = catalog_pipeline::config::DEFAULT_WORKERS, global = true)]
    pub workers: usize,

    /// Flush after every record and apply the per-record delay
    #[arg(long, env = "SLOW_MODE", default_value_t = true, action = ArgAction::Set, global = true)]
    pub slow_mode: bool,

    /// Delay after each record in slow mode, in milliseconds
    #[arg(long, env = "DELAY_PER_ITEM_MS", default_value_t = 0, global = true)]
    pub delay_per_item_ms: u64,

    /// Directory for cached feed payloads
    #[arg(long, env = "CACHE_DIR", default_value = "./cache", global = true)]
    pub cache_dir: PathBuf,

    /// Cached payloads older than this are downloaded again, in seconds
    #[arg(long, env = "CACHE_MAX_AGE_SECS", default_value_t = 86_400, global = true)]
    pub cache_max_age_secs: u64,

    /// Timeout for manifest and feed requests, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub http_timeout_secs: u64,

    /// Redis URL of the queue and product store
    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_REDIS_URL, global = true)]
    pub redis_url: String,

    /// OpenSearch URL
    #[arg(long, env = "OPENSEARCH_URL", default_value = DEFAULT_OPENSEARCH_URL, global = true)]
    pub opensearch_url: String,

    /// Search index name
    #[arg(long, env = "OPENSEARCH_INDEX", default_value = "products", global = true)]
    pub opensearch_index: String,

    /// Length of one idle wait on an empty queue, in seconds
    #[arg(long, env = "INDEXER_IDLE_SECS", default_value_t = 5, global = true)]
    pub indexer_idle_secs: u64,

    /// How long a claimed index job stays hidden from other indexers, in seconds
    #[arg(long, env = "INDEXER_VISIBILITY_SECS", default_value_t = 300, global = true)]
    pub indexer_visibility_secs: u64,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

impl Settings {
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            workers: self.workers.max(1),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            slow_mode: self.slow_mode,
            delay_per_record: Duration::from_millis(self.delay_per_item_ms),
            telemetry_ttl: TELEMETRY_TTL,
            ..IngestConfig::default()
        }
    }

    pub fn cache_config(&self) -> FeedCacheConfig {
        FeedCacheConfig {
            dir: self.cache_dir.clone(),
            max_age: Duration::from_secs(self.cache_max_age_secs),
        }
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            idle_interval: Duration::from_secs(self.indexer_idle_secs.max(1)),
            visibility_timeout: Duration::from_secs(self.indexer_visibility_secs.max(1)),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Explicit feed credentials, if a user name was given.
    pub fn credentials(&self) -> Option<FeedCredentials> {
        self.feed_username.as_ref().map(|username| FeedCredentials {
            username: username.clone(),
            password: self.feed_password.clone().unwrap_or_default(),
        })
    }
}
