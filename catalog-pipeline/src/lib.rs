//! # Catalog Pipeline
//!
//! This crate provides the two halves of the catalog pipeline: the feed
//! ingester that turns shop feeds into products and queued jobs, and the
//! search indexer that drains the index queue into the search engine.
//!
//! ## Architecture
//!
//! 1. **Feed**: fetches the manifest, keeps per-feed payloads cached on disk
//!    and streams their records
//! 2. **Ingest**: a fixed pool of workers normalizes records into products
//!    and writes them, with their jobs, through batched store writes
//! 3. **Indexer**: claims `solr-loader` jobs, indexes the current product
//!    state and removes the job once committed

pub mod config;
pub mod errors;
pub mod feed;
pub mod indexer;
pub mod ingest;

pub use config::{FeedCacheConfig, IndexerConfig, IngestConfig};
pub use errors::{IndexerError, PipelineError, RecordError};
pub use indexer::SearchIndexer;
pub use ingest::FeedIngester;
