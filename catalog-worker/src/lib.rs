//! # Catalog Worker
//!
//! Entry point and configuration for the catalog pipeline.
//!
//! The binary runs one of two commands: `ingest` performs one pass over the
//! feed manifest, `index` drains the index queue into the search engine
//! until stopped.

pub mod config;

pub use config::{Command, Dependencies, LogFormat, Settings};

use thiserror::Error;

/// Errors that can occur during worker initialization or execution.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingestion error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] catalog_pipeline::PipelineError),

    /// Indexer error.
    #[error("Indexer error: {0}")]
    IndexerError(#[from] catalog_pipeline::IndexerError),

    /// Store error.
    #[error("Store error: {0}")]
    StoreError(#[from] catalog_repository::StoreError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] catalog_repository::SearchError),
}

impl WorkerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
