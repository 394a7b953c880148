//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, mocks, etc.).

use async_trait::async_trait;

use crate::errors::SearchError;
use catalog_shared::ProductDocument;

/// Abstract interface for search engine operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, SearchError>` for consistent error handling.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Index a single document and commit it so it is immediately searchable.
    ///
    /// If a document with the same id already exists, it is replaced.
    ///
    /// # Arguments
    ///
    /// * `document` - The product document to index
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was indexed and committed
    /// * `Err(SearchError)` - If indexing fails
    async fn index_document(&self, document: &ProductDocument) -> Result<(), SearchError>;

    /// Ensure the search index exists with proper mappings.
    ///
    /// This should be called during application startup.
    async fn ensure_index_exists(&self) -> Result<(), SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
