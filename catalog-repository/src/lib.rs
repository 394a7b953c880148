//! # Catalog Repository
//!
//! Traits and implementations for the shared state of the catalog pipeline:
//! the work queue, the product repository, batched writes into both, and the
//! search engine. Redis and OpenSearch back production; [`MemoryStore`] backs
//! tests and local runs.

pub mod batch;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod redis_store;
pub mod types;

pub use batch::WriteBatch;
pub use errors::{SearchError, StoreError};
pub use interfaces::{BatchWriter, CatalogStore, ProductRepository, QueueStore, SearchEngineClient};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use self::opensearch::{IndexConfig, OpenSearchClient};
pub use types::StoreOperation;
