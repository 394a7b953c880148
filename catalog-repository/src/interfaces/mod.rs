//! Interface definitions for the store and the search engine client.
//!
//! These traits are the seams between the pipeline and its backends, so
//! Redis/OpenSearch can be swapped for in-memory or mock implementations.

mod batch_writer;
mod product_repository;
mod queue_store;
mod search_engine_client;

pub use batch_writer::BatchWriter;
pub use product_repository::ProductRepository;
pub use queue_store::QueueStore;
pub use search_engine_client::SearchEngineClient;

/// Everything the pipeline needs from the shared store.
pub trait CatalogStore: QueueStore + ProductRepository + BatchWriter {}

impl<T> CatalogStore for T where T: QueueStore + ProductRepository + BatchWriter + ?Sized {}
