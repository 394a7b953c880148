//! # Catalog Shared
//!
//! Shared types for the catalog ingestion pipeline: the canonical product
//! entity, feed descriptors from the manifest, queue jobs exchanged through
//! the shared store, and the document shape written to the search engine.

pub mod document;
pub mod feed;
pub mod product;
pub mod queue;

pub use document::ProductDocument;
pub use feed::FeedDescriptor;
pub use product::Product;
pub use queue::{JobKey, JobPayload, QueueJob, QueueName};
