//! Write operations buffered for the store.

use std::time::Duration;

use catalog_shared::{Product, QueueJob};

/// Key prefix of persisted products.
pub const PRODUCT_KEY_PREFIX: &str = "product";

/// Key prefix of ingester memory samples.
pub const TELEMETRY_KEY_PREFIX: &str = "memory:ingester:feed";

/// A single buffered write.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Persist a product, replacing any previous state under its id.
    SaveProduct(Product),
    /// Insert a job into its queue.
    Enqueue(QueueJob),
    /// Publish a liveness sample that expires after `ttl`.
    RecordTelemetry {
        hostname: String,
        memory_bytes: u64,
        ttl: Duration,
    },
}

/// Store key of a product.
pub fn product_key(id: &uuid::Uuid) -> String {
    format!("{}:{}", PRODUCT_KEY_PREFIX, id)
}

/// Store key of a host's memory sample.
pub fn telemetry_key(hostname: &str) -> String {
    format!("{}:{}", TELEMETRY_KEY_PREFIX, hostname)
}
