//! Batched write handle.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::errors::StoreError;
use crate::interfaces::{BatchWriter, CatalogStore};
use crate::types::StoreOperation;
use catalog_shared::{Product, QueueJob};

/// Buffers store writes and applies them together on [`WriteBatch::flush`].
///
/// Nothing reaches the store until a flush; the caller decides the flush
/// policy.
pub struct WriteBatch<W: BatchWriter + ?Sized = dyn CatalogStore> {
    writer: Arc<W>,
    operations: Vec<StoreOperation>,
    flushes: usize,
}

impl<W: BatchWriter + ?Sized> WriteBatch<W> {
    /// Create an empty batch writing into `writer`.
    pub fn new(writer: Arc<W>) -> Self {
        Self {
            writer,
            operations: Vec::new(),
            flushes: 0,
        }
    }

    /// Buffer an arbitrary operation.
    pub fn push(&mut self, operation: StoreOperation) {
        self.operations.push(operation);
    }

    /// Buffer a product save.
    pub fn save_product(&mut self, product: Product) {
        self.push(StoreOperation::SaveProduct(product));
    }

    /// Buffer a job insert.
    pub fn enqueue(&mut self, job: QueueJob) {
        self.push(StoreOperation::Enqueue(job));
    }

    /// Buffer a telemetry sample.
    pub fn record_telemetry(&mut self, hostname: impl Into<String>, memory_bytes: u64, ttl: Duration) {
        self.push(StoreOperation::RecordTelemetry {
            hostname: hostname.into(),
            memory_bytes,
            ttl,
        });
    }

    /// Number of buffered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of non-empty flushes performed so far.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Apply every buffered operation and clear the buffer.
    ///
    /// Returns the number of operations written. On error the buffer is
    /// left untouched.
    pub async fn flush(&mut self) -> Result<usize, StoreError> {
        if self.operations.is_empty() {
            return Ok(0);
        }

        self.writer.apply(&self.operations).await?;

        let written = self.operations.len();
        self.operations.clear();
        self.flushes += 1;

        debug!(operations = written, flushes = self.flushes, "Flushed write batch");
        Ok(written)
    }
}
