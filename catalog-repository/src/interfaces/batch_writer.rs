//! Batched write trait definition.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::StoreOperation;

/// Applies a group of buffered writes in a single round trip.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Apply `operations` in order.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every operation was written
    /// * `Err(StoreError)` - If the store rejected the batch or could not be reached
    async fn apply(&self, operations: &[StoreOperation]) -> Result<(), StoreError>;
}
