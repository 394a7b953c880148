//! Product repository trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StoreError;
use catalog_shared::Product;

/// Read access to persisted products.
///
/// Products are written through [`crate::WriteBatch`] as
/// [`crate::StoreOperation::SaveProduct`], which replaces any previous state.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Load a product by id. Returns `Ok(None)` if it does not exist.
    async fn load(&self, id: &Uuid) -> Result<Option<Product>, StoreError>;
}
