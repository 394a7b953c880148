//! Search document representation of a product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::product::Product;

/// Document stored in the search index, one per product.
///
/// `brand`, `name` and `description` are the searchable core; the remaining
/// fields are carried for filtering and display, and `record` holds the full
/// feed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    /// Document id, equal to the product id.
    pub id: Uuid,
    pub brand: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub url: Option<String>,
    pub image_urls: Vec<String>,
    pub shop_id: u64,
    pub record: Value,
    pub indexed_at: DateTime<Utc>,
}

impl From<&Product> for ProductDocument {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            brand: product.brand.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            slug: product.slug.clone(),
            category: product.category.clone(),
            price: product.price,
            currency: product.currency.clone(),
            url: product.url.clone(),
            image_urls: product.image_urls.clone(),
            shop_id: product.shop_id,
            record: product.record.clone(),
            indexed_at: Utc::now(),
        }
    }
}
