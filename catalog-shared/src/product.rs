//! Canonical product entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Namespace for product identifiers.
///
/// Product ids are UUID v5 values under this namespace, so the same source
/// record always maps onto the same product.
pub const PRODUCT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a8e_53d4_4b0f_9a61_0c7e_b2d4_1f38);

/// A product normalized from a shop feed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier.
    pub id: Uuid,
    /// Identifier of the record inside the shop feed.
    pub source_id: String,
    /// Publisher that owns the feed.
    pub publisher_id: u64,
    /// Shop the record was published by.
    pub shop_id: u64,
    pub brand: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// URL-safe name used by presentation routes.
    pub slug: String,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    /// Deep link to the product on the shop.
    pub url: Option<String>,
    pub ean: Option<String>,
    /// Distinct image URLs, in feed order.
    pub image_urls: Vec<String>,
    /// The raw feed record this product was built from.
    pub record: Value,
    /// When the product was last ingested.
    pub ingested_at: DateTime<Utc>,
}

impl Product {
    /// Derive the product id for a record of a shop feed.
    pub fn derive_id(publisher_id: u64, shop_id: u64, source_id: &str) -> Uuid {
        let name = format!("{}:{}:{}", publisher_id, shop_id, source_id);
        Uuid::new_v5(&PRODUCT_NAMESPACE, name.as_bytes())
    }

    /// Image URLs that the image worker should fetch and cache.
    pub fn cacheable_image_urls(&self) -> &[String] {
        &self.image_urls
    }
}

/// Build a slug from free text.
///
/// ASCII alphanumerics are lowercased; every other run of characters
/// collapses into a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
