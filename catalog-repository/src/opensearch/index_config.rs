//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the product search index.

use serde_json::{json, Value};

/// Default name of the product index.
pub const DEFAULT_INDEX_NAME: &str = "products";

/// Index the client writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub name: String,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Settings and mappings used when the index is created.
    ///
    /// - **text** on brand, name and description, the searchable core
    /// - **search_as_you_type** subfield on name for autocomplete
    /// - **keyword** fields for filtering and exact lookups
    /// - `record` is stored but not indexed
    pub fn index_settings(&self) -> Value {
        json!({
            "settings": {
                "number_of_shards": 1,
                "number_of_replicas": 1
            },
            "mappings": {
                "properties": {
                    "id": { "type": "keyword" },
                    "brand": {
                        "type": "text",
                        "fields": { "raw": { "type": "keyword" } }
                    },
                    "name": {
                        "type": "text",
                        "fields": {
                            "raw": { "type": "keyword" },
                            "suggest": { "type": "search_as_you_type" }
                        }
                    },
                    "description": { "type": "text" },
                    "slug": { "type": "keyword" },
                    "category": { "type": "keyword" },
                    "price": { "type": "double" },
                    "currency": { "type": "keyword" },
                    "url": { "type": "keyword", "index": false },
                    "image_urls": { "type": "keyword", "index": false },
                    "shop_id": { "type": "long" },
                    "record": { "type": "object", "enabled": false },
                    "indexed_at": { "type": "date" }
                }
            }
        })
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME)
    }
}
