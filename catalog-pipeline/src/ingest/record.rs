//! Normalization of raw feed records into products.

use chrono::Utc;
use serde_json::{Map, Value};
use url::Url;

use crate::errors::RecordError;
use catalog_shared::product::slugify;
use catalog_shared::{FeedDescriptor, Product};

const ID_KEYS: &[&str] = &["id", "sku", "product_id", "offer_id"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const IMAGE_KEYS: &[&str] = &["image_link", "image_url", "image"];
const ADDITIONAL_IMAGE_KEYS: &[&str] = &["additional_image_links"];
const LINK_KEYS: &[&str] = &["link", "deeplink", "url"];

/// Turn one feed line into a product.
pub fn ingest_line(feed: &FeedDescriptor, line: &[u8]) -> Result<Product, RecordError> {
    let value: Value =
        serde_json::from_slice(line).map_err(|e| RecordError::Malformed(e.to_string()))?;
    let Value::Object(record) = value else {
        return Err(RecordError::Malformed("record is not a JSON object".to_string()));
    };

    let source_id = text(&record, ID_KEYS)?.ok_or(RecordError::MissingField("id"))?;
    let name = text(&record, TITLE_KEYS)?.ok_or(RecordError::MissingField("title"))?;
    let brand = text(&record, &["brand"])?;
    let description = text(&record, &["description"])?;
    let category = text(&record, &["category"])?;
    let currency = text(&record, &["currency"])?;
    let ean = text(&record, &["ean"])?;
    let url = text(&record, LINK_KEYS)?;
    let price = price(&record)?;
    let image_urls = image_urls(&record)?;

    let id = Product::derive_id(feed.publisher_id, feed.shop_id, &source_id);
    let slug = match slugify(&format!("{} {}", brand.as_deref().unwrap_or_default(), name)) {
        slug if !slug.is_empty() => slug,
        _ => match slugify(&source_id) {
            slug if !slug.is_empty() => slug,
            _ => id.simple().to_string(),
        },
    };

    Ok(Product {
        id,
        source_id,
        publisher_id: feed.publisher_id,
        shop_id: feed.shop_id,
        brand,
        name,
        description,
        slug,
        category,
        price,
        currency,
        url,
        ean,
        image_urls,
        record: Value::Object(record),
        ingested_at: Utc::now(),
    })
}

/// First non-empty value among `keys`, as trimmed text.
fn text(record: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, RecordError> {
    for key in keys {
        match record.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => {
                let s = s.trim();
                if !s.is_empty() {
                    return Ok(Some(s.to_string()));
                }
            }
            Some(Value::Number(n)) => return Ok(Some(n.to_string())),
            Some(_) => {
                return Err(RecordError::Malformed(format!(
                    "`{}` must be a string",
                    key
                )))
            }
        }
    }
    Ok(None)
}

fn price(record: &Map<String, Value>) -> Result<Option<f64>, RecordError> {
    match record.get("price") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => Ok(parse_price(s)),
        Some(_) => Err(RecordError::Malformed("`price` must be a number".to_string())),
    }
}

/// Read the leading amount of a price string such as `"12,99 EUR"`.
fn parse_price(raw: &str) -> Option<f64> {
    let amount: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    amount.parse().ok()
}

fn image_urls(record: &Map<String, Value>) -> Result<Vec<String>, RecordError> {
    let mut candidates = Vec::new();
    if let Some(main) = text(record, IMAGE_KEYS)? {
        candidates.push(main);
    }
    for key in ADDITIONAL_IMAGE_KEYS {
        match record.get(*key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => {
                candidates.extend(s.split(',').map(|part| part.trim().to_string()))
            }
            Some(Value::Array(items)) => {
                for item in items {
                    match item {
                        Value::String(s) => candidates.push(s.trim().to_string()),
                        Value::Null => {}
                        _ => {
                            return Err(RecordError::Malformed(format!(
                                "`{}` must contain strings",
                                key
                            )))
                        }
                    }
                }
            }
            Some(_) => {
                return Err(RecordError::Malformed(format!(
                    "`{}` must be a list",
                    key
                )))
            }
        }
    }

    let mut urls: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if is_cacheable(&candidate) && !urls.contains(&candidate) {
            urls.push(candidate);
        }
    }
    Ok(urls)
}

fn is_cacheable(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn feed() -> FeedDescriptor {
        FeedDescriptor {
            publisher_id: 1885,
            shop_id: 42,
            active: true,
            start_date: None,
            end_date: None,
            feed_urls: HashMap::new(),
        }
    }

    #[test]
    fn test_ingest_full_record() {
        let line = br#"{
            "id": "SKU-1",
            "title": "Road Bike 3000",
            "brand": "Acme",
            "description": "Light and fast",
            "image_link": "https://img.example.com/1.jpg",
            "additional_image_links": ["https://img.example.com/2.jpg"],
            "price": "1.299,00 EUR",
            "currency": "EUR",
            "link": "https://shop.example.com/p/1",
            "category": "Bikes",
            "ean": 4006381333931
        }"#;

        let product = ingest_line(&feed(), line).unwrap();

        assert_eq!(product.id, Product::derive_id(1885, 42, "SKU-1"));
        assert_eq!(product.source_id, "SKU-1");
        assert_eq!(product.publisher_id, 1885);
        assert_eq!(product.shop_id, 42);
        assert_eq!(product.name, "Road Bike 3000");
        assert_eq!(product.brand.as_deref(), Some("Acme"));
        assert_eq!(product.slug, "acme-road-bike-3000");
        assert_eq!(product.url.as_deref(), Some("https://shop.example.com/p/1"));
        assert_eq!(product.ean.as_deref(), Some("4006381333931"));
        assert_eq!(product.category.as_deref(), Some("Bikes"));
        assert_eq!(
            product.image_urls,
            vec![
                "https://img.example.com/1.jpg".to_string(),
                "https://img.example.com/2.jpg".to_string()
            ]
        );
        assert_eq!(product.record["brand"], "Acme");
    }

    #[test]
    fn test_aliases_are_recognised() {
        let line = br#"{"sku": 77, "name": "Lamp", "image_url": "http://img.example.com/l.png", "deeplink": "https://shop.example.com/l"}"#;

        let product = ingest_line(&feed(), line).unwrap();

        assert_eq!(product.source_id, "77");
        assert_eq!(product.name, "Lamp");
        assert_eq!(product.slug, "lamp");
        assert_eq!(product.image_urls, vec!["http://img.example.com/l.png".to_string()]);
        assert_eq!(product.url.as_deref(), Some("https://shop.example.com/l"));
    }

    #[test]
    fn test_image_urls_are_distinct_and_absolute() {
        let line = br#"{
            "id": "1",
            "title": "Chair",
            "image_link": "https://img.example.com/a.jpg",
            "additional_image_links": "https://img.example.com/a.jpg, /relative.jpg, ftp://img.example.com/b.jpg, https://img.example.com/c.jpg"
        }"#;

        let product = ingest_line(&feed(), line).unwrap();

        assert_eq!(
            product.image_urls,
            vec![
                "https://img.example.com/a.jpg".to_string(),
                "https://img.example.com/c.jpg".to_string()
            ]
        );
    }

    #[test]
    fn test_price_parsing() {
        assert_eq!(parse_price("12,99 EUR"), Some(12.99));
        assert_eq!(parse_price("  5"), Some(5.0));
        assert_eq!(parse_price("EUR 5"), None);
        assert_eq!(parse_price(""), None);

        let product = ingest_line(&feed(), br#"{"id": "1", "title": "T", "price": 9.5}"#).unwrap();
        assert_eq!(product.price, Some(9.5));
    }

    #[test]
    fn test_slug_falls_back_to_source_id() {
        let product = ingest_line(&feed(), br#"{"id": "ABC-9", "title": "!!!"}"#).unwrap();
        assert_eq!(product.slug, "abc-9");
    }

    #[test]
    fn test_malformed_records() {
        assert!(matches!(
            ingest_line(&feed(), b"{not json"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            ingest_line(&feed(), b"[1, 2, 3]"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            ingest_line(&feed(), b"\xff\xfe{}"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            ingest_line(&feed(), br#"{"id": "1", "title": {"en": "x"}}"#),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            ingest_line(&feed(), br#"{"id": "1", "title": "x", "price": [1]}"#),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            ingest_line(&feed(), br#"{"title": "No id"}"#).unwrap_err(),
            RecordError::MissingField("id")
        );
        assert_eq!(
            ingest_line(&feed(), br#"{"id": "  ", "title": "Blank id"}"#).unwrap_err(),
            RecordError::MissingField("id")
        );
        assert_eq!(
            ingest_line(&feed(), br#"{"id": "1"}"#).unwrap_err(),
            RecordError::MissingField("title")
        );
    }
}
