//! Feed descriptors published by the feed aggregator.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Key of the compressed line-delimited JSON payload in a descriptor's feed URLs.
pub const JSON_GZ_FORMAT: &str = "json.gz";

/// One shop feed as listed in the manifest.
///
/// Descriptors are refetched on every run and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub publisher_id: u64,
    pub shop_id: u64,
    #[serde(default)]
    pub active: bool,
    /// Start of the validity window. `None` means no lower bound.
    #[serde(default, deserialize_with = "deserialize_feed_date")]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the validity window. `None` means no upper bound.
    #[serde(default, deserialize_with = "deserialize_feed_date")]
    pub end_date: Option<DateTime<Utc>>,
    /// Payload URLs keyed by format name.
    #[serde(rename = "feeds", default)]
    pub feed_urls: HashMap<String, String>,
}

impl FeedDescriptor {
    /// Whether the feed should be processed at `now`.
    ///
    /// The feed must be active and `now` must fall inside `[start_date, end_date]`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if self.start_date.is_some_and(|start| now < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| now > end) {
            return false;
        }
        true
    }

    /// URL of the compressed line-delimited JSON payload, if published.
    pub fn json_gz_url(&self) -> Option<&str> {
        self.feed_urls.get(JSON_GZ_FORMAT).map(String::as_str)
    }

    /// File name of this feed's cache entry.
    pub fn cache_file_name(&self) -> String {
        format!("{}_{}.ljson.gz", self.publisher_id, self.shop_id)
    }

    /// Human-readable identifier for logs.
    pub fn label(&self) -> String {
        format!("{}/{}", self.publisher_id, self.shop_id)
    }
}

/// Parse a manifest date.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`, all read as UTC.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

fn deserialize_feed_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_feed_date(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid feed date: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn descriptor() -> FeedDescriptor {
        serde_json::from_str(
            r#"{
                "publisher_id": 1885,
                "shop_id": 42,
                "active": true,
                "start_date": "2024-01-01",
                "end_date": "2030-12-31 23:59:59",
                "feeds": {"json.gz": "https://feeds.example.com/42.ljson.gz"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_deserialize_manifest_entry() {
        let feed = descriptor();
        assert_eq!(feed.publisher_id, 1885);
        assert_eq!(feed.shop_id, 42);
        assert_eq!(
            feed.start_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(feed.json_gz_url(), Some("https://feeds.example.com/42.ljson.gz"));
        assert_eq!(feed.cache_file_name(), "1885_42.ljson.gz");
    }

    #[test]
    fn test_is_live_at() {
        let feed = descriptor();
        let inside = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert!(feed.is_live_at(inside));

        let before = feed.start_date.unwrap() - Duration::seconds(1);
        assert!(!feed.is_live_at(before));

        let after = feed.end_date.unwrap() + Duration::seconds(1);
        assert!(!feed.is_live_at(after));

        let inactive = FeedDescriptor {
            active: false,
            ..feed
        };
        assert!(!inactive.is_live_at(inside));
    }

    #[test]
    fn test_open_bounds() {
        let feed: FeedDescriptor = serde_json::from_str(
            r#"{"publisher_id": 1, "shop_id": 2, "active": true, "start_date": null, "end_date": ""}"#,
        )
        .unwrap();
        assert!(feed.start_date.is_none());
        assert!(feed.end_date.is_none());
        assert!(feed.is_live_at(Utc::now()));
        assert!(feed.json_gz_url().is_none());
    }

    #[test]
    fn test_parse_feed_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_feed_date("2024-03-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_feed_date("2024-03-05T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_feed_date("2024-03-05 10:30:00"), Some(expected));
        assert!(parse_feed_date("next tuesday").is_none());
    }

    #[test]
    fn test_invalid_date_rejected() {
        let result = serde_json::from_str::<FeedDescriptor>(
            r#"{"publisher_id": 1, "shop_id": 2, "start_date": "soon"}"#,
        );
        assert!(result.is_err());
    }
}
