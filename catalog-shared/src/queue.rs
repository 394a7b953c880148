//! Queue jobs exchanged through the shared store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix shared by every queue key.
pub const QUEUE_KEY_PREFIX: &str = "queue";

/// The queues the pipeline produces into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueName {
    /// Images to fetch and cache, consumed by the image worker.
    Image,
    /// Products to (re)index, consumed by the search indexer.
    SearchLoader,
}

impl QueueName {
    /// Wire name of the queue as it appears in store keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Image => "image-worker",
            QueueName::SearchLoader => "solr-loader",
        }
    }

    /// Key pattern matching every pending job of this queue.
    pub fn key_pattern(&self) -> String {
        format!("{}:{}:*", QUEUE_KEY_PREFIX, self.as_str())
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image-worker" => Ok(QueueName::Image),
            "solr-loader" => Ok(QueueName::SearchLoader),
            other => Err(format!("unknown queue: {}", other)),
        }
    }
}

/// Address of a single job in the store: `queue:{queue}:{job_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub queue: QueueName,
    pub job_id: Uuid,
}

impl JobKey {
    pub fn new(queue: QueueName, job_id: Uuid) -> Self {
        Self { queue, job_id }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", QUEUE_KEY_PREFIX, self.queue, self.job_id)
    }
}

impl FromStr for JobKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(QUEUE_KEY_PREFIX), Some(queue), Some(job_id)) => {
                let queue = queue.parse()?;
                let job_id = Uuid::parse_str(job_id)
                    .map_err(|e| format!("invalid job id in {}: {}", s, e))?;
                Ok(Self { queue, job_id })
            }
            _ => Err(format!("not a queue key: {}", s)),
        }
    }
}

/// Work carried by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPayload {
    /// Fetch and cache `url` for `product`.
    Image { url: String, product: Uuid },
    /// Index the current state of `product`.
    Index { product: Uuid },
}

impl JobPayload {
    /// The queue this payload belongs on.
    pub fn queue(&self) -> QueueName {
        match self {
            JobPayload::Image { .. } => QueueName::Image,
            JobPayload::Index { .. } => QueueName::SearchLoader,
        }
    }

    /// The product the job refers to.
    pub fn product(&self) -> Uuid {
        match self {
            JobPayload::Image { product, .. } | JobPayload::Index { product } => *product,
        }
    }

    /// Hash fields stored under the job key.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            JobPayload::Image { url, product } => {
                vec![("url", url.clone()), ("product", product.to_string())]
            }
            JobPayload::Index { product } => vec![("product", product.to_string())],
        }
    }

    /// Rebuild a payload from stored hash fields.
    pub fn from_fields<'a, I>(queue: QueueName, fields: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut url = None;
        let mut product = None;
        for (name, value) in fields {
            match name {
                "url" => url = Some(value.to_string()),
                "product" => {
                    product = Some(
                        Uuid::parse_str(value)
                            .map_err(|e| format!("invalid product id {}: {}", value, e))?,
                    )
                }
                _ => {}
            }
        }

        let product = product.ok_or_else(|| "missing product field".to_string())?;
        match queue {
            QueueName::Image => {
                let url = url.ok_or_else(|| "missing url field".to_string())?;
                Ok(JobPayload::Image { url, product })
            }
            QueueName::SearchLoader => Ok(JobPayload::Index { product }),
        }
    }
}

/// A uniquely identified unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueJob {
    pub job_id: Uuid,
    pub payload: JobPayload,
}

impl QueueJob {
    /// Create a job with a fresh random id.
    pub fn new(payload: JobPayload) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            payload,
        }
    }

    /// Image job for `product`.
    pub fn image(url: impl Into<String>, product: Uuid) -> Self {
        Self::new(JobPayload::Image {
            url: url.into(),
            product,
        })
    }

    /// Indexing job for `product`.
    pub fn index(product: Uuid) -> Self {
        Self::new(JobPayload::Index { product })
    }

    pub fn queue(&self) -> QueueName {
        self.payload.queue()
    }

    pub fn key(&self) -> JobKey {
        JobKey::new(self.queue(), self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_format() {
        let job_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let key = JobKey::new(QueueName::SearchLoader, job_id);

        assert_eq!(
            key.to_string(),
            "queue:solr-loader:550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(key.to_string().parse::<JobKey>().unwrap(), key);
    }

    #[test]
    fn test_job_key_rejects_foreign_keys() {
        assert!("product:550e8400-e29b-41d4-a716-446655440000"
            .parse::<JobKey>()
            .is_err());
        assert!("queue:unknown:550e8400-e29b-41d4-a716-446655440000"
            .parse::<JobKey>()
            .is_err());
        assert!("queue:image-worker:not-a-uuid".parse::<JobKey>().is_err());
    }

    #[test]
    fn test_key_pattern() {
        assert_eq!(QueueName::Image.key_pattern(), "queue:image-worker:*");
        assert_eq!(QueueName::SearchLoader.key_pattern(), "queue:solr-loader:*");
    }

    #[test]
    fn test_payload_fields() {
        let product = Uuid::new_v4();
        let payload = JobPayload::Image {
            url: "https://img.example.com/a.jpg".to_string(),
            product,
        };
        let fields = payload.to_fields();
        let rebuilt = JobPayload::from_fields(
            QueueName::Image,
            fields.iter().map(|(k, v)| (*k, v.as_str())),
        )
        .unwrap();
        assert_eq!(rebuilt, payload);

        let missing = JobPayload::from_fields(QueueName::Image, [("product", "nope")]);
        assert!(missing.is_err());
    }

    #[test]
    fn test_jobs_get_unique_ids() {
        let product = Uuid::new_v4();
        let a = QueueJob::index(product);
        let b = QueueJob::index(product);
        assert_ne!(a.job_id, b.job_id);
        assert_eq!(a.queue(), QueueName::SearchLoader);
    }
}
