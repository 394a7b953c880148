//! Redis implementation of the catalog store.
//!
//! Key layout:
//!
//! - `queue:{queue}:{job_id}`: hash holding the job payload fields
//! - `claim:{queue}:{job_id}`: consumer id, set with `NX PX` for the visibility timeout
//! - `notify:{queue}`: list holding at most one wake-up token
//! - `product:{uuid}`: JSON encoded product
//! - `memory:ingester:feed:{hostname}`: resident bytes, with expiry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{AsyncCommands, Client, Pipeline};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::interfaces::{BatchWriter, ProductRepository, QueueStore};
use crate::types::{product_key, telemetry_key, StoreOperation};
use catalog_shared::{JobKey, JobPayload, Product, QueueJob, QueueName};

/// Redis-backed queue store and product repository.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    connection: ConnectionManager,
    /// Connection reserved for `BLPOP`, opened on first use.
    blocking: Arc<Mutex<Option<MultiplexedConnection>>>,
    consumer_id: String,
}

impl RedisStore {
    /// Connect to the Redis server at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Returns
    ///
    /// * `Ok(RedisStore)` - A connected store
    /// * `Err(StoreError)` - If the URL is invalid or the server is unreachable
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| StoreError::connection(e.to_string()))?;
        let connection = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        let consumer_id = Uuid::new_v4().to_string();
        info!(url = %url, consumer_id = %consumer_id, "Connected to Redis");

        Ok(Self {
            client,
            connection,
            blocking: Arc::new(Mutex::new(None)),
            consumer_id,
        })
    }

    /// Round-trip a `PING` to verify the server is reachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    fn claim_key(key: &JobKey) -> String {
        format!("claim:{}:{}", key.queue, key.job_id)
    }

    fn notify_key(queue: QueueName) -> String {
        format!("notify:{}", queue)
    }

    /// Append the commands that insert `job` and wake waiting consumers.
    fn push_enqueue(pipe: &mut Pipeline, job: &QueueJob) {
        let queue = job.queue();
        pipe.hset_multiple(job.key().to_string(), &job.payload.to_fields())
            .ignore()
            .lpush(Self::notify_key(queue), 1)
            .ignore()
            .ltrim(Self::notify_key(queue), 0, 0)
            .ignore();
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();
        let mut iter = conn.scan_match::<_, String>(pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn enqueue(&self, job: &QueueJob) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        Self::push_enqueue(&mut pipe, job);

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn scan(&self, queue: QueueName) -> Result<Vec<JobKey>, StoreError> {
        let raw_keys = self.scan_keys(&queue.key_pattern()).await?;
        let mut keys = Vec::with_capacity(raw_keys.len());

        for raw in raw_keys {
            match raw.parse::<JobKey>() {
                Ok(key) => keys.push(key),
                Err(reason) => warn!(key = %raw, reason = %reason, "Skipping malformed queue key"),
            }
        }

        debug!(queue = %queue, count = keys.len(), "Scanned queue");
        Ok(keys)
    }

    async fn fetch(&self, key: &JobKey) -> Result<Option<QueueJob>, StoreError> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn.hgetall(key.to_string()).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let payload = JobPayload::from_fields(
            key.queue,
            fields.iter().map(|(name, value)| (name.as_str(), value.as_str())),
        )
        .map_err(|reason| StoreError::invalid_key(key.to_string(), reason))?;

        Ok(Some(QueueJob {
            job_id: key.job_id,
            payload,
        }))
    }

    async fn claim(&self, key: &JobKey, visibility_timeout: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(Self::claim_key(key))
            .arg(&self.consumer_id)
            .arg("NX")
            .arg("PX")
            .arg(visibility_timeout.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await?;
        Ok(acquired.is_some())
    }

    async fn remove(&self, key: &JobKey) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::pipe()
            .atomic()
            .del(key.to_string())
            .ignore()
            .del(Self::claim_key(key))
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn count(&self, queue: QueueName) -> Result<usize, StoreError> {
        Ok(self.scan_keys(&queue.key_pattern()).await?.len())
    }

    async fn wait_for_change(&self, queue: QueueName, timeout: Duration) -> Result<usize, StoreError> {
        {
            // BLPOP holds its connection for the whole wait, so it never shares the manager.
            let mut slot = self.blocking.lock().await;
            let mut conn = match slot.take() {
                Some(conn) => conn,
                None => {
                    debug!("Opening blocking Redis connection");
                    self.client
                        .get_multiplexed_async_connection()
                        .await
                        .map_err(|e| StoreError::connection(e.to_string()))?
                }
            };

            // A failed connection is dropped and reopened by the next wait.
            let woken: Option<(String, String)> = redis::cmd("BLPOP")
                .arg(Self::notify_key(queue))
                .arg(timeout.as_secs_f64())
                .query_async(&mut conn)
                .await?;
            *slot = Some(conn);

            if woken.is_none() {
                debug!(queue = %queue, "Wait for jobs timed out");
            }
        }

        self.count(queue).await
    }
}

#[async_trait]
impl ProductRepository for RedisStore {
    async fn load(&self, id: &Uuid) -> Result<Option<Product>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(product_key(id)).await?;
        raw.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }
}

#[async_trait]
impl BatchWriter for RedisStore {
    async fn apply(&self, operations: &[StoreOperation]) -> Result<(), StoreError> {
        if operations.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for operation in operations {
            match operation {
                StoreOperation::SaveProduct(product) => {
                    let json = serde_json::to_string(product)?;
                    pipe.set(product_key(&product.id), json).ignore();
                }
                StoreOperation::Enqueue(job) => Self::push_enqueue(&mut pipe, job),
                StoreOperation::RecordTelemetry {
                    hostname,
                    memory_bytes,
                    ttl,
                } => {
                    pipe.set_ex(telemetry_key(hostname), *memory_bytes, ttl.as_secs().max(1))
                        .ignore();
                }
            }
        }

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_key() {
        let job_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let key = JobKey::new(QueueName::SearchLoader, job_id);

        assert_eq!(
            RedisStore::claim_key(&key),
            "claim:solr-loader:550e8400-e29b-41d4-a716-446655440000"
        );
        assert!(!RedisStore::claim_key(&key).starts_with("queue:"));
    }

    #[test]
    fn test_notify_key() {
        assert_eq!(RedisStore::notify_key(QueueName::Image), "notify:image-worker");
    }

    #[test]
    fn test_product_and_telemetry_keys() {
        let id = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        assert_eq!(product_key(&id), "product:6ba7b810-9dad-11d1-80b4-00c04fd430c8");
        assert_eq!(telemetry_key("worker-1"), "memory:ingester:feed:worker-1");
    }

    #[tokio::test]
    #[ignore] // Requires a Redis server on REDIS_URL or localhost
    async fn test_idle_waits_reuse_one_blocking_connection() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let store = RedisStore::connect(&url).await.unwrap();
        let clone = store.clone();
        assert!(Arc::ptr_eq(&store.blocking, &clone.blocking));
        assert!(store.blocking.lock().await.is_none());

        let queue = QueueName::SearchLoader;
        store.wait_for_change(queue, Duration::from_millis(100)).await.unwrap();
        let mut first = store.blocking.lock().await.clone().unwrap();

        clone.wait_for_change(queue, Duration::from_millis(100)).await.unwrap();
        let mut second = store.blocking.lock().await.clone().unwrap();

        // Both handles report the same server-side client id.
        let first_id: i64 = redis::cmd("CLIENT").arg("ID").query_async(&mut first).await.unwrap();
        let second_id: i64 = redis::cmd("CLIENT").arg("ID").query_async(&mut second).await.unwrap();
        assert_eq!(first_id, second_id);
    }
}
