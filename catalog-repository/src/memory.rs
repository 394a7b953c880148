//! In-memory store for tests and local runs without Redis.
//!
//! [`MemoryStore`] implements every store trait with the same observable
//! semantics as [`crate::RedisStore`]: unordered scans, expiring claims,
//! wake-ups on enqueue and expiring telemetry. It also records what was
//! written so tests can assert on batching behaviour.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::interfaces::{BatchWriter, ProductRepository, QueueStore};
use crate::types::StoreOperation;
use catalog_shared::{JobKey, Product, QueueJob, QueueName};

/// Summary of one applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedBatch {
    pub operations: usize,
    pub products: usize,
    pub jobs: usize,
}

#[derive(Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    jobs: HashMap<JobKey, QueueJob>,
    claims: HashMap<JobKey, Instant>,
    telemetry: HashMap<String, (u64, Instant)>,
    batches: Vec<AppliedBatch>,
}

impl MemoryState {
    fn pending(&self, queue: QueueName) -> usize {
        self.jobs.keys().filter(|key| key.queue == queue).count()
    }

    fn insert_job(&mut self, job: &QueueJob) {
        self.jobs.insert(job.key(), job.clone());
    }
}

/// In-memory implementation of the catalog store.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    notify: Notify,
    scan_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            notify: Notify::new(),
            scan_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-write; the maps are still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every persisted product.
    pub fn products(&self) -> Vec<Product> {
        self.state().products.values().cloned().collect()
    }

    /// Every pending job of `queue`.
    pub fn jobs(&self, queue: QueueName) -> Vec<QueueJob> {
        self.state()
            .jobs
            .values()
            .filter(|job| job.queue() == queue)
            .cloned()
            .collect()
    }

    /// Batches applied so far, oldest first.
    pub fn batches(&self) -> Vec<AppliedBatch> {
        self.state().batches.clone()
    }

    /// Latest unexpired memory sample for `hostname`.
    pub fn telemetry(&self, hostname: &str) -> Option<u64> {
        let now = Instant::now();
        self.state()
            .telemetry
            .get(hostname)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(bytes, _)| *bytes)
    }

    /// Number of `scan` calls served.
    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    /// Number of pending-count lookups served, including those made by `wait_for_jobs`.
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    fn pending(&self, queue: QueueName) -> usize {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.state().pending(queue)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn enqueue(&self, job: &QueueJob) -> Result<(), StoreError> {
        self.state().insert_job(job);
        self.notify.notify_one();
        Ok(())
    }

    async fn scan(&self, queue: QueueName) -> Result<Vec<JobKey>, StoreError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state()
            .jobs
            .keys()
            .filter(|key| key.queue == queue)
            .copied()
            .collect())
    }

    async fn fetch(&self, key: &JobKey) -> Result<Option<QueueJob>, StoreError> {
        Ok(self.state().jobs.get(key).cloned())
    }

    async fn claim(&self, key: &JobKey, visibility_timeout: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.state();
        match state.claims.get(key) {
            Some(expires_at) if *expires_at > now => Ok(false),
            _ => {
                state.claims.insert(*key, now + visibility_timeout);
                Ok(true)
            }
        }
    }

    async fn remove(&self, key: &JobKey) -> Result<(), StoreError> {
        let mut state = self.state();
        state.jobs.remove(key);
        state.claims.remove(key);
        Ok(())
    }

    async fn count(&self, queue: QueueName) -> Result<usize, StoreError> {
        Ok(self.pending(queue))
    }

    async fn wait_for_change(&self, queue: QueueName, timeout: Duration) -> Result<usize, StoreError> {
        if tokio::time::timeout(timeout, self.notify.notified()).await.is_err() {
            debug!(queue = %queue, "Wait for jobs timed out");
        }

        Ok(self.pending(queue))
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn load(&self, id: &Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.state().products.get(id).cloned())
    }
}

#[async_trait]
impl BatchWriter for MemoryStore {
    async fn apply(&self, operations: &[StoreOperation]) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut summary = AppliedBatch {
            operations: operations.len(),
            ..AppliedBatch::default()
        };
        let mut enqueued = false;

        {
            let mut state = self.state();
            for operation in operations {
                match operation {
                    StoreOperation::SaveProduct(product) => {
                        summary.products += 1;
                        state.products.insert(product.id, product.clone());
                    }
                    StoreOperation::Enqueue(job) => {
                        summary.jobs += 1;
                        enqueued = true;
                        state.insert_job(job);
                    }
                    StoreOperation::RecordTelemetry {
                        hostname,
                        memory_bytes,
                        ttl,
                    } => {
                        state
                            .telemetry
                            .insert(hostname.clone(), (*memory_bytes, now + *ttl));
                    }
                }
            }
            state.batches.push(summary);
        }

        if enqueued {
            self.notify.notify_one();
        }
        Ok(())
    }
}
