//! Queue store trait definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;
use catalog_shared::{JobKey, QueueJob, QueueName};

/// A namespaced, multi-producer/multi-consumer work queue.
///
/// Jobs live under `queue:{queue}:{job_id}`. Enumeration takes no lock;
/// consumers that want to avoid duplicate work take a per-job claim with a
/// visibility timeout before processing. A claim that is never released
/// expires, which makes the job of a crashed consumer reclaimable.
///
/// Delivery is at-least-once.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert a job. Job ids are unique per enqueue, so this never overwrites.
    async fn enqueue(&self, job: &QueueJob) -> Result<(), StoreError>;

    /// Enumerate the keys of every pending job in `queue`, in no particular order.
    async fn scan(&self, queue: QueueName) -> Result<Vec<JobKey>, StoreError>;

    /// Read a job. Returns `Ok(None)` if it was removed in the meantime.
    async fn fetch(&self, key: &JobKey) -> Result<Option<QueueJob>, StoreError>;

    /// Try to take the claim on a job for `visibility_timeout`.
    ///
    /// Returns `Ok(false)` while another consumer holds an unexpired claim.
    async fn claim(&self, key: &JobKey, visibility_timeout: Duration) -> Result<bool, StoreError>;

    /// Delete a job and its claim after successful processing.
    async fn remove(&self, key: &JobKey) -> Result<(), StoreError>;

    /// Number of pending jobs in `queue`.
    async fn count(&self, queue: QueueName) -> Result<usize, StoreError>;

    /// Block until a producer signals `queue` or `timeout` elapses, then
    /// return the number of pending jobs.
    ///
    /// Waits even when jobs are already pending. A signal sent while nobody
    /// was waiting may end the next wait early.
    async fn wait_for_change(&self, queue: QueueName, timeout: Duration) -> Result<usize, StoreError>;

    /// Like [`QueueStore::wait_for_change`], but returns immediately when
    /// jobs are already pending.
    async fn wait_for_jobs(&self, queue: QueueName, timeout: Duration) -> Result<usize, StoreError> {
        let pending = self.count(queue).await?;
        if pending > 0 {
            return Ok(pending);
        }
        self.wait_for_change(queue, timeout).await
    }
}
