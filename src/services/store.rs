use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{ImageJob, JobStatus};

/// The terminal outcome written back by a job runner.
///
/// Encoding the outcome as an enum keeps `result_ref` and `error_detail`
/// mutually exclusive at the type level.
#[derive(Debug, Clone)]
pub enum TerminalState {
    Finished { result_ref: String },
    Error { detail: String },
}

/// Keyed storage for per-image job records.
///
/// Keys are (batch_id, source_url). Writes to distinct keys never contend;
/// a record transitions to a terminal state at most once, enforced by
/// `update_terminal` only matching records still in `processing`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert the initial `processing` record for a job.
    async fn create(&self, job: &ImageJob) -> Result<(), StoreError>;

    /// Move a job to its terminal state. Fails with `NotFound` when no
    /// record for the key is still `processing` (missing record or a
    /// second terminal write, both contract violations).
    async fn update_terminal(
        &self,
        batch_id: Uuid,
        source_url: &str,
        outcome: TerminalState,
    ) -> Result<(), StoreError>;

    /// Snapshot of every job in a batch, in no guaranteed order.
    /// An unknown batch yields an empty vec, not an error.
    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<ImageJob>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job record already exists for batch {batch_id} url {source_url}")]
    Duplicate { batch_id: Uuid, source_url: String },

    #[error("no processing job record for batch {batch_id} url {source_url}")]
    NotFound { batch_id: Uuid, source_url: String },

    #[error("job record store unavailable: {0}")]
    Unavailable(String),
}

/// In-process `JobStore` backed by a map.
///
/// Carries the same contract as the PostgreSQL store; used by the test
/// suite and usable as a backend when no database is configured.
#[derive(Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<(Uuid, String), ImageJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &ImageJob) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let key = (job.batch_id, job.source_url.clone());
        if records.contains_key(&key) {
            return Err(StoreError::Duplicate {
                batch_id: job.batch_id,
                source_url: job.source_url.clone(),
            });
        }
        records.insert(key, job.clone());
        Ok(())
    }

    async fn update_terminal(
        &self,
        batch_id: Uuid,
        source_url: &str,
        outcome: TerminalState,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&(batch_id, source_url.to_string()))
            .filter(|r| r.status == JobStatus::Processing)
            .ok_or_else(|| StoreError::NotFound {
                batch_id,
                source_url: source_url.to_string(),
            })?;

        match outcome {
            TerminalState::Finished { result_ref } => {
                record.status = JobStatus::Finished;
                record.result_ref = Some(result_ref);
            }
            TerminalState::Error { detail } => {
                record.status = JobStatus::Error;
                record.error_detail = Some(detail);
            }
        }
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<ImageJob>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect())
    }
}
