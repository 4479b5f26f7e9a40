use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of a single image job.
///
/// `Processing` is the only non-terminal state; a job moves to `Finished`
/// or `Error` exactly once and never back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Finished,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error)
    }
}

/// One image job: the unit of work for a single source URL within a batch.
///
/// Keyed by (batch_id, source_url). `result_ref` and `error_detail` are
/// mutually exclusive and both absent while the job is still processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageJob {
    pub batch_id: Uuid,
    pub serial_number: String,
    pub product_name: String,
    pub source_url: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageJob {
    /// A freshly dispatched job, not yet picked up by a runner.
    pub fn new(batch_id: Uuid, serial_number: &str, product_name: &str, source_url: &str) -> Self {
        let now = Utc::now();
        Self {
            batch_id,
            serial_number: serial_number.to_string(),
            product_name: product_name.to_string(),
            source_url: source_url.to_string(),
            status: JobStatus::Processing,
            result_ref: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }
}
