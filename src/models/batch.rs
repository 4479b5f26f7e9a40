use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobStatus;

/// One row of an uploaded batch manifest.
///
/// `image_urls` is the raw comma-separated list from the manifest; the
/// dispatcher splits it into individual jobs.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ManifestRow {
    #[serde(rename = "Serial Number")]
    #[garde(length(min = 1, max = 200))]
    pub serial_number: String,

    #[serde(rename = "Product Name")]
    #[garde(length(min = 1, max = 500))]
    pub product_name: String,

    #[serde(rename = "Input Image Urls")]
    #[garde(length(min = 1))]
    pub image_urls: String,
}

/// Response after accepting a batch manifest.
#[derive(Debug, Serialize)]
pub struct BatchSubmitResponse {
    pub batch_id: Uuid,
    pub status: String,
    pub jobs_launched: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DispatchFailure>,
    pub message: String,
}

/// A job that could not be launched because its record was never created.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub serial_number: String,
    pub source_url: String,
    pub reason: String,
}

/// Response for querying the status of a batch.
#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub batch_id: Uuid,
    pub jobs: Vec<JobStatusEntry>,
}

/// Per-job snapshot in a batch status response.
#[derive(Debug, Serialize)]
pub struct JobStatusEntry {
    pub serial_number: String,
    pub product_name: String,
    pub source_url: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}
