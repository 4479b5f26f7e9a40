use std::sync::Arc;

use crate::models::job::ImageJob;
use crate::services::dispatcher::Pipeline;
use crate::services::fetcher::FetchError;
use crate::services::sink::SinkError;
use crate::services::store::{StoreError, TerminalState};
use crate::services::transform::TransformError;

/// Anything that can stop a job between dispatch and its finished record.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("transform task aborted: {0}")]
    TransformTask(#[from] tokio::task::JoinError),

    #[error("persist failed: {0}")]
    Persist(#[from] SinkError),
}

impl Pipeline {
    /// Execute one job to its terminal record.
    ///
    /// Every step failure is caught here and written back as a terminal
    /// `error` record; nothing propagates to the dispatcher or to sibling
    /// jobs. If the terminal write itself fails the job is abandoned with a
    /// log line, since there is nowhere left to record the outcome.
    pub async fn run_job(&self, job: ImageJob) {
        metrics::counter!("image_jobs_total").increment(1);
        let started = std::time::Instant::now();

        tracing::info!(
            batch_id = %job.batch_id,
            source_url = %job.source_url,
            "Processing image job"
        );

        let outcome = match self.process(&job).await {
            Ok(result_ref) => {
                metrics::counter!("image_jobs_finished").increment(1);
                tracing::info!(
                    batch_id = %job.batch_id,
                    source_url = %job.source_url,
                    result_ref = %result_ref,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Image job finished"
                );
                TerminalState::Finished { result_ref }
            }
            Err(e) => {
                metrics::counter!("image_jobs_failed").increment(1);
                tracing::warn!(
                    batch_id = %job.batch_id,
                    source_url = %job.source_url,
                    error = %e,
                    "Image job failed"
                );
                TerminalState::Error {
                    detail: e.to_string(),
                }
            }
        };

        if let Err(e) = self
            .store
            .update_terminal(job.batch_id, &job.source_url, outcome)
            .await
        {
            match e {
                StoreError::NotFound { .. } | StoreError::Duplicate { .. } => {
                    // Broken data-model contract: the record vanished or was
                    // already terminal. Nothing sane left to do for this job.
                    tracing::error!(
                        batch_id = %job.batch_id,
                        source_url = %job.source_url,
                        error = %e,
                        "Job record contract violated on terminal write"
                    );
                }
                StoreError::Unavailable(_) => {
                    tracing::error!(
                        batch_id = %job.batch_id,
                        source_url = %job.source_url,
                        error = %e,
                        "Terminal write failed, job outcome lost"
                    );
                }
            }
        }

        metrics::histogram!("image_job_processing_seconds").record(started.elapsed().as_secs_f64());
    }

    /// The fetch → transform → persist sequence; errors bubble to `run_job`.
    async fn process(&self, job: &ImageJob) -> Result<String, JobError> {
        tracing::debug!(source_url = %job.source_url, "Fetching source image");
        let raw = self.fetcher.fetch(&job.source_url).await?;

        tracing::debug!(source_url = %job.source_url, bytes = raw.len(), "Transforming image");
        let transformer = Arc::clone(&self.transformer);
        let transformed =
            tokio::task::spawn_blocking(move || transformer.transform(&raw)).await??;

        tracing::debug!(
            source_url = %job.source_url,
            bytes = transformed.len(),
            "Persisting processed image"
        );
        let result_ref = self.sink.store(&transformed).await?;

        Ok(result_ref)
    }
}
