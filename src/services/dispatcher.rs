use std::sync::Arc;

use uuid::Uuid;

use crate::models::batch::{DispatchFailure, ManifestRow};
use crate::models::job::ImageJob;
use crate::services::fetcher::ImageFetcher;
use crate::services::sink::AssetSink;
use crate::services::store::JobStore;
use crate::services::transform::ImageTransformer;

/// The processing pipeline: every handle a job needs, cheap to clone into
/// a spawned task.
#[derive(Clone)]
pub struct Pipeline {
    pub store: Arc<dyn JobStore>,
    pub fetcher: Arc<ImageFetcher>,
    pub transformer: Arc<ImageTransformer>,
    pub sink: Arc<dyn AssetSink>,
}

/// Outcome of a dispatch call: how many jobs were launched and which ones
/// never started because their record could not be created.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub jobs_launched: usize,
    pub failures: Vec<DispatchFailure>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        fetcher: ImageFetcher,
        transformer: ImageTransformer,
        sink: Arc<dyn AssetSink>,
    ) -> Self {
        Self {
            store,
            fetcher: Arc::new(fetcher),
            transformer: Arc::new(transformer),
            sink,
        }
    }

    /// Fan a batch manifest out into independent image jobs.
    ///
    /// Each row's URL list is split on commas (whitespace trimmed, empty
    /// segments dropped). For every URL the initial `processing` record is
    /// written before its task is spawned, so a status query issued the
    /// moment this returns already sees every job. The call never waits for
    /// any job to complete.
    ///
    /// A record-creation failure is reported for that URL alone; sibling
    /// jobs, launched or not yet reached, are unaffected.
    pub async fn dispatch(&self, batch_id: Uuid, rows: &[ManifestRow]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for row in rows {
            let urls = row
                .image_urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty());

            for url in urls {
                let job = ImageJob::new(batch_id, &row.serial_number, &row.product_name, url);

                match self.store.create(&job).await {
                    Ok(()) => {
                        let pipeline = self.clone();
                        tokio::spawn(async move {
                            pipeline.run_job(job).await;
                        });
                        report.jobs_launched += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            batch_id = %batch_id,
                            source_url = url,
                            error = %e,
                            "Failed to create job record, job not launched"
                        );
                        report.failures.push(DispatchFailure {
                            serial_number: row.serial_number.clone(),
                            source_url: url.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            batch_id = %batch_id,
            jobs_launched = report.jobs_launched,
            failures = report.failures.len(),
            "Batch dispatched"
        );

        report
    }
}
