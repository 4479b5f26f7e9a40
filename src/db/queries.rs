use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::job::{ImageJob, JobStatus};
use crate::services::store::{JobStore, StoreError, TerminalState};

/// `JobStore` backed by the `image_jobs` PostgreSQL table.
///
/// The composite primary key (batch_id, source_url) yields the duplicate
/// check; terminal writes only match rows still in `processing`, which
/// makes the status transition one-way at the database level.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_job(r: &PgRow) -> Result<ImageJob, sqlx::Error> {
    let status_str: String = r.try_get("status")?;
    let status = status_str
        .parse::<JobStatus>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(ImageJob {
        batch_id: r.try_get("batch_id")?,
        serial_number: r.try_get("serial_number")?,
        product_name: r.try_get("product_name")?,
        source_url: r.try_get("source_url")?,
        status,
        result_ref: r.try_get("result_ref")?,
        error_detail: r.try_get("error_detail")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &ImageJob) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO image_jobs
                (batch_id, serial_number, product_name, source_url, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.batch_id)
        .bind(&job.serial_number)
        .bind(&job.product_name)
        .bind(&job.source_url)
        .bind(job.status.to_string())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
                batch_id: job.batch_id,
                source_url: job.source_url.clone(),
            },
            _ => StoreError::Unavailable(e.to_string()),
        })?;

        Ok(())
    }

    async fn update_terminal(
        &self,
        batch_id: Uuid,
        source_url: &str,
        outcome: TerminalState,
    ) -> Result<(), StoreError> {
        let (status, result_ref, error_detail) = match &outcome {
            TerminalState::Finished { result_ref } => {
                (JobStatus::Finished, Some(result_ref.as_str()), None)
            }
            TerminalState::Error { detail } => (JobStatus::Error, None, Some(detail.as_str())),
        };

        let result = sqlx::query(
            r#"
            UPDATE image_jobs
            SET status = $1, result_ref = $2, error_detail = $3, updated_at = NOW()
            WHERE batch_id = $4 AND source_url = $5 AND status = 'processing'
            "#,
        )
        .bind(status.to_string())
        .bind(result_ref)
        .bind(error_detail)
        .bind(batch_id)
        .bind(source_url)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                batch_id,
                source_url: source_url.to_string(),
            });
        }

        Ok(())
    }

    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<ImageJob>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT batch_id, serial_number, product_name, source_url, status,
                   result_ref, error_detail, created_at, updated_at
            FROM image_jobs
            WHERE batch_id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        rows.iter()
            .map(|r| row_to_job(r).map_err(|e| StoreError::Unavailable(e.to_string())))
            .collect()
    }
}
