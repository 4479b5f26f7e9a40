use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::batch::{BatchStatusResponse, BatchSubmitResponse, JobStatusEntry};
use crate::services::manifest;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// POST /api/v1/batches — upload a CSV manifest and start processing.
///
/// The manifest travels in a multipart field named `file`. On acceptance
/// every image job already has a `processing` record, so the returned
/// batch_id can be polled immediately.
pub async fn submit_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BatchSubmitResponse>), (StatusCode, Json<ErrorResponse>)> {
    let mut manifest_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("invalid multipart: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field.bytes().await.map_err(|e| {
                error_response(StatusCode::BAD_REQUEST, format!("failed to read file: {e}"))
            })?;
            manifest_bytes = Some(data.to_vec());
        }
    }

    let manifest_bytes = manifest_bytes
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "no manifest file uploaded"))?;

    let rows = manifest::parse_manifest(&manifest_bytes)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    let batch_id = Uuid::new_v4();
    tracing::info!(batch_id = %batch_id, rows = rows.len(), "Manifest accepted");

    let report = state.pipeline.dispatch(batch_id, &rows).await;

    if report.jobs_launched == 0 {
        // Every record creation failed; nothing is running for this batch.
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "no jobs could be launched, job record store unavailable",
        ));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchSubmitResponse {
            batch_id,
            status: "processing".to_string(),
            jobs_launched: report.jobs_launched,
            failures: report.failures,
            message: "Batch accepted for processing".to_string(),
        }),
    ))
}

/// GET /api/v1/batches/{batch_id} — per-image status snapshot for a batch.
///
/// An unknown batch id yields an empty job list, indistinguishable from a
/// batch with zero jobs.
pub async fn get_batch_status(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<BatchStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let jobs = state
        .pipeline
        .store
        .list_by_batch(batch_id)
        .await
        .map_err(|e| {
            tracing::error!(batch_id = %batch_id, error = %e, "Failed to list batch jobs");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "job record store unavailable")
        })?;

    let jobs = jobs
        .into_iter()
        .map(|j| JobStatusEntry {
            serial_number: j.serial_number,
            product_name: j.product_name,
            source_url: j.source_url,
            status: j.status,
            result_ref: j.result_ref,
            error_detail: j.error_detail,
        })
        .collect();

    Ok(Json(BatchStatusResponse { batch_id, jobs }))
}
