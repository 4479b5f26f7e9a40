//! Pipeline behavior tests: manifest fan-out, per-job failure isolation,
//! status monotonicity, and the transform contract.
//!
//! Fully self-contained: source images are served from a local wiremock
//! server, records live in the in-memory store, and processed copies land
//! in a temp directory.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use image_batch_hw::models::batch::ManifestRow;
use image_batch_hw::models::job::{ImageJob, JobStatus};
use image_batch_hw::services::dispatcher::Pipeline;
use image_batch_hw::services::fetcher::ImageFetcher;
use image_batch_hw::services::sink::FsAssetSink;
use image_batch_hw::services::store::{
    JobStore, MemoryJobStore, StoreError, TerminalState,
};
use image_batch_hw::services::transform::ImageTransformer;

use helpers::{make_test_png, wait_for_batch};

const FETCH_LIMIT: usize = 10 * 1024 * 1024;
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

fn test_pipeline(store: Arc<dyn JobStore>, sink_dir: &std::path::Path) -> Pipeline {
    Pipeline::new(
        store,
        ImageFetcher::new(FETCH_LIMIT),
        ImageTransformer::new(50, 80),
        Arc::new(FsAssetSink::new(sink_dir)),
    )
}

fn row(serial: &str, product: &str, urls: String) -> ManifestRow {
    ManifestRow {
        serial_number: serial.to_string(),
        product_name: product.to_string(),
        image_urls: urls,
    }
}

async fn serve_png(server: &MockServer, route: &str, delay: Option<Duration>) {
    let mut response = ResponseTemplate::new(200).set_body_bytes(make_test_png(64, 64));
    if let Some(d) = delay {
        response = response.set_delay(d);
    }
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn dispatch_splits_urls_and_records_before_returning() {
    let server = MockServer::start().await;
    // Slow responses keep the jobs in flight while we inspect the records.
    serve_png(&server, "/x.png", Some(Duration::from_millis(500))).await;
    serve_png(&server, "/y.png", Some(Duration::from_millis(500))).await;

    let store = Arc::new(MemoryJobStore::new());
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(store.clone(), dir.path());

    let batch_id = Uuid::new_v4();
    let rows = vec![row(
        "SN-1",
        "Widget",
        format!("{}/x.png, {}/y.png", server.uri(), server.uri()),
    )];

    let report = pipeline.dispatch(batch_id, &rows).await;
    assert_eq!(report.jobs_launched, 2);
    assert!(report.failures.is_empty());

    // dispatch returned before the fetches completed, yet both records
    // already exist and are still processing.
    let jobs = store.list_by_batch(batch_id).await.expect("list");
    assert_eq!(jobs.len(), 2);
    for job in &jobs {
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.serial_number, "SN-1");
        assert_eq!(job.product_name, "Widget");
        assert!(job.result_ref.is_none());
        assert!(job.error_detail.is_none());
    }

    let jobs = wait_for_batch(store.as_ref(), batch_id, SETTLE_TIMEOUT).await;
    assert!(jobs.iter().all(|j| j.status == JobStatus::Finished));
    assert!(jobs.iter().all(|j| j.result_ref.is_some()));
}

#[tokio::test]
async fn failing_fetch_does_not_affect_sibling_jobs() {
    let server = MockServer::start().await;
    serve_png(&server, "/ok1.png", None).await;
    serve_png(&server, "/ok2.png", None).await;
    Mock::given(method("GET"))
        .and(path("/bad.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryJobStore::new());
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(store.clone(), dir.path());

    let batch_id = Uuid::new_v4();
    let rows = vec![row(
        "SN-2",
        "Widget",
        format!(
            "{u}/ok1.png,{u}/bad.png,{u}/ok2.png",
            u = server.uri()
        ),
    )];

    let report = pipeline.dispatch(batch_id, &rows).await;
    assert_eq!(report.jobs_launched, 3);

    let jobs = wait_for_batch(store.as_ref(), batch_id, SETTLE_TIMEOUT).await;
    assert_eq!(jobs.len(), 3);

    for job in &jobs {
        if job.source_url.ends_with("/bad.png") {
            assert_eq!(job.status, JobStatus::Error);
            assert!(job.result_ref.is_none());
            let detail = job.error_detail.as_deref().expect("error detail");
            assert!(detail.contains("500"), "unexpected detail: {detail}");
        } else {
            assert_eq!(job.status, JobStatus::Finished, "job {}", job.source_url);
            assert!(job.result_ref.is_some());
            assert!(job.error_detail.is_none());
        }
    }
}

#[tokio::test]
async fn undecodable_body_yields_error_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/not-an-image.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"plain text".to_vec()))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryJobStore::new());
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(store.clone(), dir.path());

    let batch_id = Uuid::new_v4();
    let rows = vec![row(
        "SN-3",
        "Widget",
        format!("{}/not-an-image.png", server.uri()),
    )];

    pipeline.dispatch(batch_id, &rows).await;
    let jobs = wait_for_batch(store.as_ref(), batch_id, SETTLE_TIMEOUT).await;

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert!(jobs[0].error_detail.as_deref().is_some_and(|d| d.contains("transform")));
}

#[tokio::test]
async fn oversized_response_yields_error_record() {
    let server = MockServer::start().await;
    serve_png(&server, "/big.png", None).await;

    let store = Arc::new(MemoryJobStore::new());
    let dir = tempfile::tempdir().expect("tempdir");
    // Ceiling far below the fixture size.
    let pipeline = Pipeline::new(
        store.clone(),
        ImageFetcher::new(16),
        ImageTransformer::new(50, 80),
        Arc::new(FsAssetSink::new(dir.path())),
    );

    let batch_id = Uuid::new_v4();
    pipeline
        .dispatch(
            batch_id,
            &[row("SN-4", "Widget", format!("{}/big.png", server.uri()))],
        )
        .await;

    let jobs = wait_for_batch(store.as_ref(), batch_id, SETTLE_TIMEOUT).await;
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert!(jobs[0]
        .error_detail
        .as_deref()
        .is_some_and(|d| d.contains("byte limit")));
}

#[tokio::test]
async fn concurrent_batches_stay_isolated() {
    let server = MockServer::start().await;
    serve_png(&server, "/a.png", None).await;
    serve_png(&server, "/b.png", None).await;

    let store = Arc::new(MemoryJobStore::new());
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(store.clone(), dir.path());

    let batch_a = Uuid::new_v4();
    let batch_b = Uuid::new_v4();
    let rows_a = vec![row("A-1", "Alpha", format!("{}/a.png", server.uri()))];
    let rows_b = vec![row("B-1", "Beta", format!("{}/b.png", server.uri()))];

    futures::future::join(
        pipeline.dispatch(batch_a, &rows_a),
        pipeline.dispatch(batch_b, &rows_b),
    )
    .await;

    let jobs_a = wait_for_batch(store.as_ref(), batch_a, SETTLE_TIMEOUT).await;
    let jobs_b = wait_for_batch(store.as_ref(), batch_b, SETTLE_TIMEOUT).await;

    assert_eq!(jobs_a.len(), 1);
    assert_eq!(jobs_b.len(), 1);
    assert_eq!(jobs_a[0].serial_number, "A-1");
    assert_eq!(jobs_b[0].serial_number, "B-1");
}

/// Store wrapper that refuses record creation for URLs containing a marker,
/// to exercise the not-launched reporting path.
struct RefusingStore {
    inner: MemoryJobStore,
}

#[async_trait]
impl JobStore for RefusingStore {
    async fn create(&self, job: &ImageJob) -> Result<(), StoreError> {
        if job.source_url.contains("refused") {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        self.inner.create(job).await
    }

    async fn update_terminal(
        &self,
        batch_id: Uuid,
        source_url: &str,
        outcome: TerminalState,
    ) -> Result<(), StoreError> {
        self.inner.update_terminal(batch_id, source_url, outcome).await
    }

    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<ImageJob>, StoreError> {
        self.inner.list_by_batch(batch_id).await
    }
}

#[tokio::test]
async fn record_creation_failure_skips_that_job_only() {
    let server = MockServer::start().await;
    serve_png(&server, "/fine.png", None).await;

    let store = Arc::new(RefusingStore {
        inner: MemoryJobStore::new(),
    });
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(store.clone(), dir.path());

    let batch_id = Uuid::new_v4();
    let rows = vec![row(
        "SN-5",
        "Widget",
        format!("{u}/fine.png, {u}/refused.png", u = server.uri()),
    )];

    let report = pipeline.dispatch(batch_id, &rows).await;
    assert_eq!(report.jobs_launched, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].source_url.ends_with("/refused.png"));
    assert_eq!(report.failures[0].serial_number, "SN-5");

    // The sibling job still runs to completion.
    let jobs = wait_for_batch(store.as_ref(), batch_id, SETTLE_TIMEOUT).await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Finished);
}

#[tokio::test]
async fn terminal_status_is_written_exactly_once() {
    let store = MemoryJobStore::new();
    let batch_id = Uuid::new_v4();
    let job = ImageJob::new(batch_id, "SN-6", "Widget", "http://a/x.png");

    store.create(&job).await.expect("create");

    // Duplicate creation for the same key is refused.
    let dup = store.create(&job).await;
    assert!(matches!(dup, Err(StoreError::Duplicate { .. })));

    store
        .update_terminal(
            batch_id,
            "http://a/x.png",
            TerminalState::Finished {
                result_ref: "processed/1.jpg".to_string(),
            },
        )
        .await
        .expect("first terminal write");

    // A second terminal write finds no processing record to move.
    let second = store
        .update_terminal(
            batch_id,
            "http://a/x.png",
            TerminalState::Error {
                detail: "should not stick".to_string(),
            },
        )
        .await;
    assert!(matches!(second, Err(StoreError::NotFound { .. })));

    let jobs = store.list_by_batch(batch_id).await.expect("list");
    assert_eq!(jobs[0].status, JobStatus::Finished);
    assert_eq!(jobs[0].result_ref.as_deref(), Some("processed/1.jpg"));
    assert!(jobs[0].error_detail.is_none());
}

#[tokio::test]
async fn unknown_batch_lists_empty() {
    let store = MemoryJobStore::new();
    let jobs = store
        .list_by_batch(Uuid::new_v4())
        .await
        .expect("listing an unknown batch is not an error");
    assert!(jobs.is_empty());
}

#[test]
fn transform_halves_dimensions() {
    let png = make_test_png(500, 400);
    let transformer = ImageTransformer::new(50, 80);

    let out = transformer.transform(&png).expect("transform");

    assert_eq!(image::guess_format(&out).expect("format"), image::ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&out).expect("decode output");
    assert_eq!(decoded.width(), 250);
    assert_eq!(decoded.height(), 200);
}

#[test]
fn transform_is_deterministic() {
    let png = make_test_png(120, 80);
    let transformer = ImageTransformer::new(50, 80);

    let first = transformer.transform(&png).expect("first pass");
    let second = transformer.transform(&png).expect("second pass");

    assert_eq!(first, second);
}

#[test]
fn transform_rejects_garbage() {
    let transformer = ImageTransformer::new(50, 80);
    assert!(transformer.transform(b"definitely not an image").is_err());
}
