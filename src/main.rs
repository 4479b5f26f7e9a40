mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::response::Html;
use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use db::queries::PgJobStore;
use services::{
    dispatcher::Pipeline,
    fetcher::ImageFetcher,
    sink::{AssetSink, FsAssetSink, R2AssetSink},
    transform::ImageTransformer,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing image-batch-hw server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_histogram!(
        "image_job_processing_seconds",
        "Time to process a single image job"
    );
    metrics::describe_counter!("image_jobs_total", "Total image jobs launched");
    metrics::describe_counter!(
        "image_jobs_finished",
        "Total image jobs that reached finished"
    );
    metrics::describe_counter!("image_jobs_failed", "Total image jobs that reached error");

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Processed images go to R2 when a bucket is configured, local disk otherwise
    let sink: Arc<dyn AssetSink> = match (
        &config.r2_bucket,
        &config.r2_endpoint,
        &config.r2_access_key,
        &config.r2_secret_key,
    ) {
        (Some(bucket), Some(endpoint), Some(access_key), Some(secret_key)) => {
            tracing::info!(bucket = %bucket, "Storing processed images in R2");
            Arc::new(
                R2AssetSink::new(bucket, endpoint, access_key, secret_key)
                    .expect("Failed to initialize R2 sink"),
            )
        }
        _ => {
            tracing::info!(dir = %config.output_dir, "Storing processed images on local disk");
            Arc::new(FsAssetSink::new(&config.output_dir))
        }
    };

    let pipeline = Pipeline::new(
        Arc::new(PgJobStore::new(db_pool.clone())),
        ImageFetcher::new(config.fetch_max_bytes),
        ImageTransformer::new(config.scale_percent, config.jpeg_quality),
        sink,
    );

    // Create shared application state
    let state = AppState::new(db_pool, pipeline);

    // Build API routes
    let app = Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../static/index.html")) }))
        // API endpoints
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/batches", post(routes::batch::submit_batch))
        .route(
            "/api/v1/batches/{batch_id}",
            get(routes::batch::get_batch_status),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)); // 10 MB limit

    tracing::info!("Starting image-batch-hw on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
