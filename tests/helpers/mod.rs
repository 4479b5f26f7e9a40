//! Shared helpers for the pipeline test suite.

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use tokio::time::sleep;
use uuid::Uuid;

use image_batch_hw::models::job::ImageJob;
use image_batch_hw::services::store::JobStore;

/// Encode an RGB PNG of the given dimensions with a simple gradient fill.
pub fn make_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128u8])
    });

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("failed to encode test PNG");
    out.into_inner()
}

/// Poll the store until every job in the batch is terminal.
/// Panics if the batch has not settled within `timeout`.
pub async fn wait_for_batch(
    store: &dyn JobStore,
    batch_id: Uuid,
    timeout: Duration,
) -> Vec<ImageJob> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let jobs = store
            .list_by_batch(batch_id)
            .await
            .expect("failed to list batch");

        if !jobs.is_empty() && jobs.iter().all(|j| j.status.is_terminal()) {
            return jobs;
        }

        assert!(
            tokio::time::Instant::now() < deadline,
            "batch {batch_id} did not settle within {timeout:?}: {jobs:?}"
        );

        sleep(Duration::from_millis(25)).await;
    }
}
