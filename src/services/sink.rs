use std::path::PathBuf;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use uuid::Uuid;

/// Destination for processed image bytes.
///
/// `store` writes the bytes under a freshly generated name and returns an
/// opaque reference usable to retrieve them later. Names are independent of
/// content; storing identical bytes twice yields two distinct references.
#[async_trait]
pub trait AssetSink: Send + Sync {
    async fn store(&self, bytes: &[u8]) -> Result<String, SinkError>;
}

/// Sink writing processed images to a local directory.
pub struct FsAssetSink {
    root: PathBuf,
}

impl FsAssetSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetSink for FsAssetSink {
    async fn store(&self, bytes: &[u8]) -> Result<String, SinkError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.root.join(format!("{}.jpg", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;

        Ok(path.display().to_string())
    }
}

/// Sink writing processed images to Cloudflare R2 (S3-compatible).
pub struct R2AssetSink {
    bucket: Box<Bucket>,
}

impl R2AssetSink {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, SinkError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| SinkError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| SinkError::Config(e.to_string()))?;

        Ok(Self { bucket })
    }
}

#[async_trait]
impl AssetSink for R2AssetSink {
    async fn store(&self, bytes: &[u8]) -> Result<String, SinkError> {
        let key = format!("processed/{}.jpg", Uuid::new_v4());
        self.bucket
            .put_object_with_content_type(&key, bytes, "image/jpeg")
            .await?;
        Ok(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("filesystem write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("sink configuration error: {0}")]
    Config(String),
}
