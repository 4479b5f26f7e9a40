use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Directory for processed images when no R2 bucket is configured
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Upper bound on a fetched source image, in bytes
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: usize,

    /// Output dimensions as a percentage of the source dimensions
    #[serde(default = "default_scale_percent")]
    pub scale_percent: u32,

    /// JPEG re-encode quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// R2 bucket name; set together with the fields below to store
    /// processed images in R2 instead of the local filesystem
    pub r2_bucket: Option<String>,

    /// R2 access key ID (S3-compatible)
    pub r2_access_key: Option<String>,

    /// R2 secret access key (S3-compatible)
    pub r2_secret_key: Option<String>,

    /// R2 endpoint URL
    pub r2_endpoint: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_output_dir() -> String {
    "processed".to_string()
}

fn default_fetch_max_bytes() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

fn default_scale_percent() -> u32 {
    50
}

fn default_jpeg_quality() -> u8 {
    80
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
