use reqwest::Client;

/// HTTP client for retrieving source images.
///
/// One attempt per call, no retry. The response body is streamed and
/// abandoned as soon as it crosses the configured size ceiling.
pub struct ImageFetcher {
    http: Client,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            http: Client::new(),
            max_bytes,
        }
    }

    /// Fetch the raw bytes behind `url`.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {0}")]
    Status(reqwest::StatusCode),

    #[error("response exceeds {limit} byte limit")]
    TooLarge { limit: usize },
}
