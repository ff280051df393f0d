//! Document retrieval: GET a URL and hold the whole body in memory.
//!
//! The object store in front of this service serves plain HTTP. A non-2xx
//! status is logged but not treated as a failure here; the body is handed on
//! as-is and a bad payload surfaces as a decode error in the next stage.

use crate::error::ExtractError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retrieves a remote resource by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExtractError>;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a fetcher. `timeout_secs == 0` disables the request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExtractError> {
        info!("Downloading: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_err(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} returned HTTP {}; using body as-is", url, status);
        }

        let bytes = response.bytes().await.map_err(|e| self.map_err(url, e))?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        Ok(bytes.to_vec())
    }
}

impl HttpFetcher {
    fn map_err(&self, url: &str, e: reqwest::Error) -> ExtractError {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Whether `url` names a PDF, by case-insensitive `.pdf` suffix.
///
/// Query string and fragment are ignored when the URL parses; otherwise the
/// raw string is matched.
pub fn is_pdf_url(url: &str) -> bool {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    path.to_ascii_lowercase().ends_with(".pdf")
}
