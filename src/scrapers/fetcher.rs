//! Rate-limited HTTP fetcher with retry and backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::warn;

use super::{PageSource, ScrapeError};
use crate::config::ScrapingConfig;

/// Fetch failure surfaced only after retries are exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("{url} returned status {status} after {attempts} attempts")]
    Status {
        url: String,
        status: StatusCode,
        attempts: u32,
    },
}

/// HTTP client that spaces requests out and retries transient failures.
///
/// On a transient failure the delay doubles per attempt, bounded by
/// [`MAX_BACKOFF`]. A fixed inter-request delay follows every successful
/// fetch to respect target-site rate limits.
pub struct RateLimitedFetcher {
    client: Client,
    max_retries: u32,
    request_delay: Duration,
}

/// Upper bound on the exponential backoff between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl RateLimitedFetcher {
    pub fn new(config: &ScrapingConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            max_retries: config.max_retries,
            request_delay: config.request_delay(),
        }
    }

    /// GET a URL and return the body text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt: u32 = 1;

        loop {
            match self.try_fetch(url).await {
                Ok(body) => {
                    tokio::time::sleep(self.request_delay).await;
                    return Ok(body);
                }
                Err(e) if attempt < self.max_retries && e.is_transient() => {
                    warn!(
                        "fetch of {} failed (attempt {}/{}): {}, retrying in {:?}",
                        url, attempt, self.max_retries, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                Err(TryFetchError::Request(source)) => {
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    })
                }
                Err(TryFetchError::Status(status)) => {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status,
                        attempts: attempt,
                    })
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, TryFetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if is_transient_status(status) || status.is_client_error() {
            return Err(TryFetchError::Status(status));
        }
        Ok(response.text().await?)
    }
}

#[derive(Debug, Error)]
enum TryFetchError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("status {0}")]
    Status(StatusCode),
}

impl TryFetchError {
    /// Network errors and throttling/server statuses are worth retrying;
    /// other client errors (404 and friends) fail immediately.
    fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status(status) => is_transient_status(*status),
        }
    }
}

#[async_trait]
impl PageSource for RateLimitedFetcher {
    async fn fetch_page(&mut self, url: &str) -> Result<String, ScrapeError> {
        Ok(self.fetch_text(url).await?)
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_status_classification() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::OK));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff = INITIAL_BACKOFF;
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(backoff);
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
        assert_eq!(seen[0], Duration::from_secs(1));
        assert_eq!(seen[1], Duration::from_secs(2));
        assert_eq!(seen[5], Duration::from_secs(30));
        assert_eq!(seen[6], Duration::from_secs(30));
    }
}
