// src/ingest/fetch.rs
//! Bounded-time HTTP GET per feed source. One slow or down source must not
//! delay the others; the per-request deadline is enforced here and the
//! timed-out future is dropped, which aborts the underlying request.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::ingest::types::{FeedClient, FetchError};

pub const USER_AGENT: &str = concat!("news-aggregator/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    deadline: Duration,
}

impl Fetcher {
    pub fn new(deadline: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, deadline }
    }

    /// Single GET with the configured deadline. No retries; the next
    /// scheduled refresh is the retry mechanism.
    pub async fn fetch_one(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching feed");

        let response = match timeout(self.deadline, self.client.get(url).send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(FetchError::Network(err)),
            Err(_) => return Err(FetchError::Timeout),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        // The body read shares the same deadline as the request itself.
        let body = match timeout(self.deadline, response.text()).await {
            Ok(Ok(body)) => body,
            Ok(Err(err)) => return Err(FetchError::Network(err)),
            Err(_) => return Err(FetchError::Timeout),
        };

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(body)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

#[async_trait]
impl FeedClient for Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_one(url).await
    }
}
