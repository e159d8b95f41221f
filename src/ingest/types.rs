// src/ingest/types.rs
use async_trait::async_trait;
use serde::Deserialize;

/// One externally operated RSS/Atom endpoint. Immutable; identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// One item as parsed from a feed, pre-annotation. Transient; discarded
/// once the corresponding article has been built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    /// Canonical article URL.
    pub link: String,
    /// Unix seconds. The parser substitutes "now" when the feed omits the
    /// date or we cannot parse it, so the entry survives recency filtering.
    pub published_at: i64,
    /// HTML-laden snippet straight from the feed.
    pub raw_summary: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("http status {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("empty response body")]
    EmptyBody,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed feed: {0}")]
    Malformed(String),

    #[error("unrecognized feed format")]
    UnrecognizedFormat,

    #[error("feed contained no usable entries")]
    NoEntries,
}

/// Why one source produced nothing this pass. Recorded per source for
/// observability; never aborts the pass.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Seam between the pipeline and the network so tests can stand in
/// canned bodies and failures per URL.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
