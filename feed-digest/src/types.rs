use interfaces::defs::{CandidateItem, DigestItem};
use interfaces::state::StoreError;

/// HTTP settings for feed retrieval.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; feed-digest/0.1)".to_string(),
            timeout_seconds: 10,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// New items found for one source, in feed order.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub items: Vec<CandidateItem>,
    /// Set when the source was skipped for this run.
    pub failure: Option<String>,
}

impl SourceBatch {
    pub fn failed(source: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            items: Vec::new(),
            failure: Some(failure.into()),
        }
    }
}

/// Outcome of the summarization phase.
#[derive(Debug, Default)]
pub struct PoolReport {
    /// Items that were summarized (or failed to) and committed to the store,
    /// in completion order.
    pub items: Vec<DigestItem>,
    /// Items another writer recorded first. They are left out of the digest.
    pub store_failures: Vec<StoreFailure>,
}

#[derive(Debug)]
pub struct StoreFailure {
    pub url: String,
    pub error: String,
}

/// A commit that failed for a reason other than the item already being
/// recorded. Ends the summarization phase.
#[derive(Debug, thiserror::Error)]
#[error("failed to record {url} as seen: {source}")]
pub struct CommitError {
    pub url: String,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },
}
