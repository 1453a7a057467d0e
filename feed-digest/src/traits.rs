use crate::types::FetchError;
use async_trait::async_trait;
use interfaces::defs::{FeedEntry, FeedSource};

/// Retrieves and normalizes the current entries of a feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// All entries currently published by `source`, in feed order.
    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, FetchError>;
}
