use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A named syndication feed, fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub endpoint: Url,
}

/// One entry as handed back by the feed retrieval collaborator, already
/// normalized away from RSS/Atom specifics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    /// Primary (alternate/unlabelled) link.
    pub link: Option<String>,
    /// Any other links on the entry, in document order.
    pub alternate_links: Vec<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
}

impl FeedEntry {
    /// The identity of an entry: its primary link, or the first other link.
    pub fn identity(&self) -> Option<&str> {
        self.link
            .as_deref()
            .filter(|link| !link.trim().is_empty())
            .or_else(|| {
                self.alternate_links
                    .iter()
                    .map(String::as_str)
                    .find(|link| !link.trim().is_empty())
            })
    }
}

/// A feed entry that the dedup store has never seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateItem {
    pub source: String,
    pub title: String,
    pub url: String,
    pub excerpt: String,
    pub published_at: String,
}

/// Durable marker that an item was attempted. Never mutated once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub url: String,
    pub title: String,
    pub published_at: String,
    pub summary: String,
}

/// Why an item could not be summarized. Kept as a value so callers can
/// inspect it; rendering turns it into the inline marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryFailure {
    pub reason: String,
}

impl SummaryFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SummaryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Error summarizing: {}]", self.reason)
    }
}

/// A candidate together with the outcome of its summarization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestItem {
    pub item: CandidateItem,
    pub summary: Result<String, SummaryFailure>,
}

impl DigestItem {
    /// Text shown to readers and persisted in the store.
    pub fn summary_text(&self) -> String {
        match &self.summary {
            Ok(text) => text.clone(),
            Err(failure) => failure.to_string(),
        }
    }

    pub fn to_seen_record(&self) -> SeenRecord {
        SeenRecord {
            url: self.item.url.clone(),
            title: self.item.title.clone(),
            published_at: self.item.published_at.clone(),
            summary: self.summary_text(),
        }
    }
}

/// A fully composed message ready for the mail transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub subject: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub html_body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("no recipients configured")]
    NoRecipients,

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Outbound delivery of a composed digest.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DispatchError>;
}
