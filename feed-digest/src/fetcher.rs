use crate::parser::FeedParser;
use crate::registry::SourceRegistry;
use crate::rss_utils;
use crate::traits::FeedTransport;
use crate::types::{FetchConfig, FetchError, SourceBatch};
use async_trait::async_trait;
use futures::future::join_all;
use interfaces::defs::{CandidateItem, FeedEntry, FeedSource};
use interfaces::state::DedupStore;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// [`FeedTransport`] over HTTP(S), parsing with `feed-rs`.
pub struct HttpFeedTransport {
    client: Client,
    config: FetchConfig,
    parser: FeedParser,
}

impl HttpFeedTransport {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            parser: FeedParser::new(),
        })
    }
}

#[async_trait]
impl FeedTransport for HttpFeedTransport {
    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, FetchError> {
        let start_time = Instant::now();
        debug!("Fetching feed: {} ({})", source.endpoint, source.name);

        let response = self.client.get(source.endpoint.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: source.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let max_bytes = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > max_bytes {
                return Err(FetchError::FeedTooLarge {
                    size_mb: content_length as usize / (1024 * 1024),
                });
            }
        }

        let body = response.bytes().await?;
        if body.len() > max_bytes {
            return Err(FetchError::FeedTooLarge {
                size_mb: body.len() / (1024 * 1024),
            });
        }

        let entries = self.parser.parse_feed(&body)?;
        info!(
            source = %source.name,
            entries = entries.len(),
            bytes = body.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Fetched feed"
        );
        Ok(entries)
    }
}

/// Turns the registry into per-source batches of unseen candidate items.
pub struct FeedFetcher {
    registry: SourceRegistry,
    transport: Arc<dyn FeedTransport>,
    per_source_limit: usize,
    excerpt_chars: usize,
}

impl FeedFetcher {
    pub fn new(
        registry: SourceRegistry,
        transport: Arc<dyn FeedTransport>,
        per_source_limit: usize,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            registry,
            transport,
            per_source_limit,
            excerpt_chars,
        }
    }

    /// Fetch every source concurrently. The result has one batch per
    /// registered source, in registry order. A failing source yields an
    /// empty batch and never affects the others.
    pub async fn fetch_all(&self, store: &dyn DedupStore) -> Vec<SourceBatch> {
        let batches = join_all(
            self.registry
                .sources()
                .iter()
                .map(|source| self.fetch_source(source, store)),
        )
        .await;

        let batches = drop_repeated_urls(batches);

        let total: usize = batches.iter().map(|b| b.items.len()).sum();
        let failed = batches.iter().filter(|b| b.failure.is_some()).count();
        info!(
            sources = batches.len(),
            failed_sources = failed,
            candidates = total,
            "Fetch phase complete"
        );
        batches
    }

    async fn fetch_source(&self, source: &FeedSource, store: &dyn DedupStore) -> SourceBatch {
        let entries = match self.transport.fetch_entries(source).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(source = %source.name, error = %e, "Feed unavailable, skipping source for this run");
                return SourceBatch::failed(&source.name, e.to_string());
            }
        };

        let mut items = Vec::new();
        for entry in entries.into_iter().take(self.per_source_limit) {
            let url = match entry.identity() {
                Some(url) => url.to_string(),
                None => {
                    debug!(source = %source.name, title = ?entry.title, "Dropping entry without a link");
                    continue;
                }
            };

            match store.exists(&url).await {
                Ok(true) => {
                    debug!(source = %source.name, url = %url, "Already seen");
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(source = %source.name, error = %e, "Dedup lookup failed, skipping source for this run");
                    return SourceBatch::failed(&source.name, e.to_string());
                }
            }

            items.push(self.candidate(source, url, entry));
        }

        debug!(source = %source.name, new_items = items.len(), "Filtered feed entries");
        SourceBatch {
            source: source.name.clone(),
            items,
            failure: None,
        }
    }

    fn candidate(&self, source: &FeedSource, url: String, entry: FeedEntry) -> CandidateItem {
        CandidateItem {
            source: source.name.clone(),
            title: entry.title.unwrap_or_else(|| "No title".to_string()),
            url,
            excerpt: entry
                .summary
                .map(|summary| rss_utils::excerpt(&summary, self.excerpt_chars))
                .unwrap_or_default(),
            published_at: entry.published.unwrap_or_default(),
        }
    }
}

/// Keep only the first occurrence of each url across all batches, scanning
/// in registry order then feed order.
fn drop_repeated_urls(batches: Vec<SourceBatch>) -> Vec<SourceBatch> {
    let mut emitted = HashSet::new();
    batches
        .into_iter()
        .map(|mut batch| {
            batch.items.retain(|item| {
                let first = emitted.insert(item.url.clone());
                if !first {
                    debug!(source = %batch.source, url = %item.url, "Dropping repeated url");
                }
                first
            });
            batch
        })
        .collect()
}
