use crate::types::FetchError;
use feed_rs::parser;
use interfaces::defs::FeedEntry;
use tracing::debug;

/// Turns raw RSS/Atom/JSON Feed bytes into normalized [`FeedEntry`] values,
/// preserving feed order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &[u8]) -> Result<Vec<FeedEntry>, FetchError> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content)
            .map_err(|e| FetchError::Parse(format!("Failed to parse feed: {}", e)))?;

        let entries: Vec<FeedEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> FeedEntry {
        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty());

        // The first unlabelled or rel="alternate" link is the article itself.
        let primary_index = entry.links.iter().position(|link| {
            matches!(link.rel.as_deref(), None | Some("alternate"))
        });

        let mut link = None;
        let mut alternate_links = Vec::new();
        for (index, l) in entry.links.into_iter().enumerate() {
            if Some(index) == primary_index {
                link = Some(l.href);
            } else {
                alternate_links.push(l.href);
            }
        }

        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body));

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc2822());

        FeedEntry {
            title,
            link,
            alternate_links,
            summary,
            published,
        }
    }
}
