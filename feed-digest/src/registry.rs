use crate::config::ConfigError;
use interfaces::defs::FeedSource;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Feeds watched by a default deployment, in digest order.
const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("DemandGenReport", "https://www.demandgenreport.com/feed/"),
    ("MarketingProfs", "https://www.marketingprofs.com/topic/all/rss"),
    ("TopRank", "http://feeds.feedburner.com/onlinemarketingseoblog"),
    ("Forrester", "https://go.forrester.com/blogs/feed/"),
    ("CMOPodcast", "https://rss.art19.com/the-cmo-podcast"),
    ("RevOpsCoOp", "https://revopscoop.substack.com/feed"),
    ("WizardsOfOps", "https://wizardofops.substack.com/feed"),
];

/// Ordered, immutable set of feed sources. Declaration order is the order
/// sources appear in the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<FeedSource>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    name: String,
    endpoint: String,
}

impl SourceRegistry {
    pub fn new(sources: Vec<FeedSource>) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        for source in &sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("feed source with empty name".to_string()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
        }
        Ok(Self { sources })
    }

    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigError> {
        let sources = pairs
            .into_iter()
            .map(|(name, endpoint)| {
                let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(FeedSource {
                    name: name.to_string(),
                    endpoint,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Self::new(sources)
    }

    /// Parse a JSON array of `{"name": .., "endpoint": ..}` objects.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let entries: Vec<SourceEntry> = serde_json::from_str(json)?;
        Self::from_pairs(
            entries
                .iter()
                .map(|entry| (entry.name.as_str(), entry.endpoint.as_str())),
        )
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FeedSource> {
        self.sources.iter().find(|source| source.name == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let sources = DEFAULT_FEEDS
            .iter()
            .filter_map(|(name, endpoint)| {
                Url::parse(endpoint).ok().map(|endpoint| FeedSource {
                    name: name.to_string(),
                    endpoint,
                })
            })
            .collect();
        Self { sources }
    }
}
