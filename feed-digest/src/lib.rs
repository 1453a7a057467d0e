pub mod aggregator;
pub mod config;
pub mod digest;
pub mod dispatch;
pub mod fetcher;
pub mod llm_adapter;
pub mod parser;
pub mod pipeline;
pub mod processing;
pub mod registry;
pub mod rss_utils;
pub mod traits;
pub mod types;

pub use aggregator::{AggregateError, DigestAggregator};
pub use config::{AgentConfig, Cli, ConfigError, LlmBackend};
pub use digest::{Digest, SourceSection, NO_NEW_ARTICLES_NARRATIVE};
pub use dispatch::Dispatcher;
pub use fetcher::{FeedFetcher, HttpFeedTransport};
pub use llm_adapter::{LlmAdapter, LlmError, SummaryRequest};
pub use parser::FeedParser;
pub use pipeline::{DigestPipeline, PipelineError, RunOutcome, RunPhase};
pub use processing::SummarizationPool;
pub use registry::SourceRegistry;
pub use traits::FeedTransport;
pub use types::*;
