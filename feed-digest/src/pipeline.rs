use crate::aggregator::{AggregateError, DigestAggregator};
use crate::config::AgentConfig;
use crate::digest::Digest;
use crate::dispatch::Dispatcher;
use crate::fetcher::FeedFetcher;
use crate::llm_adapter::LlmAdapter;
use crate::processing::SummarizationPool;
use crate::registry::SourceRegistry;
use crate::traits::FeedTransport;
use chrono::Local;
use interfaces::defs::{CandidateItem, DispatchError, MailTransport};
use interfaces::state::{DedupStore, SqliteDedupStore, StoreError};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Lifecycle of a single run.
///
/// `Init → Fetching → Summarizing → Aggregating → Dispatching → Done`.
/// `Failed` is reachable from `Init` (store cannot be opened), `Summarizing`
/// (an item cannot be recorded as seen), `Aggregating` and `Dispatching`.
/// Fetch and summary failures are absorbed per source and per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Fetching,
    Summarizing,
    Aggregating,
    Dispatching,
    Done,
    Failed,
}

impl RunPhase {
    pub fn can_fail(self) -> bool {
        matches!(
            self,
            RunPhase::Init | RunPhase::Summarizing | RunPhase::Aggregating | RunPhase::Dispatching
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Init => "init",
            RunPhase::Fetching => "fetching",
            RunPhase::Summarizing => "summarizing",
            RunPhase::Aggregating => "aggregating",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one new item existed and the digest went out.
    SentDigest { items: usize, sources: usize },
    NoNewArticles,
}

impl RunOutcome {
    pub fn report(&self) -> &'static str {
        match self {
            RunOutcome::SentDigest { .. } => "Sent digest with extended TLDR and per-source updates.",
            RunOutcome::NoNewArticles => "No new articles today for any source.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("init: failed to open dedup store at {path}: {source}")]
    StoreOpen {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("summarizing: failed to record {url} as seen: {source}")]
    Store {
        url: String,
        #[source]
        source: StoreError,
    },

    #[error("aggregating: {0}")]
    Synthesis(#[from] AggregateError),

    #[error("dispatching: {0}")]
    Dispatch(#[from] DispatchError),
}

impl PipelineError {
    /// Phase the run was in when it failed.
    pub fn phase(&self) -> RunPhase {
        match self {
            PipelineError::StoreOpen { .. } => RunPhase::Init,
            PipelineError::Store { .. } => RunPhase::Summarizing,
            PipelineError::Synthesis(_) => RunPhase::Aggregating,
            PipelineError::Dispatch(_) => RunPhase::Dispatching,
        }
    }
}

struct PhaseTracker {
    current: RunPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            current: RunPhase::Init,
        }
    }

    fn enter(&mut self, next: RunPhase) {
        info!(from = %self.current, to = %next, "Run phase");
        self.current = next;
    }

    fn fail(&mut self, err: &PipelineError) {
        debug_assert!(self.current.can_fail());
        error!(phase = %self.current, error = %err, "Run failed");
        self.current = RunPhase::Failed;
    }
}

/// One fetch → summarize → aggregate → dispatch pass over the registry.
pub struct DigestPipeline {
    registry: SourceRegistry,
    db_path: PathBuf,
    concurrency: usize,
    per_source_limit: usize,
    excerpt_chars: usize,
    transport: Arc<dyn FeedTransport>,
    llm: Arc<dyn LlmAdapter>,
    dispatcher: Dispatcher,
}

impl DigestPipeline {
    pub fn new(
        config: &AgentConfig,
        transport: Arc<dyn FeedTransport>,
        llm: Arc<dyn LlmAdapter>,
        mailer: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            registry: config.registry.clone(),
            db_path: config.db_path.clone(),
            concurrency: config.concurrency,
            per_source_limit: config.per_source_limit,
            excerpt_chars: config.excerpt_chars,
            transport,
            llm,
            dispatcher: Dispatcher::from_config(mailer, &config.mail),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        self.run_once()
            .instrument(info_span!("digest_run", %run_id))
            .await
    }

    async fn run_once(&self) -> Result<RunOutcome, PipelineError> {
        let mut phase = PhaseTracker::new();

        let max_writers = u32::try_from(self.concurrency).unwrap_or(u32::MAX);
        let store = match SqliteDedupStore::open(&self.db_path, max_writers).await {
            Ok(store) => store,
            Err(source) => {
                let err = PipelineError::StoreOpen {
                    path: self.db_path.display().to_string(),
                    source,
                };
                phase.fail(&err);
                return Err(err);
            }
        };

        let result = self.run_with_store(&store, &mut phase).await;
        store.close().await;

        match &result {
            Ok(outcome) => {
                phase.enter(RunPhase::Done);
                info!("{}", outcome.report());
            }
            Err(err) => phase.fail(err),
        }
        result
    }

    async fn run_with_store(
        &self,
        store: &dyn DedupStore,
        phase: &mut PhaseTracker,
    ) -> Result<RunOutcome, PipelineError> {
        phase.enter(RunPhase::Fetching);
        let fetcher = FeedFetcher::new(
            self.registry.clone(),
            self.transport.clone(),
            self.per_source_limit,
            self.excerpt_chars,
        );
        let batches = fetcher.fetch_all(store).await;

        phase.enter(RunPhase::Summarizing);
        let candidates: Vec<CandidateItem> = batches
            .iter()
            .flat_map(|batch| batch.items.iter().cloned())
            .collect();
        let pool = SummarizationPool::new(self.llm.clone(), self.concurrency);
        let report = pool
            .run(candidates, store)
            .await
            .map_err(|e| PipelineError::Store {
                url: e.url,
                source: e.source,
            })?;

        for failure in &report.store_failures {
            warn!(url = %failure.url, error = %failure.error, "Item left out of digest");
        }

        if report.items.is_empty() {
            return Ok(RunOutcome::NoNewArticles);
        }

        phase.enter(RunPhase::Aggregating);
        let aggregator = DigestAggregator::new(self.llm.clone());
        let digest: Digest = aggregator.build(&batches, report.items, Local::now()).await?;

        phase.enter(RunPhase::Dispatching);
        self.dispatcher.dispatch(&digest).await?;

        Ok(RunOutcome::SentDigest {
            items: digest.total_items(),
            sources: digest.sections.iter().filter(|s| !s.items.is_empty()).count(),
        })
    }
}
