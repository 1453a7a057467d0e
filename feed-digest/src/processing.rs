use crate::llm_adapter::{LlmAdapter, SummaryRequest};
use crate::types::{CommitError, PoolReport, StoreFailure};
use futures::stream::{self, StreamExt, TryStreamExt};
use interfaces::defs::{CandidateItem, DigestItem, SummaryFailure};
use interfaces::state::{DedupStore, StoreError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

enum ItemOutcome {
    Committed(DigestItem),
    NotCommitted(StoreFailure),
}

/// Bounded-concurrency summarization of candidate items.
///
/// Every item ends committed to the dedup store (and returned for the
/// digest) or, when another writer recorded it first, reported as a store
/// failure. A failed summary is still committed, carrying its error marker.
/// Any other store error stops the pool: in-flight items are dropped and
/// nothing further is summarized.
pub struct SummarizationPool {
    llm: Arc<dyn LlmAdapter>,
    concurrency: usize,
}

impl SummarizationPool {
    pub fn new(llm: Arc<dyn LlmAdapter>, concurrency: usize) -> Self {
        Self {
            llm,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run(
        &self,
        candidates: Vec<CandidateItem>,
        store: &dyn DedupStore,
    ) -> Result<PoolReport, CommitError> {
        let submitted = candidates.len();
        info!(
            items = submitted,
            concurrency = self.concurrency,
            adapter = %self.llm.adapter_name(),
            "Summarizing new items"
        );

        let outcomes: Vec<ItemOutcome> = stream::iter(candidates)
            .map(|item| self.process_item(item, store))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut report = PoolReport::default();
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Committed(item) => report.items.push(item),
                ItemOutcome::NotCommitted(failure) => report.store_failures.push(failure),
            }
        }

        let failed_summaries = report.items.iter().filter(|i| i.summary.is_err()).count();
        info!(
            committed = report.items.len(),
            failed_summaries,
            store_failures = report.store_failures.len(),
            "Summarization phase complete"
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        item: CandidateItem,
        store: &dyn DedupStore,
    ) -> Result<ItemOutcome, CommitError> {
        let request = SummaryRequest::from(&item);
        let summary = match self.llm.create_summary(&request).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                warn!(url = %item.url, error = %e, "Summarization failed, recording error marker");
                Err(SummaryFailure::new(e.to_string()))
            }
        };

        let digest_item = DigestItem { item, summary };

        match store.insert(&digest_item.to_seen_record()).await {
            Ok(()) => {
                debug!(url = %digest_item.item.url, "Committed item");
                Ok(ItemOutcome::Committed(digest_item))
            }
            Err(StoreError::DuplicateKey { url }) => {
                warn!(url = %url, "Item was already recorded by another worker");
                Ok(ItemOutcome::NotCommitted(StoreFailure {
                    url,
                    error: "duplicate key".to_string(),
                }))
            }
            Err(source) => {
                error!(url = %digest_item.item.url, error = %source, "Failed to record item as seen");
                Err(CommitError {
                    url: digest_item.item.url,
                    source,
                })
            }
        }
    }
}
