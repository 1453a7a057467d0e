use crate::digest::{Digest, SourceSection, NO_NEW_ARTICLES_NARRATIVE};
use crate::llm_adapter::{LlmAdapter, LlmError};
use crate::types::SourceBatch;
use chrono::{DateTime, Local};
use interfaces::defs::DigestItem;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("narrative synthesis failed: {0}")]
    Synthesis(#[source] LlmError),
}

/// Builds the digest from the fetch batches and the summarized items.
pub struct DigestAggregator {
    llm: Arc<dyn LlmAdapter>,
}

impl DigestAggregator {
    pub fn new(llm: Arc<dyn LlmAdapter>) -> Self {
        Self { llm }
    }

    /// Group `items` by source in batch (registry) order, items in fetch
    /// order, then add the narrative. Items missing from `items` (not
    /// committed) are left out; sources with nothing keep an empty section.
    pub async fn build(
        &self,
        batches: &[SourceBatch],
        items: Vec<DigestItem>,
        generated_at: DateTime<Local>,
    ) -> Result<Digest, AggregateError> {
        let sections = group_by_source(batches, items);
        let lines = synthesis_lines(&sections);

        let narrative = if lines.is_empty() {
            debug!("No new items, skipping synthesis");
            NO_NEW_ARTICLES_NARRATIVE.to_string()
        } else {
            info!(items = lines.len(), adapter = %self.llm.adapter_name(), "Synthesizing digest narrative");
            self.llm
                .generate_digest(&lines)
                .await
                .map_err(AggregateError::Synthesis)?
                .trim()
                .to_string()
        };

        Ok(Digest {
            generated_at,
            narrative,
            sections,
        })
    }
}

/// Re-impose registry and feed order on items that arrived in completion order.
pub fn group_by_source(batches: &[SourceBatch], items: Vec<DigestItem>) -> Vec<SourceSection> {
    let mut by_url: HashMap<String, DigestItem> = items
        .into_iter()
        .map(|item| (item.item.url.clone(), item))
        .collect();

    batches
        .iter()
        .map(|batch| SourceSection {
            source: batch.source.clone(),
            items: batch
                .items
                .iter()
                .filter_map(|candidate| by_url.remove(&candidate.url))
                .collect(),
        })
        .collect()
}

/// `"{title}: {summary}"` for every item, in digest order.
pub fn synthesis_lines(sections: &[SourceSection]) -> Vec<String> {
    sections
        .iter()
        .flat_map(|section| section.items.iter())
        .map(|item| format!("{}: {}", item.item.title, item.summary_text()))
        .collect()
}
