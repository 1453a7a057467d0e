use crate::config::{LlmBackend, LlmConfig};
use async_trait::async_trait;
use interfaces::defs::CandidateItem;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Fields of an article the summary prompt is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub title: String,
    pub url: String,
    pub excerpt: String,
}

impl From<&CandidateItem> for SummaryRequest {
    fn from(item: &CandidateItem) -> Self {
        Self {
            title: item.title.clone(),
            url: item.url.clone(),
            excerpt: item.excerpt.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

/// Text generation used for per-item summaries and the cross-source narrative.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    fn adapter_name(&self) -> String;

    /// Two-sentence, takeaway-focused summary of a single article.
    async fn create_summary(&self, request: &SummaryRequest) -> Result<String, LlmError>;

    /// Multi-paragraph narrative over `"title: summary"` lines.
    async fn generate_digest(&self, lines: &[String]) -> Result<String, LlmError>;
}

pub fn summary_prompt(focus: &str, request: &SummaryRequest) -> String {
    format!(
        "Summarize this article in two sentences, focusing on the core {} takeaway:\n\n{}\n{}\n{}",
        focus, request.title, request.url, request.excerpt
    )
}

pub fn synthesis_prompt(focus: &str, lines: &[String]) -> String {
    let bullets = lines
        .iter()
        .map(|line| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Given these {} article summaries, provide a detailed summary in 4–5 concise paragraphs, \
         highlighting key themes, emerging trends, and actionable insights across the batch of articles:\n\n{}",
        focus, bullets
    )
}

/// Build the adapter selected in configuration.
pub fn build_adapter(config: &LlmConfig) -> Result<Arc<dyn LlmAdapter>, LlmError> {
    match config.backend {
        LlmBackend::Openai => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::Other("OpenAI backend requires an API key".to_string()))?;
            Ok(Arc::new(OpenAiAdapter::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.focus.clone(),
            )?))
        }
        LlmBackend::Extractive => Ok(Arc::new(ExtractiveAdapter::new(config.focus.clone()))),
    }
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    focus: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String, model: String, base_url: String, focus: String) -> Result<Self, LlmError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            api_key,
            model,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            focus,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Status { status, body });
        }

        let parsed: ChatResponse = resp.json().await?;
        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyResponse)?;
        Ok(answer)
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn adapter_name(&self) -> String {
        format!("OpenAI ({})", self.model)
    }

    async fn create_summary(&self, request: &SummaryRequest) -> Result<String, LlmError> {
        debug!(url = %request.url, "Requesting article summary");
        self.complete(&summary_prompt(&self.focus, request)).await
    }

    async fn generate_digest(&self, lines: &[String]) -> Result<String, LlmError> {
        debug!(items = lines.len(), "Requesting digest narrative");
        self.complete(&synthesis_prompt(&self.focus, lines)).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Offline adapter: summaries are the leading sentences of the excerpt and
/// the narrative is the list of summaries itself.
pub struct ExtractiveAdapter {
    focus: String,
}

impl ExtractiveAdapter {
    pub fn new(focus: String) -> Self {
        Self { focus }
    }
}

#[async_trait]
impl LlmAdapter for ExtractiveAdapter {
    fn adapter_name(&self) -> String {
        format!("Extractive ({})", self.focus)
    }

    async fn create_summary(&self, request: &SummaryRequest) -> Result<String, LlmError> {
        let sentences: Vec<&str> = request
            .excerpt
            .split_inclusive(". ")
            .take(2)
            .collect();

        let summary = sentences.concat().trim().to_string();
        if summary.is_empty() {
            Ok(request.title.clone())
        } else {
            Ok(summary)
        }
    }

    async fn generate_digest(&self, lines: &[String]) -> Result<String, LlmError> {
        Ok(format!(
            "{} new articles today.\n\n{}",
            lines.len(),
            lines.join("\n\n")
        ))
    }
}
