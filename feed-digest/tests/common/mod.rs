#![allow(dead_code)]

use async_trait::async_trait;
use email_dispatch::SmtpConfig;
use feed_digest::config::{LlmConfig, MailConfig};
use feed_digest::{
    AgentConfig, FeedTransport, FetchConfig, FetchError, LlmAdapter, LlmBackend, LlmError,
    SourceRegistry, SummaryRequest,
};
use interfaces::defs::{DispatchError, FeedEntry, FeedSource, MailTransport, OutgoingMessage};
use interfaces::state::{DedupStore, SqliteDedupStore};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

pub fn entry(title: &str, link: &str) -> FeedEntry {
    FeedEntry {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        alternate_links: Vec::new(),
        summary: Some(format!("{} explained. Second sentence. Third sentence.", title)),
        published: Some("Mon, 6 Oct 2025 09:00:00 +0000".to_string()),
    }
}

/// `count` entries titled "<prefix> 1".. with links https://<prefix>.example.com/1..
pub fn entries(prefix: &str, count: usize) -> Vec<FeedEntry> {
    (1..=count)
        .map(|i| {
            entry(
                &format!("{} {}", prefix, i),
                &format!("https://{}.example.com/{}", prefix.to_lowercase(), i),
            )
        })
        .collect()
}

pub fn registry(names: &[&str]) -> SourceRegistry {
    let endpoints: Vec<(String, String)> = names
        .iter()
        .map(|name| {
            (
                name.to_string(),
                format!("https://feeds.example.com/{}.xml", name.to_lowercase()),
            )
        })
        .collect();
    SourceRegistry::from_pairs(endpoints.iter().map(|(n, e)| (n.as_str(), e.as_str())))
        .expect("valid test registry")
}

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join("seen.db")
}

pub fn test_config(dir: &Path, names: &[&str]) -> AgentConfig {
    AgentConfig {
        registry: registry(names),
        db_path: db_path(dir),
        concurrency: 5,
        per_source_limit: 5,
        excerpt_chars: 300,
        fetch: FetchConfig::default(),
        llm: LlmConfig {
            backend: LlmBackend::Extractive,
            api_key: None,
            model: "test-model".to_string(),
            base_url: "http://localhost".to_string(),
            focus: "demand-gen".to_string(),
        },
        mail: MailConfig {
            smtp: SmtpConfig {
                host: "localhost".to_string(),
                port: 2525,
                username: "digest@example.com".to_string(),
                password: "secret".to_string(),
            },
            from: "digest@example.com".to_string(),
            recipients: vec!["alice@example.com".to_string(), "bob@example.com".to_string()],
            digest_title: "Daily Digest".to_string(),
        },
    }
}

pub async fn open_store(dir: &Path) -> SqliteDedupStore {
    SqliteDedupStore::open(db_path(dir), 5)
        .await
        .expect("open test store")
}

/// Feed transport answering from fixed per-source entry lists.
#[derive(Default)]
pub struct StubTransport {
    feeds: HashMap<String, Result<Vec<FeedEntry>, String>>,
    pub calls: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(mut self, source: &str, entries: Vec<FeedEntry>) -> Self {
        self.feeds.insert(source.to_string(), Ok(entries));
        self
    }

    pub fn with_failure(mut self, source: &str, message: &str) -> Self {
        self.feeds.insert(source.to_string(), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl FeedTransport for StubTransport {
    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.feeds.get(&source.name) {
            Some(Ok(entries)) => Ok(entries.clone()),
            Some(Err(message)) => Err(FetchError::Parse(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// LLM double with scripted failures, delays and call recording.
#[derive(Default)]
pub struct ScriptedLlm {
    failing_urls: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    fail_synthesis: bool,
    pub summary_calls: Mutex<Vec<String>>,
    pub synthesis_calls: Mutex<Vec<Vec<String>>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn failing_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }

    pub fn summary_call_count(&self) -> usize {
        self.summary_calls.lock().unwrap().len()
    }

    pub fn synthesis_call_count(&self) -> usize {
        self.synthesis_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmAdapter for ScriptedLlm {
    fn adapter_name(&self) -> String {
        "Scripted".to_string()
    }

    async fn create_summary(&self, request: &SummaryRequest) -> Result<String, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&request.url)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.summary_calls.lock().unwrap().push(request.url.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_urls.contains(&request.url) {
            Err(LlmError::Other("model overloaded".to_string()))
        } else {
            Ok(format!("  Summary of {}.  \n", request.title))
        }
    }

    async fn generate_digest(&self, lines: &[String]) -> Result<String, LlmError> {
        self.synthesis_calls.lock().unwrap().push(lines.to_vec());
        if self.fail_synthesis {
            Err(LlmError::Status {
                status: 500,
                body: "internal error".to_string(),
            })
        } else {
            Ok("Theme one.\nTheme two.".to_string())
        }
    }
}

/// Mail transport that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    fail: bool,
    check_store: Option<PathBuf>,
    pub sent: Mutex<Vec<OutgoingMessage>>,
    /// For every linked url in a sent body: was it in the store at send time?
    pub committed_at_send: Mutex<Vec<(String, bool)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn checking_store(path: PathBuf) -> Self {
        Self {
            check_store: Some(path),
            ..Self::default()
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_body(&self) -> String {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|m| m.html_body.clone())
            .unwrap_or_default()
    }
}

pub fn linked_urls(html: &str) -> Vec<String> {
    html.split("href=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(|url| url.to_string())
        .collect()
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Transport("connection refused".to_string()));
        }

        if let Some(path) = &self.check_store {
            let store = SqliteDedupStore::open(path, 1)
                .await
                .map_err(|e| DispatchError::Transport(e.to_string()))?;
            let mut checks = Vec::new();
            for url in linked_urls(&message.html_body) {
                let seen = store
                    .exists(&url)
                    .await
                    .map_err(|e| DispatchError::Transport(e.to_string()))?;
                checks.push((url, seen));
            }
            store.close().await;
            self.committed_at_send.lock().unwrap().extend(checks);
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
