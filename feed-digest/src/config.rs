use crate::registry::SourceRegistry;
use crate::types::FetchConfig;
use clap::{Parser, ValueEnum};
use email_dispatch::SmtpConfig;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const PER_SOURCE_LIMIT: usize = 5;
pub const EXCERPT_CHARS: usize = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("feed source '{0}' is declared more than once")]
    DuplicateSource(String),

    #[error("invalid endpoint for feed source '{name}': {reason}")]
    InvalidEndpoint { name: String, reason: String },

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid feed list: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API
    Openai,
    /// Offline extractive summaries, no API calls
    Extractive,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Topic the per-item prompt asks the model to focus on.
    pub focus: String,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("backend", &self.backend)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("focus", &self.focus)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp: SmtpConfig,
    pub from: String,
    pub recipients: Vec<String>,
    pub digest_title: String,
}

/// Everything a run needs, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub registry: SourceRegistry,
    pub db_path: PathBuf,
    pub concurrency: usize,
    pub per_source_limit: usize,
    pub excerpt_chars: usize,
    pub fetch: FetchConfig,
    pub llm: LlmConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Parser)]
#[command(name = "feed-digest", about = "Summarize new feed articles and email a daily digest")]
pub struct Cli {
    /// JSON file listing feed sources as [{"name": .., "endpoint": ..}]
    #[arg(long, env = "DIGEST_FEEDS")]
    pub feeds: Option<PathBuf>,

    /// SQLite file recording already processed articles
    #[arg(long, env = "DB_PATH", default_value = "seen_dg_articles.db")]
    pub db_path: PathBuf,

    /// Maximum number of summaries requested at once
    #[arg(long, env = "DIGEST_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = 10)]
    pub feed_timeout_seconds: u64,

    #[arg(long, value_enum, env = "DIGEST_LLM", default_value = "openai")]
    pub llm: LlmBackend,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4")]
    pub model: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[arg(long, env = "DIGEST_FOCUS", default_value = "demand-gen")]
    pub focus: String,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,

    /// Sender address, defaults to the SMTP user
    #[arg(long, env = "EMAIL_FROM")]
    pub from: Option<String>,

    /// Comma separated digest recipients
    #[arg(long, env = "DIGEST_RECIPIENTS", value_delimiter = ',')]
    pub recipients: Vec<String>,

    #[arg(long, env = "DIGEST_TITLE", default_value = "Daily Demand Gen Digest")]
    pub title: String,
}

impl AgentConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let registry = match &cli.feeds {
            Some(path) => SourceRegistry::load(path)?,
            None => SourceRegistry::default(),
        };
        if registry.is_empty() {
            return Err(ConfigError::Invalid("no feed sources configured".to_string()));
        }

        if cli.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }

        let api_key = cli.openai_api_key.filter(|key| !key.trim().is_empty());
        if cli.llm == LlmBackend::Openai && api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        let smtp_user = cli.smtp_user.ok_or(ConfigError::Missing("SMTP_USER"))?;
        let smtp_pass = cli.smtp_pass.ok_or(ConfigError::Missing("SMTP_PASS"))?;

        let recipients: Vec<String> = cli
            .recipients
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(ConfigError::Missing("DIGEST_RECIPIENTS"));
        }

        let from = cli.from.unwrap_or_else(|| smtp_user.clone());

        Ok(Self {
            registry,
            db_path: cli.db_path,
            concurrency: cli.concurrency,
            per_source_limit: PER_SOURCE_LIMIT,
            excerpt_chars: EXCERPT_CHARS,
            fetch: FetchConfig {
                timeout_seconds: cli.feed_timeout_seconds,
                ..FetchConfig::default()
            },
            llm: LlmConfig {
                backend: cli.llm,
                api_key,
                model: cli.model,
                base_url: cli.openai_base_url,
                focus: cli.focus,
            },
            mail: MailConfig {
                smtp: SmtpConfig {
                    host: cli.smtp_host,
                    port: cli.smtp_port,
                    username: smtp_user,
                    password: smtp_pass,
                },
                from,
                recipients,
                digest_title: cli.title,
            },
        })
    }
}
