use anyhow::{Context, Result};
use clap::Parser;
use email_dispatch::SmtpMailer;
use feed_digest::llm_adapter::build_adapter;
use feed_digest::{AgentConfig, Cli, DigestPipeline, HttpFeedTransport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AgentConfig::from_cli(Cli::parse()).context("invalid configuration")?;
    info!(
        sources = config.registry.len(),
        db_path = %config.db_path.display(),
        concurrency = config.concurrency,
        llm = ?config.llm.backend,
        "Starting feed digest run"
    );

    let transport = HttpFeedTransport::new(config.fetch.clone()).context("failed to build HTTP client")?;
    let llm = build_adapter(&config.llm).context("failed to build LLM adapter")?;
    let mailer = SmtpMailer::new(&config.mail.smtp).context("failed to configure SMTP transport")?;

    let pipeline = DigestPipeline::new(&config, Arc::new(transport), llm, Arc::new(mailer));

    match pipeline.run().await {
        Ok(outcome) => {
            println!("{}", outcome.report());
            Ok(())
        }
        Err(e) => {
            let phase = e.phase();
            error!(phase = %phase, "Digest run aborted: {}", e);
            Err(e).context(format!("digest run failed during {} phase", phase))
        }
    }
}
