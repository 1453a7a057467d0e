use clap::Parser;
use feed_digest::{AgentConfig, Cli, ConfigError, LlmBackend, SourceRegistry};
use std::io::Write;
use tempfile::NamedTempFile;

const BASE_ARGS: &[&str] = &[
    "feed-digest",
    "--smtp-user",
    "digest@example.com",
    "--smtp-pass",
    "app-password",
    "--recipients",
    "alice@example.com, bob@example.com",
];

fn parse(extra: &[&str]) -> Result<AgentConfig, ConfigError> {
    let args: Vec<&str> = BASE_ARGS.iter().chain(extra.iter()).copied().collect();
    let cli = Cli::try_parse_from(args).expect("arguments parse");
    AgentConfig::from_cli(cli)
}

#[test]
fn test_registry_from_json_keeps_declaration_order() {
    let registry = SourceRegistry::from_json(
        r#"[
            {"name": "Zeta", "endpoint": "https://zeta.example.com/feed"},
            {"name": "Alpha", "endpoint": "https://alpha.example.com/rss"}
        ]"#,
    )
    .unwrap();

    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
    assert_eq!(
        registry.get("Alpha").unwrap().endpoint.as_str(),
        "https://alpha.example.com/rss"
    );
}

#[test]
fn test_registry_rejects_duplicate_and_invalid_sources() {
    let duplicate = SourceRegistry::from_pairs([
        ("Alpha", "https://alpha.example.com/rss"),
        ("Alpha", "https://other.example.com/rss"),
    ]);
    assert!(matches!(duplicate, Err(ConfigError::DuplicateSource(name)) if name == "Alpha"));

    let invalid = SourceRegistry::from_pairs([("Alpha", "not a url")]);
    assert!(matches!(invalid, Err(ConfigError::InvalidEndpoint { .. })));

    assert!(matches!(SourceRegistry::from_json("{}"), Err(ConfigError::Json(_))));
}

#[test]
fn test_default_registry_lists_seven_feeds() {
    let registry = SourceRegistry::default();
    assert_eq!(registry.len(), 7);
    assert_eq!(registry.names().next(), Some("DemandGenReport"));
}

#[test]
fn test_config_from_cli() {
    let mut feeds = NamedTempFile::new().unwrap();
    write!(
        feeds,
        r#"[{{"name": "Alpha", "endpoint": "https://alpha.example.com/rss"}}]"#
    )
    .unwrap();
    let path = feeds.path().to_str().unwrap().to_string();

    let config = parse(&[
        "--llm",
        "extractive",
        "--concurrency",
        "3",
        "--feeds",
        path.as_str(),
        "--from",
        "news@example.com",
    ]).unwrap();

    assert_eq!(config.registry.len(), 1);
    assert_eq!(config.concurrency, 3);
    assert_eq!(config.per_source_limit, 5);
    assert_eq!(config.excerpt_chars, 300);
    assert_eq!(config.llm.backend, LlmBackend::Extractive);
    assert_eq!(config.mail.recipients, vec!["alice@example.com", "bob@example.com"]);
    assert_eq!(config.mail.from, "news@example.com");
    assert_eq!(config.mail.smtp.username, "digest@example.com");
}

#[test]
fn test_config_rejects_bad_settings() {
    assert!(matches!(
        parse(&["--llm", "extractive", "--concurrency", "0"]),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        parse(&["--llm", "openai", "--openai-api-key", "   "]),
        Err(ConfigError::Missing("OPENAI_API_KEY"))
    ));
    assert!(matches!(
        parse(&["--llm", "extractive", "--feeds", "/nonexistent/feeds.json"]),
        Err(ConfigError::Read { .. })
    ));
}

#[test]
fn test_api_key_is_not_printed() {
    let config = parse(&["--llm", "openai", "--openai-api-key", "sk-very-secret"]).unwrap();
    let printed = format!("{:?}", config);
    assert!(!printed.contains("sk-very-secret"));
    assert!(!printed.contains("app-password"));
}
