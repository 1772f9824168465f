//! fmt-checker entry point.
//!
//! This binary is the composition root for the bot. It parses flags, wires
//! the `tracing` subscriber, resolves the external tool locations once,
//! builds the immutable formatter registry, constructs the Gerrit adapter,
//! and either registers/lists checkers or runs the polling scheduler until
//! the process is terminated.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use checker::{
    CheckerDefinition, FormatterRegistry, PollConfig, PollingScheduler, RepositoryName,
    ToolLocations, DEFAULT_SCHEME,
};
use gerrit::GerritServer;

#[derive(Parser)]
#[command(
    name = "fmt-checker",
    version,
    about = "Formatting checks for Gerrit changes",
    long_about = "Polls a Gerrit server for pending formatting checks, runs \
the language's formatter against each relevant revision, and reports a \
pass/fail/irrelevant verdict back."
)]
struct Options {
    /// URL of the Gerrit server, e.g. http://localhost:8080/
    #[arg(long)]
    gerrit: String,

    /// File holding a "user:secret" basic-auth credential
    #[arg(long)]
    auth_file: Option<PathBuf>,

    /// Register the given languages as checkers on --repo, then exit
    #[arg(long)]
    register: bool,

    /// Like --register, but update existing checkers in place
    #[arg(long)]
    update: bool,

    /// Repository to register checkers for
    #[arg(long)]
    repo: Option<String>,

    /// Languages to register, comma separated (e.g. go,bzl,commitmsg)
    #[arg(long, value_delimiter = ',')]
    language: Vec<String>,

    /// List this scheme's registered checkers, then exit
    #[arg(long)]
    list: bool,

    /// Seconds to sleep after a polling round without progress
    #[arg(long, default_value_t = 10)]
    delay: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let options = Options::parse();

    let base = reqwest::Url::parse(&options.gerrit)
        .with_context(|| format!("invalid --gerrit url {:?}", options.gerrit))?;
    let mut server = GerritServer::new(base);
    if let Some(path) = &options.auth_file {
        let credential = fs::read_to_string(path)
            .with_context(|| format!("reading --auth-file {}", path.display()))?;
        server = server.with_basic_auth(&credential);
    }
    let server = Arc::new(server);

    let tools = ToolLocations::discover();
    let (registry, skipped) = FormatterRegistry::probe(&tools);
    for skip in &skipped {
        warn!(language = %skip.language, reason = %skip.reason, "language disabled");
    }
    info!(languages = ?registry.supported_languages(), "formatters ready");

    if options.list {
        for info in server.list_checkers(DEFAULT_SCHEME).await? {
            println!("{} {} repo={} status={}", info.uuid, info.name, info.repository, info.status);
        }
        return Ok(());
    }

    if options.register || options.update {
        let repo = options
            .repo
            .as_deref()
            .context("--repo is required with --register/--update")?;
        let repository =
            RepositoryName::new(repo).context("--repo must not be empty")?;
        if options.language.is_empty() {
            bail!("--language is required with --register/--update");
        }
        for language in &options.language {
            if registry.resolve(language).is_none() {
                bail!(
                    "language {:?} is not supported; available: {}",
                    language,
                    registry.supported_languages().join(", ")
                );
            }
            let definition = CheckerDefinition::new(
                DEFAULT_SCHEME,
                language,
                repository.clone(),
                registry.query(language),
            );
            let registered = server
                .register_checker(&definition, options.update)
                .await
                .with_context(|| format!("registering {language} checker"))?;
            info!(uuid = %registered.uuid, repo = %registered.repository, "checker registered");
        }
        return Ok(());
    }

    let config = PollConfig {
        scheme: DEFAULT_SCHEME.to_string(),
        delay: Duration::from_secs(options.delay),
    };
    info!(scheme = %config.scheme, delay_secs = options.delay, "polling for pending checks");
    PollingScheduler::new(server, registry, config).run().await;
    Ok(())
}
