use anyhow::bail;
use clap::Parser;
use metagame_scraper::browser::ChromeSession;
use metagame_scraper::config::Config;
use metagame_scraper::database::{DryRunSink, SnapshotSink, SnapshotStore};
use metagame_scraper::services::{run_with_retries, RetryOutcome, RetryPolicy, ScrapePipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scrapes the HSReplay meta tables and stores a timestamped snapshot.
#[derive(Parser, Debug)]
#[command(name = "metagame-scraper", version, about)]
struct Cli {
    /// Path to config.toml (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Log the snapshot instead of writing it to the database
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("metagame_scraper=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.headless {
        config.browser.headless = true;
    }
    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("{}", error);
        }
        bail!("invalid configuration ({} problems)", errors.len());
    }

    let session = ChromeSession::launch(&config.browser).await?;
    let policy = RetryPolicy::default();
    tracing::info!("Scraping with up to {} attempts", policy.max_attempts());

    if cli.dry_run {
        run(config, session, DryRunSink, &policy).await;
    } else {
        let store = SnapshotStore::new(config.database.clone());
        run(config, session, store, &policy).await;
    }

    Ok(())
}

async fn run<S: SnapshotSink>(
    config: Config,
    session: ChromeSession,
    sink: S,
    policy: &RetryPolicy,
) {
    let mut pipeline = ScrapePipeline::new(config, session, sink);

    match run_with_retries(policy, &mut pipeline).await {
        RetryOutcome::Succeeded { value, attempts } => {
            tracing::info!("Finished after {} attempt(s): {:?}", attempts, value);
        }
        RetryOutcome::Exhausted { attempts, last_error } => {
            tracing::warn!(
                "No snapshot after {} attempts (last error: {})",
                attempts,
                last_error.as_deref().unwrap_or("none")
            );
        }
    }
}
