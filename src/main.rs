//! Afisha bot entrypoint: one pipeline run per invocation.
//!
//! Gathers fragments from the configured sites and channels, extracts
//! normalized events, publishes them, and persists the dedup snapshot.
//! Designed to run from cron; all state lives in the snapshot file.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use afisha_bot::fetch::{Fetcher, HttpFetcher};
use afisha_bot::ingest::config::load_sources_default;
use afisha_bot::ingest::providers::channel::ChannelSource;
use afisha_bot::ingest::providers::site::SiteSource;
use afisha_bot::ingest::run_once;
use afisha_bot::ingest::types::FragmentSource;
use afisha_bot::notify::telegram::TelegramPublisher;
use afisha_bot::notify::{DryRunPublisher, Publisher};
use afisha_bot::refine::build_refiner_from_env;
use afisha_bot::{DedupStore, Vocab};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("afisha_bot=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn snapshot_path() -> PathBuf {
    std::env::var("AFISHA_POSTED_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("posted.json"))
}

fn build_publisher() -> Box<dyn Publisher> {
    match (
        std::env::var("TELEGRAM_BOT_TOKEN"),
        std::env::var("TELEGRAM_CHAT_ID"),
    ) {
        (Ok(token), Ok(chat_id)) if !token.trim().is_empty() && !chat_id.trim().is_empty() => {
            Box::new(TelegramPublisher::new(token, chat_id))
        }
        _ => {
            warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, running in dry-run mode");
            Box::new(DryRunPublisher)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_sources_default()?;
    if cfg.is_empty() {
        warn!("no sources configured, nothing to do");
        return Ok(());
    }

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new());
    let mut sources: Vec<Arc<dyn FragmentSource>> = Vec::new();
    for s in &cfg.sites {
        sources.push(Arc::new(SiteSource::new(&s.name, &s.url, Arc::clone(&fetcher))));
    }
    for c in &cfg.channels {
        sources.push(Arc::new(ChannelSource::new(&c.name, &c.url, Arc::clone(&fetcher))));
    }
    info!(sites = cfg.sites.len(), channels = cfg.channels.len(), "sources configured");

    let vocab = Vocab::builtin();
    let mut store = DedupStore::load(snapshot_path());
    let publisher = build_publisher();
    let refiner = build_refiner_from_env();
    let today = chrono::Local::now().date_naive();

    let report = run_once(
        &sources,
        vocab,
        today,
        &mut store,
        publisher.as_ref(),
        &refiner,
    )
    .await;

    if let Err(e) = store.flush() {
        error!(error = %e, "final dedup snapshot flush failed");
    }

    info!(
        fragments = report.fragments,
        published = report.published,
        publish_errors = report.publish_errors,
        source_errors = report.source_errors,
        "run complete"
    );
    Ok(())
}
