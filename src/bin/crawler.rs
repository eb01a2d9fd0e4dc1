//! Crawler CLI (§6): dequeues from the frontier, fetches, cleans, and
//! persists pages, emitting doc-ids onto the indexing stream.

use clap::Parser;
use search_enginge::config::{self, Config};
use search_enginge::crawl::CrawlEngine;
use search_enginge::frontier::{Frontier, URL_QUEUE, VISITED_SET};
use search_enginge::stats::Stats;
use search_enginge::store::Store;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(about = "Crawl worker pool")]
struct Args {
    /// Clear url_queue, visited_set, and re-create the unique index on pages.url.
    #[arg(long)]
    reset: bool,

    /// Keep existing frontier state (default).
    #[arg(long)]
    resume: bool,

    /// Number of concurrent crawl workers.
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    config::init_tracing();
    let args = Args::parse();
    let config = Config::from_env()?;

    let store = Store::connect(&config.mongodb_uri).await?;
    let frontier = Frontier::connect(&config.redis_addr).await?;

    if args.reset {
        tracing::info!("--reset: clearing url_queue, visited_set, re-creating unique index on pages.url");
        frontier.reset(URL_QUEUE).await?;
        frontier.reset(VISITED_SET).await?;
        store.reset_pages().await?;

        if let Ok(raw) = std::env::var("SEED_URLS") {
            let seeds: Vec<String> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
            if !seeds.is_empty() {
                let stats = Arc::new(Stats::new());
                let disallowed = disallowed_domains();
                let engine = CrawlEngine::new(frontier.clone(), store.clone(), stats, &config, disallowed);
                engine.seed(&seeds).await?;
                tracing::info!(count = seeds.len(), "seeded url_queue from SEED_URLS");
            }
        }
    } else {
        store.ensure_unique_index().await?;
    }

    let stats = Arc::new(Stats::new());
    let disallowed = disallowed_domains();
    let engine = CrawlEngine::new(frontier.clone(), store.clone(), stats.clone(), &config, disallowed);

    let cancel = CancellationToken::new();
    let writer = tokio::spawn(stats.clone().run_writer(store.clone(), cancel.clone()));
    let sampler = tokio::spawn(stats.clone().run_queue_sampler(store.clone(), frontier.clone(), cancel.clone()));
    let workers = tokio::spawn(engine.run_workers(args.workers, cancel.clone()));

    config::wait_for_shutdown_signal().await;
    cancel.cancel();

    let _ = tokio::join!(writer, sampler, workers);
    tracing::info!("crawler stopped cleanly");
    Ok(())
}

/// No disallowed-domain list is configured out of the box; operators set
/// `DISALLOWED_DOMAINS` (comma-separated hosts) to populate it.
fn disallowed_domains() -> HashSet<String> {
    std::env::var("DISALLOWED_DOMAINS")
        .ok()
        .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}
