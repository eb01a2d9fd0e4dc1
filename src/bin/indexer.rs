//! Indexer CLI (§6): consumes `pages_to_index`, tokenizes pages, and
//! merges postings into the inverted index.

use clap::Parser;
use search_enginge::config::{self, Config};
use search_enginge::frontier::{Frontier, INDEXER_GROUP, PAGES_TO_INDEX};
use search_enginge::index::IndexEngine;
use search_enginge::store::Store;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(about = "Inverted-index worker pool")]
struct Args {
    /// Number of concurrent index workers.
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Clear the pages_to_index stream before starting.
    #[arg(long)]
    reset: bool,
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
        tracing::info!("--reset: clearing pages_to_index stream");
        frontier.reset(PAGES_TO_INDEX).await?;
    }
    frontier.stream_ensure_group(PAGES_TO_INDEX, INDEXER_GROUP).await?;

    let engine = IndexEngine::new(frontier, store);
    let cancel = CancellationToken::new();
    let workers = tokio::spawn(engine.run_workers(args.workers, cancel.clone()));

    config::wait_for_shutdown_signal().await;
    cancel.cancel();
    let _ = workers.await;

    tracing::info!("indexer stopped cleanly");
    Ok(())
}
