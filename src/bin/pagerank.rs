//! PageRank CLI (§6): one-shot batch recompute of per-URL authority
//! scores from the currently stored link graph.

use search_enginge::config::{self, Config};
use search_enginge::pagerank;
use search_enginge::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    config::init_tracing();
    let config = Config::from_env()?;

    let store = Store::connect(&config.mongodb_uri).await?;
    let scored = pagerank::run(&store).await?;
    tracing::info!(scored, "pagerank run complete");
    Ok(())
}
