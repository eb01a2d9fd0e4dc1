//! Recovery CLI (§6): finds pages with no postings anywhere in the
//! inverted index and re-pushes their doc-ids onto `pages_to_index`.

use search_enginge::config::{self, Config};
use search_enginge::frontier::{Frontier, PAGES_TO_INDEX};
use search_enginge::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    config::init_tracing();
    let config = Config::from_env()?;

    let store = Store::connect(&config.mongodb_uri).await?;
    let frontier = Frontier::connect(&config.redis_addr).await?;

    let all_ids = store.all_page_ids().await?;
    let covered = store.all_indexed_doc_ids().await?;

    let mut recovered = 0usize;
    for id in all_ids {
        if !covered.contains(&id) {
            frontier.stream_push(PAGES_TO_INDEX, &[("id", id.to_hex().as_str())]).await?;
            recovered += 1;
        }
    }

    tracing::info!(recovered, "recovery complete");
    println!("recovered {recovered} unindexed page(s)");
    Ok(())
}
