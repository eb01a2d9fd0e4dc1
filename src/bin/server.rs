//! Query-service HTTP binary (§6): serves `/health`, `/metrics`, and
//! `/search` over the document store.

use search_enginge::config::{self, Config};
use search_enginge::http::{self, AppState};
use search_enginge::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    config::init_tracing();
    let config = Config::from_env()?;

    let store = Store::connect(&config.mongodb_uri).await?;
    let router = http::router(AppState { store }, &config.cors_origin);

    let listener = tokio::net::TcpListener::bind(&config.http_bind).await?;
    tracing::info!(bind = %config.http_bind, "query service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(config::wait_for_shutdown_signal())
        .await?;

    tracing::info!("server stopped cleanly");
    Ok(())
}
