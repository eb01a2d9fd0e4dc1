//! Environment-variable configuration, read once at process startup.

use crate::errors::ConfigError;

/// Scoring / crawl constants from the design's §9 "Scoring weights".
pub const ALPHA: f64 = 0.2;
pub const DAMPING: f64 = 0.85;
pub const PAGERANK_ITERATIONS: usize = 20;
pub const CONTENT_CAP: usize = 100_000;
pub const LANG_SAMPLE_LEN: usize = 100;
pub const MIN_CONTENT_LEN: usize = 100;
pub const SNIPPET_WINDOW: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

pub const DEQUEUE_TIMEOUT_SECS: u64 = 5;
pub const STATS_FLUSH_INTERVAL_SECS: u64 = 60;
pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 500;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongodb_uri: String,
    pub redis_addr: String,
    pub crawl_workers: usize,
    pub index_workers: usize,
    pub per_domain_delay_ms: u64,
    pub per_domain_jitter_ms: u64,
    pub http_bind: String,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from the environment. `MONGODB_URI` is fatal if
    /// absent; `REDIS_ADDR` falls back to the local default (§6 Open
    /// Question, decided in DESIGN.md).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mongodb_uri = std::env::var("MONGODB_URI")
            .map_err(|_| ConfigError::MissingEnv("MONGODB_URI"))?;
        let redis_addr =
            std::env::var("REDIS_ADDR").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        Ok(Self {
            mongodb_uri,
            redis_addr,
            crawl_workers: env_usize("CRAWL_WORKERS", 4)?,
            index_workers: env_usize("INDEX_WORKERS", 8)?,
            per_domain_delay_ms: env_u64("PER_DOMAIN_DELAY_MS", 1_000)?,
            per_domain_jitter_ms: env_u64("PER_DOMAIN_JITTER_MS", 250)?,
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}

fn env_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue { name, value: v }),
    }
}

fn env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue { name, value: v }),
    }
}

/// Sets up a `tracing` subscriber from `RUST_LOG` (defaulting to `info`).
/// Every binary calls this first, before touching the store or frontier.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves once SIGINT or (on unix) SIGTERM arrives. Every long-running
/// binary races this against its worker loops via `CancellationToken`.
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received sigterm, shutting down"),
    }
}
