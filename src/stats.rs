//! Stats aggregator (§4.D): mutex-protected counters, a periodic writer,
//! and a queue-length sampler, both flushing a final sample on
//! cancellation.

use crate::config::STATS_FLUSH_INTERVAL_SECS;
use crate::frontier::{Frontier, URL_QUEUE};
use crate::store::Store;
use bson::{doc, Document};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Default, Debug, Clone, Copy)]
pub struct StatsCounters {
    pub pages_crawled: u64,
    pub pages_skipped_err: u64,
    pub pages_skipped_lang: u64,
    pub duplicates_avoided: u64,
}

pub struct Stats {
    counters: Mutex<StatsCounters>,
}

impl Stats {
    pub fn new() -> Self {
        Self { counters: Mutex::new(StatsCounters::default()) }
    }

    pub fn incr_pages_crawled(&self) {
        self.counters.lock().unwrap().pages_crawled += 1;
    }

    pub fn incr_pages_skipped_err(&self) {
        self.counters.lock().unwrap().pages_skipped_err += 1;
    }

    pub fn incr_pages_skipped_lang(&self) {
        self.counters.lock().unwrap().pages_skipped_lang += 1;
    }

    pub fn incr_duplicates_avoided(&self) {
        self.counters.lock().unwrap().duplicates_avoided += 1;
    }

    pub fn snapshot(&self) -> StatsCounters {
        *self.counters.lock().unwrap()
    }

    /// Builds the `$set`/`$push` documents for one flush: scalar counters
    /// are set, `pages_crawled_samples` gets one appended sample.
    fn flush_docs(&self) -> (Document, Document) {
        let snap = self.snapshot();
        let set = doc! {
            "pages_skipped_err": snap.pages_skipped_err as i64,
            "pages_skipped_lang": snap.pages_skipped_lang as i64,
            "duplicates_avoided": snap.duplicates_avoided as i64,
        };
        let push = doc! { "pages_crawled_samples": snap.pages_crawled as i64 };
        (set, push)
    }

    async fn flush(&self, store: &Store) {
        let (set, push) = self.flush_docs();
        if let Err(e) =
            crate::retry::retry_default(|| async { store.upsert_crawler_stats(set.clone(), doc! {}, push.clone()).await }, "stats-writer")
                .await
        {
            warn!(error = %e, "failed to flush crawler stats after retries");
        }
    }

    async fn sample_queue(&self, store: &Store, frontier: &Frontier) {
        match frontier.queue_len(URL_QUEUE).await {
            Ok(len) => {
                let push = doc! { "queue_size_samples": len as i64 };
                if let Err(e) = store.upsert_crawler_stats(doc! {}, doc! {}, push).await {
                    warn!(error = %e, "failed to write queue size sample");
                }
            }
            Err(e) => warn!(error = %e, "failed to sample queue length"),
        }
    }

    /// Background task: every `STATS_FLUSH_INTERVAL_SECS`, appends the
    /// current counters onto `crawler_stats`'s sample history, retrying on
    /// transient store errors. Flushes once more on cancellation so the
    /// final interval's counters aren't lost (§9 "Global state": teardown
    /// is a final stats flush, not a silent drop).
    pub async fn run_writer(self: std::sync::Arc<Self>, store: Store, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_secs(STATS_FLUSH_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.flush(&store).await;
                    break;
                }
                _ = interval.tick() => self.flush(&store).await,
            }
        }
    }

    /// Background task: samples `url_queue`'s length on the same cadence,
    /// also flushing a final sample on cancellation.
    pub async fn run_queue_sampler(self: std::sync::Arc<Self>, store: Store, frontier: Frontier, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_secs(STATS_FLUSH_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.sample_queue(&store, &frontier).await;
                    break;
                }
                _ = interval.tick() => self.sample_queue(&store, &frontier).await,
            }
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
