//! Crawl workers (§4.E): dequeue → fetch → clean → dedupe → persist →
//! emit doc-id.

pub mod fetch;

use crate::config::{Config, DEQUEUE_TIMEOUT_SECS, LANG_SAMPLE_LEN, MIN_CONTENT_LEN};
use crate::errors::StoreError;
use crate::frontier::{Frontier, INDEXER_GROUP, PAGES_TO_INDEX, URL_QUEUE, VISITED_SET};
use crate::models::Page;
use crate::retry::retry_default;
use crate::stats::Stats;
use crate::store::Store;
use fetch::Fetcher;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct CrawlEngine {
    frontier: Frontier,
    store: Store,
    stats: Arc<Stats>,
    fetcher: Fetcher,
    disallowed_domains: HashSet<String>,
    per_domain_delay_ms: u64,
    per_domain_jitter_ms: u64,
    host_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CrawlEngine {
    pub fn new(frontier: Frontier, store: Store, stats: Arc<Stats>, config: &Config, disallowed_domains: HashSet<String>) -> Arc<Self> {
        Arc::new(Self {
            frontier,
            store,
            stats,
            fetcher: Fetcher::new(),
            disallowed_domains,
            per_domain_delay_ms: config.per_domain_delay_ms,
            per_domain_jitter_ms: config.per_domain_jitter_ms,
            host_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Enqueues the given seed URLs, canonicalizing each first.
    pub async fn seed(&self, urls: &[String]) -> Result<(), crate::errors::FrontierError> {
        for url in urls {
            let canonical = crate::urlnorm::normalize_url(url).unwrap_or_else(|_| url.clone());
            self.frontier.enqueue(URL_QUEUE, &canonical).await?;
        }
        Ok(())
    }

    pub async fn run_workers(self: Arc<Self>, worker_count: usize, cancel: CancellationToken) {
        // pages_to_index is written to by crawl workers, not read — but
        // ensuring the group here means `--reset` crawlers still leave a
        // consumable stream for the indexer.
        if let Err(e) = self.frontier.stream_ensure_group(PAGES_TO_INDEX, INDEXER_GROUP).await {
            warn!(error = %e, "failed to ensure indexer consumer group");
        }

        let mut handles = Vec::new();
        for id in 0..worker_count {
            let engine = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move { engine.worker_loop(id, cancel).await }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn worker_loop(&self, id: usize, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let popped = tokio::select! {
                _ = cancel.cancelled() => break,
                popped = self.frontier.dequeue_blocking(URL_QUEUE, Duration::from_secs(DEQUEUE_TIMEOUT_SECS)) => popped,
            };
            match popped {
                Ok(Some(url)) => self.process_url(id, url).await,
                Ok(None) => continue, // dequeue timeout — loop
                Err(e) => {
                    warn!(worker = id, error = %e, "frontier dequeue failed");
                    continue;
                }
            }
        }
        debug!(worker = id, "crawl worker stopped");
    }

    async fn process_url(&self, worker: usize, url: String) {
        match self.frontier.set_contains(VISITED_SET, &url).await {
            Ok(true) => {
                self.stats.incr_duplicates_avoided();
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(worker, error = %e, "visited-set check failed");
                return;
            }
        }

        if self.is_disallowed(&url) {
            return;
        }

        // Step 3/4: fetch and parse; on any error the URL is simply
        // dropped (not marked visited), allowing a future retry path.
        let fetched = match self.fetch_respecting_domain(&url).await {
            Ok(f) => f,
            Err(e) => {
                debug!(worker, url, error = %e, "fetch failed, dropping");
                return;
            }
        };

        let canonical_url = match crate::urlnorm::normalize_url(&fetched.url) {
            Ok(u) => u,
            Err(_) => {
                self.stats.incr_pages_skipped_err();
                return;
            }
        };

        if fetched.body_text.chars().count() < MIN_CONTENT_LEN {
            return; // too short — not an error, just not worth indexing
        }

        let lang_sample: String = fetched.body_text.chars().take(LANG_SAMPLE_LEN).collect();
        if !is_english(&lang_sample) {
            self.stats.incr_pages_skipped_lang();
            return;
        }

        let content = truncate_chars(&fetched.body_text, crate::config::CONTENT_CAP);

        let mut outlinks = Vec::with_capacity(fetched.links.len());
        for link in &fetched.links {
            let Ok(canon) = crate::urlnorm::normalize_url(link) else { continue };
            outlinks.push(canon.clone());
            match self.frontier.set_contains(VISITED_SET, &canon).await {
                Ok(true) => self.stats.incr_duplicates_avoided(),
                Ok(false) => {
                    let frontier = &self.frontier;
                    let canon = canon.clone();
                    if let Err(e) = retry_default(
                        || {
                            let canon = canon.clone();
                            async move { frontier.enqueue(URL_QUEUE, &canon).await }
                        },
                        "enqueue-outlink",
                    )
                    .await
                    {
                        warn!(worker, url = canon, error = %e, "failed to enqueue outlink after retries");
                    }
                }
                Err(e) => warn!(worker, error = %e, "visited-set check failed for outlink"),
            }
        }

        let page = Page {
            id: None,
            url: canonical_url.clone(),
            title: fetched.title.unwrap_or_default(),
            content,
            outlinks,
            time_crawled: chrono::Utc::now(),
        };

        let doc_id = match self.store.insert_page(&page).await {
            Ok(id) => id,
            Err(StoreError::Duplicate { .. }) => {
                self.stats.incr_duplicates_avoided();
                return;
            }
            Err(e) => {
                warn!(worker, url = canonical_url, error = %e, "page insert failed");
                self.stats.incr_pages_skipped_err();
                return;
            }
        };

        let id_hex = doc_id.to_hex();
        let frontier = &self.frontier;
        let push_result = retry_default(
            || {
                let id_hex = id_hex.clone();
                async move { frontier.stream_push(PAGES_TO_INDEX, &[("id", id_hex.as_str())]).await }
            },
            "stream-push",
        )
        .await;

        // Only a successful insert *and* push counts as a crawled page
        // (§4.E step 11) — a push failure leaves the URL off visited_set
        // so recover_unindexed's doc_id diff, not a revisit, reconciles it.
        if let Err(e) = push_result {
            warn!(worker, doc_id = id_hex, error = %e, "failed to push doc_id to indexing stream after retries, not marking visited");
            self.stats.incr_pages_skipped_err();
            return;
        }

        if let Err(e) = self.frontier.set_add(VISITED_SET, &canonical_url).await {
            warn!(worker, url = canonical_url, error = %e, "failed to mark url visited");
        }
        self.stats.incr_pages_crawled();
        info!(worker, url = canonical_url, doc_id = id_hex, "crawled page");
    }

    fn is_disallowed(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else { return true };
        match parsed.host_str() {
            Some(host) => self.disallowed_domains.contains(host),
            None => true,
        }
    }

    /// Fetches `url`, holding a per-host lock so fetches against the same
    /// domain never run concurrently, then sleeps a delay+jitter window
    /// before releasing the lock (§4.E step 3, §5 back-pressure).
    async fn fetch_respecting_domain(&self, url: &str) -> Result<fetch::FetchedPage, crate::errors::FetchError> {
        let host = url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default();
        let lock = self.host_lock(&host);
        let _guard = lock.lock().await;

        let result = self.fetcher.fetch(url).await;

        let jitter = if self.per_domain_jitter_ms > 0 {
            rand::rng().random_range(0..=self.per_domain_jitter_ms)
        } else {
            0
        };
        tokio::time::sleep(Duration::from_millis(self.per_domain_delay_ms + jitter)).await;

        result
    }

    fn host_lock(&self, host: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.host_locks.lock().unwrap();
        locks.entry(host.to_string()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }
}

fn is_english(sample: &str) -> bool {
    whatlang::detect(sample).map(|info| info.lang() == whatlang::Lang::Eng).unwrap_or(false)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_char_count_not_byte_count() {
        let s = "é".repeat(5); // 2 bytes each, 1 char each
        let truncated = truncate_chars(&s, 3);
        assert_eq!(truncated.chars().count(), 3);
    }

    #[test]
    fn truncate_is_noop_under_cap() {
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
