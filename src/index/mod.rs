//! Index workers (§4.F): consume the `pages_to_index` stream, tokenize,
//! and merge postings into the inverted index.

use crate::frontier::{Frontier, StreamMessage, INDEXER_GROUP, PAGES_TO_INDEX};
use crate::models::{Page, Posting};
use crate::store::Store;
use crate::text::tokenize_text;
use bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const BATCH_SIZE: usize = 10;
const BLOCK: Duration = Duration::from_secs(5);

pub struct IndexEngine {
    frontier: Frontier,
    store: Store,
}

impl IndexEngine {
    pub fn new(frontier: Frontier, store: Store) -> Arc<Self> {
        Arc::new(Self { frontier, store })
    }

    pub async fn run_workers(self: Arc<Self>, worker_count: usize, cancel: CancellationToken) {
        if let Err(e) = self.frontier.stream_ensure_group(PAGES_TO_INDEX, INDEXER_GROUP).await {
            warn!(error = %e, "failed to ensure indexer consumer group");
            return;
        }

        let host = hostname::get().map(|h| h.to_string_lossy().to_string()).unwrap_or_else(|_| "indexer".to_string());

        let mut handles = Vec::new();
        for id in 0..worker_count {
            let engine = self.clone();
            let cancel = cancel.clone();
            let consumer = format!("{host}-{id}");
            handles.push(tokio::spawn(async move { engine.worker_loop(consumer, cancel).await }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn worker_loop(&self, consumer: String, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let read = tokio::select! {
                _ = cancel.cancelled() => break,
                read = self.frontier.stream_read(PAGES_TO_INDEX, INDEXER_GROUP, &consumer, BATCH_SIZE, BLOCK) => read,
            };
            match read {
                Ok(messages) if !messages.is_empty() => self.process_batch(&consumer, messages).await,
                Ok(_) => continue, // nothing new after the block window — not an error
                Err(e) => {
                    warn!(consumer, error = %e, "stream read failed");
                    continue;
                }
            }
        }
    }

    async fn process_batch(&self, consumer: &str, messages: Vec<StreamMessage>) {
        let mut doc_ids = Vec::with_capacity(messages.len());

        // Acking is a commitment to process (§4.F) — done before any
        // processing happens, so a crash after this point orphans the
        // batch for the recovery tool rather than re-delivering it.
        for msg in &messages {
            if let Err(e) = self.frontier.stream_ack(PAGES_TO_INDEX, INDEXER_GROUP, &msg.id).await {
                warn!(consumer, msg_id = msg.id, error = %e, "failed to ack stream entry");
            }
            match msg.fields.get("id").and_then(|hex| ObjectId::parse_str(hex).ok()) {
                Some(oid) => doc_ids.push(oid),
                None => warn!(consumer, msg_id = msg.id, "stream entry missing a valid doc id"),
            }
        }

        let pages = match self.fetch_pages_with_retry(&doc_ids).await {
            Ok(pages) => pages,
            Err(e) => {
                error!(consumer, error = %e, batch_size = doc_ids.len(), "batch fetch failed twice, abandoning batch (see recover_unindexed)");
                return;
            }
        };

        let by_id: HashMap<ObjectId, Page> =
            pages.into_iter().filter_map(|p| p.id.map(|id| (id, p))).collect();

        for doc_id in &doc_ids {
            match by_id.get(doc_id) {
                Some(page) => {
                    if let Err(e) = self.index_page(*doc_id, page).await {
                        warn!(consumer, doc_id = %doc_id, error = %e, "failed to index page");
                    }
                }
                None => warn!(consumer, doc_id = %doc_id, "doc_id acked but page missing from store"),
            }
        }
    }

    async fn fetch_pages_with_retry(&self, ids: &[ObjectId]) -> Result<Vec<Page>, crate::errors::StoreError> {
        match self.store.find_pages_by_ids(ids).await {
            Ok(pages) => Ok(pages),
            Err(_first_err) => self.store.find_pages_by_ids(ids).await,
        }
    }

    /// `tf = |positions| / N` where `N` is the number of distinct terms
    /// (§4.F). DF is not incremented here — it's derived at read time from
    /// `postings.len()` (see DESIGN.md's "DF idempotence" decision), which
    /// makes re-delivery of the same doc_id exactly idempotent.
    pub async fn index_page(&self, doc_id: ObjectId, page: &Page) -> Result<(), crate::errors::StoreError> {
        let terms = tokenize_text(&format!("{} {}", page.title, page.content));
        let n = terms.len() as f64;
        if n == 0.0 {
            return Ok(());
        }

        for (term, positions) in &terms {
            let tf = positions.len() as f64 / n;
            let posting = Posting {
                doc_id,
                url: page.url.clone(),
                tf,
                positions: positions.iter().map(|&p| p as u64).collect(),
            };
            self.store.upsert_posting(term, &posting).await?;
        }

        self.store.increment_corpus_total_pages().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tf_denominator_is_distinct_term_count() {
        let terms = tokenize_text("fox fox jumps");
        // distinct terms: "fox" (2 positions), "jumps" (1 position) => N=2
        let n = terms.len() as f64;
        assert_eq!(n, 2.0);
        let fox_tf = terms["fox"].len() as f64 / n;
        assert_eq!(fox_tf, 1.0);
    }
}
