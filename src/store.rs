//! Document store client (§4.C), backed by MongoDB.
//!
//! Atomic `update`/`update_by_id` with `$set`/`$inc`/`$addToSet`/
//! `$setOnInsert` are the *only* cross-process mutation discipline; no
//! application-level locking of store documents happens anywhere in this
//! crate.

use crate::errors::StoreError;
use crate::models::{CorpusStats, CrawlerStats, Page, PageRankScore, TermEntry, CORPUS_STATS_ID, CRAWLER_STATS_ID};
use bson::oid::ObjectId;
use bson::{doc, Document};
use futures::stream::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::collections::HashMap;

#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database("search_engine");
        Ok(Self { db })
    }

    fn pages(&self) -> Collection<Page> {
        self.db.collection("pages")
    }

    fn inverted_index(&self) -> Collection<TermEntry> {
        self.db.collection("inverted_index")
    }

    fn pagerank(&self) -> Collection<PageRankScore> {
        self.db.collection("pagerank")
    }

    fn inverted_index_raw(&self) -> Collection<Document> {
        self.db.collection("inverted_index")
    }

    fn pages_raw(&self) -> Collection<Document> {
        self.db.collection("pages")
    }

    /// Creates the unique index on `pages.url` — the authoritative
    /// de-dup barrier (§5).
    pub async fn ensure_unique_index(&self) -> Result<(), StoreError> {
        let model = IndexModel::builder()
            .keys(doc! { "url": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.pages().create_index(model).await?;
        Ok(())
    }

    /// `--reset`: re-create the unique index on `pages.url` (a no-op if
    /// already present). Does not touch any Page documents — `pages` also
    /// holds the `crawler_stats` singleton, which only has init/teardown
    /// lifecycle, never a reset-triggered wipe.
    pub async fn reset_pages(&self) -> Result<(), StoreError> {
        self.ensure_unique_index().await
    }

    pub async fn insert_page(&self, page: &Page) -> Result<ObjectId, StoreError> {
        match self.pages().insert_one(page).await {
            Ok(result) => Ok(result
                .inserted_id
                .as_object_id()
                .expect("mongodb always assigns an ObjectId _id")),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate { collection: "pages".to_string() }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_page_by_id(&self, id: ObjectId) -> Result<Option<Page>, StoreError> {
        Ok(self.pages().find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_pages_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Page>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.pages().find(doc! { "_id": { "$in": ids } }).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Streams every page in the collection. Used by PageRank (§4.G) and
    /// the recovery tool (§6).
    pub async fn all_pages(&self) -> Result<Vec<Page>, StoreError> {
        let cursor = self.pages().find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    /// All page `_id`s, via a projection cursor rather than full documents.
    pub async fn all_page_ids(&self) -> Result<Vec<ObjectId>, StoreError> {
        let mut cursor = self
            .pages_raw()
            .find(doc! {})
            .projection(doc! { "_id": 1 })
            .await?;
        let mut ids = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            if let Ok(id) = doc.get_object_id("_id") {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Upserts a posting into a term's entry: `$addToSet` on `postings`,
    /// `$setOnInsert` for a freshly created entry (§4.F). Returns whether
    /// mongo reports the set actually changed (the call site decides what,
    /// if anything, to do with that — see DESIGN.md's DF decision).
    pub async fn upsert_posting(&self, term: &str, posting: &crate::models::Posting) -> Result<bool, StoreError> {
        let posting_bson = bson::to_bson(posting)?;
        let result = self
            .inverted_index_raw()
            .update_one(
                doc! { "term": term },
                doc! {
                    "$addToSet": { "postings": posting_bson },
                    "$setOnInsert": { "term": term, "df": 0i64 },
                },
            )
            .upsert(true)
            .await?;
        Ok(result.modified_count > 0 || result.upserted_id.is_some())
    }

    pub async fn get_term_entries(&self, terms: &[String]) -> Result<Vec<TermEntry>, StoreError> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.inverted_index().find(doc! { "term": { "$in": terms } }).await?;
        Ok(cursor.try_collect().await?)
    }

    /// All doc_ids referenced anywhere in the inverted index — the
    /// "covered set" the recovery tool (§6) diffs against `all_page_ids`.
    pub async fn all_indexed_doc_ids(&self) -> Result<std::collections::HashSet<ObjectId>, StoreError> {
        let mut cursor = self
            .inverted_index_raw()
            .find(doc! {})
            .projection(doc! { "postings.doc_id": 1 })
            .await?;
        let mut ids = std::collections::HashSet::new();
        while let Some(doc) = cursor.try_next().await? {
            if let Ok(postings) = doc.get_array("postings") {
                for p in postings {
                    if let Some(sub) = p.as_document() {
                        if let Ok(id) = sub.get_object_id("doc_id") {
                            ids.insert(id);
                        }
                    }
                }
            }
        }
        Ok(ids)
    }

    pub async fn increment_corpus_total_pages(&self) -> Result<(), StoreError> {
        self.inverted_index_raw()
            .update_one(
                doc! { "_id": CORPUS_STATS_ID },
                doc! { "$inc": { "total_pages": 1i64 } },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn get_corpus_stats(&self) -> Result<CorpusStats, StoreError> {
        Ok(self
            .inverted_index()
            .find_one(doc! { "_id": CORPUS_STATS_ID })
            .await?
            .unwrap_or_else(CorpusStats::new))
    }

    pub async fn upsert_pagerank_score(&self, url: &str, score: f64) -> Result<(), StoreError> {
        self.pagerank()
            .update_one(doc! { "url": url }, doc! { "$set": { "url": url, "score": score } })
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn get_pagerank_scores(&self, urls: &[String]) -> Result<HashMap<String, f64>, StoreError> {
        if urls.is_empty() {
            return Ok(HashMap::new());
        }
        let cursor = self.pagerank().find(doc! { "url": { "$in": urls } }).await?;
        let scores: Vec<PageRankScore> = cursor.try_collect().await?;
        Ok(scores.into_iter().map(|s| (s.url, s.score)).collect())
    }

    pub async fn get_crawler_stats(&self) -> Result<CrawlerStats, StoreError> {
        Ok(self
            .pages_typed::<CrawlerStats>()
            .find_one(doc! { "_id": CRAWLER_STATS_ID })
            .await?
            .unwrap_or_else(CrawlerStats::new))
    }

    fn pages_typed<T>(&self) -> Collection<T> {
        self.db.collection("pages")
    }

    /// Upserts the `crawler_stats` document with arbitrary `$set`/`$inc`/
    /// `$push` fields — used by the stats aggregator's periodic writer
    /// (§4.D). `push` appends to the sample-history arrays
    /// (`pages_crawled_samples`, `queue_size_samples`) rather than
    /// overwriting them.
    pub async fn upsert_crawler_stats(&self, set: Document, inc: Document, push: Document) -> Result<(), StoreError> {
        let mut update = Document::new();
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if !inc.is_empty() {
            update.insert("$inc", inc);
        }
        if !push.is_empty() {
            update.insert("$push", push);
        }
        self.pages_raw()
            .update_one(doc! { "_id": CRAWLER_STATS_ID }, update)
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn increment_number_of_searches(&self) -> Result<(), StoreError> {
        self.pages_raw()
            .update_one(
                doc! { "_id": CRAWLER_STATS_ID },
                doc! { "$inc": { "number_of_searches": 1i64 } },
            )
            .upsert(true)
            .await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::ErrorKind;
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) if we.code == 11000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_detection_ignores_other_write_errors() {
        // This is a compile-time/shape check; full behavior needs a live
        // mongod and is covered by the crate's integration notes in
        // DESIGN.md rather than a unit test.
        let _ = is_duplicate_key;
    }
}
