//! Persistent document shapes (§3, §6 "Persistent layout").

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRAWLER_STATS_ID: &str = "crawler_stats";
pub const CORPUS_STATS_ID: &str = "corpus_stats";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub url: String,
    pub title: String,
    pub content: String,
    pub outlinks: Vec<String>,
    #[serde(rename = "timecrawled")]
    pub time_crawled: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: ObjectId,
    pub url: String,
    pub tf: f64,
    pub positions: Vec<u64>,
}

impl PartialEq for Posting {
    /// `$addToSet` dedupes by full document equality (§4.F); redelivery of
    /// the same doc_id with identical positions/tf must not add a second
    /// entry.
    fn eq(&self, other: &Self) -> bool {
        self.doc_id == other.doc_id && self.tf == other.tf && self.positions == other.positions
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub term: String,
    /// Stored for operator visibility only; never trusted for correctness.
    /// The authoritative value is `TermEntry::df()` — see DESIGN.md's
    /// "DF idempotence" decision.
    #[serde(default)]
    pub df: u64,
    pub postings: Vec<Posting>,
}

impl TermEntry {
    /// The derived, always-correct document frequency (§8 invariant 3).
    pub fn df(&self) -> u64 {
        self.postings.len() as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorpusStats {
    #[serde(rename = "_id")]
    pub id: String,
    pub total_pages: u64,
}

impl CorpusStats {
    pub fn new() -> Self {
        Self { id: CORPUS_STATS_ID.to_string(), total_pages: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrawlerStats {
    #[serde(rename = "_id")]
    pub id: String,
    /// Time series: one sample appended per writer flush, not overwritten
    /// (§4.D).
    #[serde(default)]
    pub pages_crawled_samples: Vec<u64>,
    #[serde(default)]
    pub queue_size_samples: Vec<u64>,
    pub pages_skipped_err: u64,
    pub pages_skipped_lang: u64,
    pub duplicates_avoided: u64,
    pub number_of_searches: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CrawlerStats {
    pub fn new() -> Self {
        Self { id: CRAWLER_STATS_ID.to_string(), ..Default::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRankScore {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub url: String,
    pub score: f64,
}
