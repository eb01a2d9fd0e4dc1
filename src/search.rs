//! Ranked retrieval (§4.H): tokenize query → fetch postings → score →
//! paginate → snippet.

use crate::config::{ALPHA, DEFAULT_SEARCH_LIMIT, SNIPPET_WINDOW};
use crate::errors::AppError;
use crate::store::Store;
use crate::text::{split_words, tokenize_query};
use bson::oid::ObjectId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub doc_id: String,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    pub results: Vec<SearchResultItem>,
}

/// Strips control characters and bounds length — the "sanitize" step of
/// §4.H point 2.
fn sanitize_query(q: &str) -> String {
    const MAX_QUERY_LEN: usize = 512;
    q.chars().filter(|c| !c.is_control()).take(MAX_QUERY_LEN).collect()
}

pub async fn search(
    store: &Store,
    raw_query: &str,
    limit: Option<usize>,
    offset: Option<usize>,
) -> Result<SearchResponse, AppError> {
    if raw_query.trim().is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }

    let sanitized = sanitize_query(raw_query);
    let terms = tokenize_query(&sanitized);
    if terms.is_empty() {
        return Err(AppError::BadRequest("query has no searchable terms".to_string()));
    }

    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1);
    let offset = offset.unwrap_or(0);

    let corpus = store.get_corpus_stats().await?;
    let n = corpus.total_pages as f64;

    let entries = store.get_term_entries(&terms).await?;
    let entries: Vec<_> = entries.into_iter().filter(|e| e.df() > 0).collect();

    let mut unique_urls: HashSet<String> = HashSet::new();
    for entry in &entries {
        for posting in &entry.postings {
            unique_urls.insert(posting.url.clone());
        }
    }
    let urls_vec: Vec<String> = unique_urls.into_iter().collect();
    let pagerank = store.get_pagerank_scores(&urls_vec).await?;

    // doc_id -> (url, accumulated score). "Keep ... doc_id from the first
    // seen posting" (§4.H step 7) falls out naturally here: the url is
    // fixed on first insert and never overwritten.
    let mut scored: HashMap<ObjectId, (String, f64)> = HashMap::new();
    for entry in &entries {
        let df = entry.df() as f64;
        let idf = (n / df).ln();
        for posting in &entry.postings {
            let tfidf = posting.tf * idf;
            let pr_score = pagerank.get(&posting.url).copied().unwrap_or(0.0);
            let contribution = ALPHA * tfidf + (1.0 - ALPHA) * pr_score;
            scored.entry(posting.doc_id).or_insert_with(|| (posting.url.clone(), 0.0)).1 += contribution;
        }
    }

    let mut ranked: Vec<(ObjectId, String, f64)> =
        scored.into_iter().map(|(doc_id, (url, score))| (doc_id, url, score)).collect();
    ranked.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

    let total = ranked.len();
    let start = offset.min(total);
    let end = (start + limit).min(total);
    let page = &ranked[start..end];

    let page_doc_ids: Vec<ObjectId> = page.iter().map(|(id, _, _)| *id).collect();
    let pages = store.find_pages_by_ids(&page_doc_ids).await?;
    let pages_by_id: HashMap<ObjectId, crate::models::Page> =
        pages.into_iter().filter_map(|p| p.id.map(|id| (id, p))).collect();

    let results = page
        .iter()
        .map(|(doc_id, url, score)| {
            let page = pages_by_id.get(doc_id);
            let title = page.map(|p| p.title.clone()).unwrap_or_default();
            let snippet = page.map(|p| extract_snippet(&p.content, &terms)).unwrap_or_default();
            SearchResultItem { doc_id: doc_id.to_hex(), title, url: url.clone(), snippet, score: *score }
        })
        .collect();

    if let Err(e) = store.increment_number_of_searches().await {
        warn!(error = %e, "failed to increment number_of_searches (non-fatal)");
    }

    Ok(SearchResponse { query: sanitized, total_results: total, results })
}

/// §4.H "Snippet extraction": window around the first occurrence of the
/// first query term in the page's raw word stream.
fn extract_snippet(content: &str, terms: &[String]) -> String {
    let words = split_words(content);
    let Some(term) = terms.first() else { return String::new() };
    let Some(pos) = words.iter().position(|w| w.eq_ignore_ascii_case(term)) else {
        return String::new();
    };

    let start = pos.saturating_sub(SNIPPET_WINDOW);
    let end = (pos + SNIPPET_WINDOW).min(words.len());

    let mut window: Vec<String> = words[start..end].to_vec();
    if let Some(first_word) = window.first_mut() {
        if let Some(first_char) = first_word.chars().next() {
            let rest = &first_word[first_char.len_utf8()..];
            *first_word = first_char.to_uppercase().collect::<String>() + rest;
        }
    }
    for w in window.iter_mut() {
        if w.eq_ignore_ascii_case(term) {
            *w = format!("**{w}**");
        }
    }

    let mut snippet = window.join(" ");
    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < words.len() {
        snippet = format!("{snippet}...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_empty_when_term_absent() {
        let snippet = extract_snippet("the quick brown fox", &["zebra".to_string()]);
        assert_eq!(snippet, "");
    }

    #[test]
    fn snippet_wraps_term_and_truncates_both_ends() {
        let content = (0..30).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let content = format!("{content} needle {content}");
        let snippet = extract_snippet(&content, &["needle".to_string()]);
        assert!(snippet.contains("**needle**"));
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn snippet_no_leading_ellipsis_and_capitalizes_when_term_near_start() {
        let snippet = extract_snippet("needle in a haystack of words", &["needle".to_string()]);
        assert!(!snippet.starts_with("..."));
        assert!(snippet.starts_with("**Needle**"));
    }
}
