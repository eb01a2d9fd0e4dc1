//! PageRank batch (§4.G): builds the link graph from stored pages and
//! runs the power iteration, writing normalized scores back to the store.

use crate::config::{DAMPING, PAGERANK_ITERATIONS};
use crate::errors::StoreError;
use crate::store::Store;
use std::collections::{HashMap, HashSet};
use tracing::info;

pub type LinkGraph = HashMap<String, HashSet<String>>;

/// Builds the crawled-page vertex set and the link graph in the two
/// passes §4.G describes: outlinks to pages outside `V` are discarded.
pub fn build_graph(pages: &[crate::models::Page]) -> (HashSet<String>, LinkGraph) {
    let vertices: HashSet<String> = pages.iter().map(|p| p.url.clone()).collect();

    let mut graph: LinkGraph = HashMap::new();
    for page in pages {
        let entry = graph.entry(page.url.clone()).or_default();
        for outlink in &page.outlinks {
            if vertices.contains(outlink) {
                entry.insert(outlink.clone());
            }
        }
    }
    (vertices, graph)
}

/// Runs the power-method iteration with two distinct maps per round (old
/// `rank`, fresh `new`) — the §9 "PageRank iteration aliasing" fix,
/// implemented rather than left open. Returns raw (pre-normalization)
/// scores; callers check §8 invariant 6 (`Σ rank ≈ 1.0`) before
/// normalizing.
pub fn iterate(vertices: &HashSet<String>, graph: &LinkGraph) -> HashMap<String, f64> {
    let n = vertices.len();
    if n == 0 {
        return HashMap::new();
    }
    let n_f = n as f64;

    let mut rank: HashMap<String, f64> = vertices.iter().map(|v| (v.clone(), 1.0 / n_f)).collect();

    for _ in 0..PAGERANK_ITERATIONS {
        let mut new_rank: HashMap<String, f64> = vertices.iter().map(|v| (v.clone(), (1.0 - DAMPING) / n_f)).collect();

        for v in vertices {
            let r = rank[v];
            let out = graph.get(v).map(|s| s.len()).unwrap_or(0);
            if out == 0 {
                // Dangling node: redistribute its mass to every vertex.
                let share = DAMPING * r / n_f;
                for target in new_rank.values_mut() {
                    *target += share;
                }
            } else {
                let share = DAMPING * r / out as f64;
                for w in &graph[v] {
                    *new_rank.get_mut(w).expect("w is in vertices by construction") += share;
                }
            }
        }

        rank = new_rank;
    }

    rank
}

/// Min-max normalizes to `[0,1]`; a no-op if all scores are equal.
pub fn normalize(scores: &HashMap<String, f64>) -> HashMap<String, f64> {
    if scores.is_empty() {
        return HashMap::new();
    }
    let min = scores.values().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return scores.clone();
    }
    scores.iter().map(|(k, v)| (k.clone(), (v - min) / (max - min))).collect()
}

pub async fn run(store: &Store) -> Result<usize, StoreError> {
    let pages = store.all_pages().await?;
    let (vertices, graph) = build_graph(&pages);
    info!(vertices = vertices.len(), "pagerank: built link graph");

    let raw = iterate(&vertices, &graph);
    let normalized = normalize(&raw);

    for (url, score) in &normalized {
        store.upsert_pagerank_score(url, *score).await?;
    }

    Ok(normalized.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(edges: &[(&str, &str)]) -> (HashSet<String>, LinkGraph) {
        let mut vertices = HashSet::new();
        let mut graph: LinkGraph = HashMap::new();
        for (from, to) in edges {
            vertices.insert(from.to_string());
            vertices.insert(to.to_string());
            graph.entry(from.to_string()).or_default().insert(to.to_string());
        }
        (vertices, graph)
    }

    #[test]
    fn mutual_links_plus_dangling_node() {
        let (mut vertices, mut graph) = graph_of(&[("A", "B"), ("B", "A")]);
        vertices.insert("C".to_string());
        graph.entry("C".to_string()).or_default(); // dangling

        let raw = iterate(&vertices, &graph);
        let sum: f64 = raw.values().sum();
        assert!((sum - 1.0).abs() < 1e-6, "dangling mass must be preserved, got sum={sum}");

        let normalized = normalize(&raw);
        assert!((normalized["A"] - normalized["B"]).abs() < 1e-9);
        assert!(normalized["A"] > 0.0);
        assert!(normalized["C"] >= 0.0 && normalized["C"] <= 1.0);

        let max = normalized.values().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = normalized.values().cloned().fold(f64::INFINITY, f64::min);
        assert!((max - 1.0).abs() < 1e-9);
        assert!(min.abs() < 1e-9);
    }

    #[test]
    fn empty_graph_yields_empty_scores() {
        let vertices = HashSet::new();
        let graph = LinkGraph::new();
        assert!(iterate(&vertices, &graph).is_empty());
    }

    #[test]
    fn normalize_is_noop_when_all_scores_equal() {
        let mut scores = HashMap::new();
        scores.insert("a".to_string(), 0.5);
        scores.insert("b".to_string(), 0.5);
        let normalized = normalize(&scores);
        assert_eq!(normalized["a"], 0.5);
        assert_eq!(normalized["b"], 0.5);
    }

    #[test]
    fn outlinks_outside_vertex_set_are_discarded() {
        let pages = vec![crate::models::Page {
            id: None,
            url: "https://a.test/".to_string(),
            title: String::new(),
            content: String::new(),
            outlinks: vec!["https://not-crawled.test/".to_string()],
            time_crawled: chrono::Utc::now(),
        }];
        let (vertices, graph) = build_graph(&pages);
        assert_eq!(vertices.len(), 1);
        assert!(graph["https://a.test/"].is_empty());
    }
}
