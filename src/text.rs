//! HTML cleaning, tokenization, and snippet word-splitting (§4.A).

use crate::stopwords::is_stopword;
use scraper::{Html, Node};
use std::collections::HashMap;

const REMOVE_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "nav", "footer", "header", "form", "link",
];

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "section", "article", "main", "aside", "h1", "h2", "h3", "h4", "h5", "h6", "ul",
    "ol", "li", "table", "tr", "td", "th", "thead", "tbody", "blockquote", "figure", "figcaption",
    "dl", "dt", "dd", "fieldset", "address",
];

/// Cleans an HTML document down to its visible text, per §4.A.
pub fn clean_html(raw_html: &str) -> String {
    let document = Html::parse_document(raw_html);
    let mut out = String::new();
    visit(document.tree.root(), &mut out);
    collapse_whitespace(&out)
}

fn visit(node: ego_tree::NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Element(el) => {
            let tag = el.name();
            if REMOVE_TAGS.contains(&tag) {
                return;
            }
            if tag == "pre" {
                for descendant in node.descendants() {
                    if let Node::Text(text) = descendant.value() {
                        out.push_str(&text.text);
                    }
                }
                out.push(' ');
                return;
            }
            for child in node.children() {
                visit(child, out);
            }
            if BLOCK_TAGS.contains(&tag) || tag == "br" || tag == "hr" {
                out.push(' ');
            }
        }
        Node::Text(text) => out.push_str(&text.text),
        _ => {
            for child in node.children() {
                visit(child, out);
            }
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Splits on non-letter/non-digit boundaries, lowercased, dropping empty
/// tokens. Used both by `tokenize_text` and `split_words`.
pub fn split_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tokenizes `text` into a term → positions map. Position counts every
/// non-empty token (including stop-words); a term's returned positions are
/// only its non-stop-word occurrences, and stop-words never appear as keys.
pub fn tokenize_text(text: &str) -> HashMap<String, Vec<usize>> {
    let mut out: HashMap<String, Vec<usize>> = HashMap::new();
    for (pos, token) in split_words(text).into_iter().enumerate() {
        if is_stopword(&token) {
            continue;
        }
        out.entry(token).or_default().push(pos);
    }
    out
}

/// Tokenizes a query string, dropping stop-words — unless doing so would
/// leave nothing, in which case the raw (un-filtered) tokens are returned
/// so a stop-word-only query still yields terms.
pub fn tokenize_query(q: &str) -> Vec<String> {
    let raw = split_words(q);
    let filtered: Vec<String> = raw.iter().filter(|t| !is_stopword(t)).cloned().collect();
    if filtered.is_empty() {
        raw
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_removed_tags() {
        let html = "<html><body><script>evil()</script><p>Hello world</p></body></html>";
        let text = clean_html(html);
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn block_elements_get_a_separating_space() {
        let html = "<div>foo</div><div>bar</div>";
        let text = clean_html(html);
        assert_eq!(text, "foo bar");
    }

    #[test]
    fn pre_preserves_literal_text() {
        let html = "<pre>line1\nline2</pre><p>after</p>";
        let text = clean_html(html);
        assert!(text.starts_with("line1\nline2"));
        assert!(text.ends_with("after"));
    }

    #[test]
    fn tokenize_positions_skip_stopwords_but_advance() {
        // "the" is a stop-word at position 0; "cat" should be at position 1.
        let terms = tokenize_text("the cat sat");
        assert!(!terms.contains_key("the"));
        assert_eq!(terms.get("cat").unwrap(), &vec![1]);
        assert_eq!(terms.get("sat").unwrap(), &vec![2]);
    }

    #[test]
    fn query_tokenize_falls_back_on_stopword_only_query() {
        let terms = tokenize_query("the");
        assert_eq!(terms, vec!["the".to_string()]);
    }

    #[test]
    fn query_tokenize_drops_stopwords_when_content_remains() {
        let terms = tokenize_query("the quick fox");
        assert_eq!(terms, vec!["quick".to_string(), "fox".to_string()]);
    }

    #[test]
    fn split_words_lowercases_and_filters_empty() {
        let words = split_words("Hello, World!!");
        assert_eq!(words, vec!["hello".to_string(), "world".to_string()]);
    }
}
