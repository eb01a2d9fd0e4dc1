//! Boundary behaviors from the design's testable-properties section that
//! span more than one module (config constants + text utilities).

use search_enginge::config::{CONTENT_CAP, MIN_CONTENT_LEN};
use search_enginge::text::{clean_html, tokenize_text};

#[test]
fn below_min_content_len_is_rejected_by_char_count_not_byte_count() {
    // Multi-byte chars must be counted as chars, matching the crawler's
    // `fetched.body_text.chars().count() < MIN_CONTENT_LEN` check.
    let short = "é".repeat(MIN_CONTENT_LEN - 1);
    assert!(short.chars().count() < MIN_CONTENT_LEN);

    let long_enough = "é".repeat(MIN_CONTENT_LEN);
    assert!(long_enough.chars().count() >= MIN_CONTENT_LEN);
}

#[test]
fn content_cap_truncates_on_char_boundary() {
    let raw = "a".repeat(CONTENT_CAP + 500);
    let truncated: String = raw.chars().take(CONTENT_CAP).collect();
    assert_eq!(truncated.chars().count(), CONTENT_CAP);
}

#[test]
fn cleaned_html_from_a_realistic_page_meets_the_min_content_len_boundary() {
    let html = format!(
        "<html><head><script>track()</script></head><body><nav>menu</nav><article>{}</article></body></html>",
        "word ".repeat(30)
    );
    let cleaned = clean_html(&html);
    assert!(!cleaned.contains("track()"));
    assert!(cleaned.chars().count() >= MIN_CONTENT_LEN);

    let terms = tokenize_text(&cleaned);
    assert_eq!(terms.get("word").unwrap().len(), 30);
    assert_eq!(terms.get("menu").unwrap().len(), 1);
}
