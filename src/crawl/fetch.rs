//! Fetching and parsing a single page — the "external fetcher" of §1/§6,
//! implemented here with `reqwest` + `scraper`.

use crate::errors::FetchError;
use crate::text::clean_html;
use crate::urlnorm::resolve_and_normalize;
use scraper::{Html, Selector};
use url::Url;

pub struct FetchedPage {
    /// The final URL after redirects.
    pub url: String,
    pub title: Option<String>,
    pub body_text: String,
    /// Canonicalized, deduplication-agnostic outlinks (canonicalization
    /// happens again at the caller per §4.E step 8; this pass just
    /// resolves relative hrefs to absolute URLs).
    pub links: Vec<String>,
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("search_enginge-crawler/0.1 (+https://example.invalid/bot)")
            .build()
            .expect("reqwest client config is valid");
        Self { client }
    }

    pub async fn fetch(&self, url_str: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url_str)
            .send()
            .await
            .map_err(|source| FetchError::Http { url: url_str.to_string(), source })?;

        if !response.status().is_success() {
            return Err(FetchError::Status { url: url_str.to_string(), status: response.status().as_u16() });
        }

        let final_url = response.url().clone();
        let body_html = response
            .text()
            .await
            .map_err(|source| FetchError::Http { url: url_str.to_string(), source })?;

        let document = Html::parse_document(&body_html);
        let title = extract_title(&document);
        let links = extract_links(&document, &final_url);
        let body_text = clean_html(&body_html);

        Ok(FetchedPage { url: final_url.to_string(), title, body_text, links })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else { return Vec::new() };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_and_normalize(base, href))
        .collect()
}
