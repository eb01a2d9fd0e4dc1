//! URL canonicalization (§3, §4.A).

use url::Url;

/// Canonicalizes a URL: lowercases scheme and host, sets path to "/" when
/// host is present and path is empty, strips query and fragment.
///
/// Idempotent: `normalize_url(normalize_url(u)?) == normalize_url(u)?`.
pub fn normalize_url(raw: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(raw)?;

    let scheme = url.scheme().to_lowercase();
    url.set_scheme(&scheme).ok();

    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();
        url.set_host(Some(&host))?;
    }

    url.set_fragment(None);
    url.set_query(None);

    if url.host().is_some() && url.path().is_empty() {
        url.set_path("/");
    }

    Ok(url.to_string())
}

/// Resolves `href` against `base` and canonicalizes the result. Returns
/// `None` for unparseable or non-http(s) links.
pub fn resolve_and_normalize(base: &Url, href: &str) -> Option<String> {
    let joined = base.join(href).ok()?;
    if joined.scheme() != "http" && joined.scheme() != "https" {
        return None;
    }
    normalize_url(joined.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let once = normalize_url("HTTPS://Example.COM/Path?q=1#frag").unwrap();
        let twice = normalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn lowercases_scheme_and_host() {
        let out = normalize_url("HTTP://EXAMPLE.COM/foo").unwrap();
        assert_eq!(out, "http://example.com/foo");
    }

    #[test]
    fn empty_path_becomes_slash() {
        let out = normalize_url("https://example.com").unwrap();
        assert_eq!(out, "https://example.com/");
    }

    #[test]
    fn strips_query_and_fragment() {
        let out = normalize_url("https://example.com/a?b=c#d").unwrap();
        assert_eq!(out, "https://example.com/a");
    }

    #[test]
    fn equal_canonical_forms_compare_equal() {
        let a = normalize_url("https://Example.com/x?y=1").unwrap();
        let b = normalize_url("HTTPS://example.COM/x#z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unparseable_is_err() {
        assert!(normalize_url("not a url").is_err());
    }
}
