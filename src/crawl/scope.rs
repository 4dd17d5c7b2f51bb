// src/crawl/scope.rs
// =============================================================================
// URL helpers that decide where a link points and whether it is "ours".
//
// - resolve / resolve_link: turn "/docs" found on https://example.com/a/
//   into https://example.com/docs (standard RFC 3986 resolution)
// - domain_of: the host (and port, if it's not the default one) used for
//   the same-domain check
// - canonical: the form a URL takes in the visited set
// - mailto_addresses: pull the email addresses out of a mailto: link
// =============================================================================

use url::{ParseError, Url};

// Resolves a link found on `base` into an absolute URL
//
// Handles everything a browser handles: "/path", "../up", "?query",
// "#fragment", "//other.host/path" and absolute URLs.
pub fn resolve(base: &Url, relative: &str) -> Result<Url, ParseError> {
    base.join(relative)
}

// Like resolve, but always returns something to put in the queue
//
// A link that can't be resolved is kept exactly as written. The fetcher
// will then report it as a malformed URL, which is what the site owner
// needs to hear about.
pub fn resolve_link(base: &Url, raw: &str) -> String {
    match resolve(base, raw) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}

// The serialized form of a parsed URL, used as the visited-set key
//
// "http://host:8080" and "http://host:8080/" are the same page, and only
// the parsed form agrees on that. Strings that don't parse are kept as is.
pub fn canonical(url: &str) -> String {
    Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string())
}

// The authority used for same-domain comparisons
//
// Examples:
//   https://example.com/page        -> "example.com"
//   http://127.0.0.1:8080/          -> "127.0.0.1:8080"
//   https://example.com:443/        -> "example.com"   (default port)
//   mailto:someone@example.com      -> ""              (no host)
pub fn domain_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

// domain_of for strings that may not even be URLs
pub fn domain_of_str(url: &str) -> String {
    Url::parse(url).map(|u| domain_of(&u)).unwrap_or_default()
}

// Returns the addresses of a mailto: link, or None for any other link
//
// "mailto:a@b.com,c@d.com?subject=hi" -> Some(["a@b.com", "c@d.com"])
pub fn mailto_addresses(url: &str) -> Option<Vec<String>> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "mailto" {
        return None;
    }

    let addresses = parsed
        .path()
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    Some(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://example.com/page").unwrap();
        let result = resolve(&base, "/docs").unwrap();
        assert_eq!(result.as_str(), "https://example.com/docs");
    }

    #[test]
    fn test_resolve_rfc3986_forms() {
        let base = Url::parse("http://a/b/c/d;p?q").unwrap();
        let cases = [
            ("g", "http://a/b/c/g"),
            ("./g", "http://a/b/c/g"),
            ("g/", "http://a/b/c/g/"),
            ("/g", "http://a/g"),
            ("//g", "http://g/"),
            ("?y", "http://a/b/c/d;p?y"),
            ("#s", "http://a/b/c/d;p?q#s"),
            ("../g", "http://a/b/g"),
            ("../../../g", "http://a/g"),
            ("", "http://a/b/c/d;p?q"),
        ];

        for (relative, expected) in cases {
            assert_eq!(resolve(&base, relative).unwrap().as_str(), expected, "{}", relative);
        }
    }

    #[test]
    fn test_resolve_absolute_link() {
        let base = Url::parse("https://example.com/page").unwrap();
        assert_eq!(resolve_link(&base, "https://other.com"), "https://other.com/");
    }

    #[test]
    fn test_unresolvable_link_kept_raw() {
        let base = Url::parse("https://example.com/page").unwrap();
        assert_eq!(resolve_link(&base, "http://[broken"), "http://[broken");
    }

    #[test]
    fn test_canonical_matches_resolved_form() {
        let base = Url::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(canonical("http://127.0.0.1:8080"), resolve_link(&base, "/"));
        assert_eq!(canonical("HTTPS://Example.COM"), "https://example.com/");
        assert_eq!(canonical("https://example.com/a?b#c"), "https://example.com/a?b#c");
        assert_eq!(canonical("http://[broken"), "http://[broken");
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of_str("https://example.com"), "example.com");
        assert_eq!(domain_of_str("https://example.com:443/x"), "example.com");
        assert_eq!(domain_of_str("http://127.0.0.1:8080/x"), "127.0.0.1:8080");
        assert_eq!(domain_of_str("mailto:a@b.com"), "");
        assert_eq!(domain_of_str("not a url"), "");
    }

    #[test]
    fn test_absolute_path_keeps_domain() {
        for base in ["https://example.com", "http://127.0.0.1:3000/a/b?c", "https://x.y.z/deep/page.html#f"] {
            let base = Url::parse(base).unwrap();
            let resolved = resolve(&base, "/path").unwrap();
            assert_eq!(domain_of(&resolved), domain_of(&base));
        }
    }

    #[test]
    fn test_mailto_addresses() {
        assert_eq!(mailto_addresses("mailto:a@b.com"), Some(vec!["a@b.com".to_string()]));
        assert_eq!(
            mailto_addresses("mailto:a@b.com,c@d.com?subject=hi"),
            Some(vec!["a@b.com".to_string(), "c@d.com".to_string()])
        );
        assert_eq!(mailto_addresses("https://example.com/mailto:a@b.com"), None);
        assert_eq!(mailto_addresses("not a url"), None);
    }
}
