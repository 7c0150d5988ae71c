//! Resource URL resolution against the application root.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a resource identity to an absolute URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`./`, `./index.html`, `/x`) against `base`
/// 3. Require http or https
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(base: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> url::Url {
        url::Url::parse("https://app.test/pwa/").unwrap()
    }

    #[test]
    fn test_resolve_dot_slash_is_root() {
        let url = resolve(&root(), "./").unwrap();
        assert_eq!(url.as_str(), "https://app.test/pwa/");
    }

    #[test]
    fn test_resolve_relative_file() {
        let url = resolve(&root(), "./index.html").unwrap();
        assert_eq!(url.as_str(), "https://app.test/pwa/index.html");
    }

    #[test]
    fn test_resolve_absolute_path() {
        let url = resolve(&root(), "/manifest.json").unwrap();
        assert_eq!(url.as_str(), "https://app.test/manifest.json");
    }

    #[test]
    fn test_resolve_absolute_url_untouched() {
        let url = resolve(&root(), "https://unpkg.com/dexie/dist/dexie.js").unwrap();
        assert_eq!(url.as_str(), "https://unpkg.com/dexie/dist/dexie.js");
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve(&root(), "https://CDN.Example.COM/lib.js").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_resolve_remove_fragment_keep_query() {
        let url = resolve(&root(), "./page?a=1&b=2#section").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve(&root(), "  ./index.html  ").unwrap();
        assert_eq!(url.as_str(), "https://app.test/pwa/index.html");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve(&root(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&root(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&root(), "   "), Err(UrlError::Empty)));
    }
}
