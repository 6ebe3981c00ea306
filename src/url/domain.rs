use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the host of a link target
///
/// The target is parsed as an absolute URL and its host is lowercased. The
/// port is not part of the result. Relative references, script snippets and
/// anything else without a host yield `None`.
///
/// # Examples
///
/// ```
/// use linkscout::url::extract_host;
///
/// assert_eq!(extract_host("https://Docs.Example.com:8443/a"), Some("docs.example.com".to_string()));
/// assert_eq!(extract_host("/relative/path"), None);
/// ```
pub fn extract_host(target: &str) -> Option<String> {
    Url::parse(target)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_lowercase()))
}

/// Extracts the base host of a crawl from its start URL
///
/// Unlike [`extract_host`], failures are reported: a crawl cannot start
/// without knowing which site it is mapping.
pub fn base_host(start_url: &str) -> UrlResult<String> {
    let url = Url::parse(start_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS start URLs are supported, got: {}",
            url.scheme()
        )));
    }

    url.host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)
}
