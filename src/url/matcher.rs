/// Checks if a host belongs to the crawled site
///
/// A host belongs to the site when it is the base host itself or any
/// subdomain of it:
/// - `example.com` is within `example.com`
/// - `docs.example.com` and `api.v2.example.com` are within `example.com`
/// - `example.com.evil.com` and `myexample.com` are not
///
/// Both arguments are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use linkscout::url::host_within;
///
/// assert!(host_within("example.com", "example.com"));
/// assert!(host_within("example.com", "docs.example.com"));
/// assert!(!host_within("example.com", "example.com.evil.com"));
/// ```
pub fn host_within(base: &str, candidate: &str) -> bool {
    if base.is_empty() {
        return false;
    }

    candidate == base
        || candidate
            .strip_suffix(base)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
