/// Computes the visited-set key for a page or link target
///
/// # Normalization Steps
///
/// 1. Drop the fragment (everything from the first `#`)
/// 2. Drop every trailing slash
///
/// Nothing else is touched: scheme, host case and query string are kept as
/// the browser reported them, so two keys are equal only when the pages are
/// the same address.
///
/// # Examples
///
/// ```
/// use linkscout::url::visit_key;
///
/// assert_eq!(visit_key("https://example.com/about/#team"), "https://example.com/about");
/// assert_eq!(visit_key("https://example.com/"), "https://example.com");
/// ```
pub fn visit_key(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    without_fragment.trim_end_matches('/').to_string()
}
