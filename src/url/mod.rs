//! URL handling module for LinkScout
//!
//! This module provides visited-key normalization, host extraction, the
//! same-site test, and link classification.

mod domain;
mod matcher;
mod normalize;

use crate::state::LinkKind;

// Re-export main functions
pub use domain::{base_host, extract_host};
pub use matcher::host_within;
pub use normalize::visit_key;

/// Why an element's target was left out of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No href or onclick value, or only whitespace
    Empty,
    /// `javascript:` pseudo-URL
    Script,
    /// `mailto:` URI
    Mail,
    /// `tel:` URI
    Phone,
    /// Inline handler code such as `openMenu(3)`
    FunctionCall,
    /// Anchor into the page being crawled
    Fragment,
}

/// Classification of a raw link target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Not a checkable reference
    Ignored(SkipReason),
    /// A reference that gets a record in the report
    Link(LinkKind),
}

/// Decides whether a target should be skipped before classification
///
/// # Skip Rules
///
/// - empty after trimming
/// - starts with `javascript` (any case)
/// - starts with `mailto:` or `tel:`
/// - contains `(` (inline handler code)
/// - starts with `#`, or, when `current_page` is known, points at the current
///   page with a fragment
///
/// # Arguments
///
/// * `target` - The raw href or onclick value
/// * `current_page` - Visited key of the page the element was found on
pub fn skip_reason(target: &str, current_page: Option<&str>) -> Option<SkipReason> {
    let target = target.trim();
    let lowered = target.to_lowercase();

    if target.is_empty() {
        return Some(SkipReason::Empty);
    }
    if lowered.starts_with("javascript") {
        return Some(SkipReason::Script);
    }
    if lowered.starts_with("mailto:") {
        return Some(SkipReason::Mail);
    }
    if lowered.starts_with("tel:") {
        return Some(SkipReason::Phone);
    }
    if target.contains('(') {
        return Some(SkipReason::FunctionCall);
    }
    if target.starts_with('#') {
        return Some(SkipReason::Fragment);
    }
    if let Some(page) = current_page {
        if target.contains('#') && visit_key(target) == visit_key(page) {
            return Some(SkipReason::Fragment);
        }
    }

    None
}

/// Returns true if the target looks like a PDF document
///
/// This is a case-insensitive substring test for `.pdf` anywhere in the
/// target, so `catalog.pdf.old` counts as well.
pub fn is_pdf(target: &str) -> bool {
    target.to_lowercase().contains(".pdf")
}

/// Returns true if the target's host is the base host or one of its subdomains
///
/// Targets without a parseable host are never same-site.
pub fn is_same_site(target: &str, base_host: &str) -> bool {
    extract_host(target)
        .map(|host| host_within(base_host, &host))
        .unwrap_or(false)
}

/// Determines the kind of a target that passed the skip rules
///
/// PDF detection takes precedence over the domain test, so a PDF on the
/// crawled site is still a `Pdf` link. Malformed targets are `External` and
/// fail their liveness probe.
pub fn link_kind(target: &str, base_host: &str) -> LinkKind {
    if is_pdf(target) {
        LinkKind::Pdf
    } else if is_same_site(target, base_host) {
        LinkKind::Internal
    } else {
        LinkKind::External
    }
}

/// Classifies a raw link target against the crawled site
///
/// # Arguments
///
/// * `target` - The raw href or onclick value
/// * `base_host` - Lowercase host of the crawl's start URL
///
/// # Examples
///
/// ```
/// use linkscout::state::LinkKind;
/// use linkscout::url::{classify, Classification, SkipReason};
///
/// assert_eq!(
///     classify("https://docs.example.com/guide", "example.com"),
///     Classification::Link(LinkKind::Internal)
/// );
/// assert_eq!(
///     classify("mailto:team@example.com", "example.com"),
///     Classification::Ignored(SkipReason::Mail)
/// );
/// ```
pub fn classify(target: &str, base_host: &str) -> Classification {
    match skip_reason(target, None) {
        Some(reason) => Classification::Ignored(reason),
        None => Classification::Link(link_kind(target.trim(), base_host)),
    }
}
