//! Broken-page heuristic
//!
//! A page that loaded is still judged broken when it looks like an error
//! page: a title mentioning 404, a body saying "page not found", or a body
//! too short to be real content.

use crate::port::{BrowserPort, PortResult};
use crate::state::LinkStatus;

/// Why a page was judged the way it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageVerdict {
    Healthy,
    /// Title contains `404`
    NotFoundTitle,
    /// Body contains `page not found`
    NotFoundBody,
    /// Body has fewer characters than the threshold
    TooShort { chars: usize, min: usize },
    /// Title or body could not be read
    Unreadable(String),
}

impl PageVerdict {
    pub fn status(&self) -> LinkStatus {
        match self {
            Self::Healthy => LinkStatus::Ok,
            _ => LinkStatus::Broken,
        }
    }
}

/// Judges a page from its title and visible body text
///
/// Both checks are case-insensitive. Body length is counted in characters.
///
/// # Examples
///
/// ```
/// use linkscout::crawler::{judge_page, PageVerdict};
///
/// assert_eq!(judge_page("404 - Missing", &"x".repeat(500), 80), PageVerdict::NotFoundTitle);
/// assert_eq!(judge_page("Home", &"x".repeat(500), 80), PageVerdict::Healthy);
/// ```
pub fn judge_page(title: &str, body: &str, min_body_chars: usize) -> PageVerdict {
    if title.to_lowercase().contains("404") {
        return PageVerdict::NotFoundTitle;
    }

    let body = body.to_lowercase();
    if body.contains("page not found") {
        return PageVerdict::NotFoundBody;
    }

    let chars = body.chars().count();
    if chars < min_body_chars {
        return PageVerdict::TooShort {
            chars,
            min: min_body_chars,
        };
    }

    PageVerdict::Healthy
}

/// Reads the active page and judges it
///
/// Read failures make the page `Unreadable`. A fatal port error is returned
/// instead, since nothing else can be read either.
pub async fn inspect_page<P: BrowserPort + ?Sized>(
    port: &mut P,
    min_body_chars: usize,
) -> PortResult<PageVerdict> {
    let title = match port.title().await {
        Ok(title) => title,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(PageVerdict::Unreadable(e.to_string())),
    };

    let body = match port.body_text().await {
        Ok(body) => body,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(PageVerdict::Unreadable(e.to_string())),
    };

    Ok(judge_page(&title, &body, min_body_chars))
}
