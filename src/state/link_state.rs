/// Link kind and status definitions for crawl records
///
/// This module defines what a discovered reference is and what the crawl
/// concluded about it.
use std::fmt;

/// The category a discovered reference falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A navigable page on the crawled site or one of its subdomains
    Internal,

    /// A page on any other site
    External,

    /// A PDF document, wherever it is hosted
    Pdf,
}

impl LinkKind {
    /// Returns the token used in progress lines and report files
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Internal => "INTERNAL",
            Self::External => "EXTERNAL",
            Self::Pdf => "PDF",
        }
    }

    /// Returns true if links of this kind are checked over HTTP instead of
    /// being opened in the browser
    pub fn is_probed(&self) -> bool {
        matches!(self, Self::External | Self::Pdf)
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

/// The liveness verdict for a discovered reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    /// Target answered and is not a broken page
    Ok,

    /// Target is unreachable, answered with an error, or is a soft-404
    Broken,

    /// Target is an internal page that was already entered earlier in the crawl
    SkippedVisited,
}

impl LinkStatus {
    /// Returns the token used in progress lines and report files
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Broken => "BROKEN",
            Self::SkippedVisited => "SKIPPED-VISITED",
        }
    }

    /// Maps a liveness probe answer onto a status
    pub fn from_alive(alive: bool) -> Self {
        if alive {
            Self::Ok
        } else {
            Self::Broken
        }
    }

    /// Returns true if records with this status belong in a report bucket
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::SkippedVisited)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

/// One discovered reference and the verdict reached for it
///
/// Records are created exactly once per discovered reference and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Normalized URL of the page the reference was found on
    pub from_page: String,

    /// The reference exactly as read from the element
    pub to_target: String,

    pub kind: LinkKind,

    pub status: LinkStatus,

    /// Depth of `from_page` below the start page
    pub depth: u32,
}

impl LinkRecord {
    pub fn new(
        from_page: impl Into<String>,
        to_target: impl Into<String>,
        kind: LinkKind,
        status: LinkStatus,
        depth: u32,
    ) -> Self {
        Self {
            from_page: from_page.into(),
            to_target: to_target.into(),
            kind,
            status,
            depth,
        }
    }
}
