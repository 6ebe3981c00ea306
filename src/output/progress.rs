//! Human-readable progress stream
//!
//! The engine announces page entries and link verdicts as they happen. A
//! `ProgressSink` receives them as structured events; their `Display` form is
//! the line format shown to users:
//!
//! ```text
//! [PAGE][1] https://example.com/about
//!  → [EXTERNAL] https://other.com [OK]
//! ```

use crate::state::LinkRecord;
use std::fmt;

/// One progress event
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// The traversal entered a page
    PageEntered { depth: u32, url: &'a str },

    /// A record was emitted
    Link(&'a LinkRecord),

    /// Free-form lifecycle message
    Notice(&'a str),
}

impl fmt::Display for ProgressEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageEntered { depth, url } => write!(f, "[PAGE][{}] {}", depth, url),
            Self::Link(record) => write!(
                f,
                " → [{}] {} [{}]",
                record.kind, record.to_target, record.status
            ),
            Self::Notice(message) => write!(f, "{}", message),
        }
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send {
    fn on_event(&mut self, event: &ProgressEvent<'_>);
}

/// Any `FnMut(&str)` closure receives the rendered line
impl<F> ProgressSink for F
where
    F: FnMut(&str) + Send,
{
    fn on_event(&mut self, event: &ProgressEvent<'_>) {
        self(&event.to_string())
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn on_event(&mut self, _event: &ProgressEvent<'_>) {}
}
