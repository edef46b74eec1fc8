//! Outbound dispense events.
//!
//! The [`DispenseEngine`](crate::dispense::DispenseEngine) and
//! [`Session`](super::session::Session) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log lines, a console progress bar).

use std::time::Duration;

/// Structured events emitted while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum DispenseEvent {
    /// A job started; `pumps` lines were switched on.
    Started {
        label: String,
        pumps: usize,
        total: Duration,
    },

    /// A recipe ingredient had no pump and was skipped.
    IngredientSkipped { ingredient: String },

    /// Aggregate progress, 0–100.
    Progress(u8),

    /// Every pump of the job is off again.
    Finished { label: String, elapsed: Duration },

    /// The emergency stop cut the job short.
    Interrupted { label: String },
}
