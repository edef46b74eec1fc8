//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing dispense events through the `log`
//! facade.  Progress goes out at debug level to keep `info` readable.

use log::{debug, info, warn};

use crate::app::events::DispenseEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`DispenseEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DispenseEvent) {
        match event {
            DispenseEvent::Started { label, pumps, total } => {
                info!(
                    "JOB   | {label} | start | pumps={pumps} | total={:.1}s",
                    total.as_secs_f64()
                );
            }
            DispenseEvent::IngredientSkipped { ingredient } => {
                warn!("JOB   | skipped '{ingredient}': no pump assigned");
            }
            DispenseEvent::Progress(pct) => {
                debug!("JOB   | {pct:>3}%");
            }
            DispenseEvent::Finished { label, elapsed } => {
                info!("JOB   | {label} | done | {:.2}s", elapsed.as_secs_f64());
            }
            DispenseEvent::Interrupted { label } => {
                warn!("JOB   | {label} | interrupted");
            }
        }
    }
}
