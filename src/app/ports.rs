//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Session / DispenseEngine (domain)
//! ```
//!
//! Driven adapters (relay lines, status lighting, event sinks, pump
//! storage, command transport) implement these traits.  The domain core
//! consumes them through generics or shared trait objects, so it never
//! touches hardware, files or the network directly.

use crate::error::{ConfigError, PersistenceError, TransportError};
use crate::drivers::led_patterns::Rgb;
use crate::menu::MenuView;
use crate::registry::PumpTable;

use super::events::DispenseEvent;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → relay lines)
// ───────────────────────────────────────────────────────────────

/// Switches one pump's control line on or off.
///
/// Shared between the control thread, every pump worker and the signal
/// handler, hence `Send + Sync` and `&self` receivers.  Fire-and-forget:
/// hardware faults are logged by the adapter and never surface here.
pub trait ActuatorPort: Send + Sync {
    /// Drive the line to its "pump running" level.
    fn activate(&self, line: u32);

    /// Drive the line to its safe (pump off) level.
    fn deactivate(&self, line: u32);
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → status lighting)
// ───────────────────────────────────────────────────────────────

/// Error from an indicator write.  Indicator faults are logged only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("indicator write failed: {0}")]
pub struct IndicatorError(pub String);

/// Status lighting (LED strip or similar).
pub trait IndicatorPort: Send + Sync {
    /// Fill the whole strip with one colour.
    fn fill(&self, colour: Rgb) -> Result<(), IndicatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / console)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DispenseEvent`]s through this port.
/// Adapters decide where they go (log lines, a console progress bar).
pub trait EventSink {
    fn emit(&mut self, event: &DispenseEvent);
}

// ───────────────────────────────────────────────────────────────
// Menu display port (driven adapter: domain → screen / console)
// ───────────────────────────────────────────────────────────────

/// Renders the current menu page and one-line notices.
pub trait MenuDisplay {
    fn show_menu(&mut self, view: &MenuView);

    fn notice(&mut self, message: &str);
}

// ───────────────────────────────────────────────────────────────
// Pump store port (driven adapter: domain ↔ persisted pump table)
// ───────────────────────────────────────────────────────────────

/// Keyed record store holding one `{ name, pin, value }` record per slot.
///
/// Read whole at startup, rewritten whole on every assignment change.
/// Implementations SHOULD make `save` atomic so a crash mid-write never
/// leaves a truncated table behind.
pub trait PumpStore: Send + Sync {
    /// Read the full table.  Missing or malformed storage is a
    /// [`ConfigError`].
    fn load(&self) -> Result<PumpTable, ConfigError>;

    /// Replace the full table.
    fn save(&self, table: &PumpTable) -> Result<(), PersistenceError>;
}

// ───────────────────────────────────────────────────────────────
// Command source port (driven adapter: domain ↔ remote mailbox)
// ───────────────────────────────────────────────────────────────

/// One remote request: an opaque id and the free text naming a drink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub id: String,
    pub text: String,
}

/// Mailbox-like transport delivering remote drink orders.
///
/// `fetch_unread` only returns items matching the configured subject and
/// sender filter.  Items not marked consumed are delivered again on the
/// next fetch.
pub trait CommandSource {
    fn fetch_unread(&mut self) -> Result<Vec<RemoteCommand>, TransportError>;

    fn mark_consumed(&mut self, id: &str) -> Result<(), TransportError>;

    /// Send a one-line confirmation to the configured recipient.
    fn send_confirmation(&mut self, subject: &str, body: &str) -> Result<(), TransportError>;
}
