//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter       | Implements          | Connects to                  |
//! |---------------|---------------------|------------------------------|
//! | `gpio`        | ActuatorPort        | embedded-hal output pins     |
//! | `sim_pin`     | OutputPin           | log (no hardware)            |
//! | `json_store`  | PumpStore           | `pump_config.json`           |
//! | `log_sink`    | EventSink           | `log` facade                 |
//! | `console`     | MenuDisplay         | stdout                       |
//! |               | EventSink           | stdout progress bar + log    |
//! | `spool`       | CommandSource       | inbox / outbox directories   |
//!
//! Status lighting is served by [`crate::drivers::status_led`].

pub mod console;
pub mod gpio;
pub mod json_store;
pub mod log_sink;
pub mod sim_pin;
pub mod spool;
