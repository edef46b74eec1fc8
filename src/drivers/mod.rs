//! Actuator drivers: relay-switched pumps and the status LED strip.

pub mod led_patterns;
pub mod pump;
pub mod status_led;
