//! Simulated output pin for hosts without relay hardware.
//!
//! Level changes are logged, so a dry run shows exactly when each line
//! would have switched.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::debug;

#[derive(Debug)]
pub struct SimulatedPin {
    line: u32,
    high: Option<bool>,
}

impl SimulatedPin {
    pub fn new(line: u32) -> Self {
        Self { line, high: None }
    }

    /// Last level written; `None` before the first write.
    pub fn is_high(&self) -> Option<bool> {
        self.high
    }

    fn set(&mut self, high: bool) {
        if self.high != Some(high) {
            debug!("line {} -> {}", self.line, if high { "HIGH" } else { "LOW" });
        }
        self.high = Some(high);
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}
