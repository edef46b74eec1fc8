//! Relay-switched pump driver.
//!
//! Each pump is powered through a relay (or MOSFET) with its own supply;
//! the controller only provides the logic-level control line.  Many relay
//! boards are active-low, so polarity is a constructor argument.
//!
//! ## Safety contract
//!
//! The line is driven to the off level on construction, so a pump never
//! starts just because the controller booted.  This driver is a dumb
//! actuator; run-time limits are enforced by the dispense engine.

use embedded_hal::digital::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Drive HIGH to run the pump.
    ActiveHigh,
    /// Drive LOW to run the pump.
    ActiveLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Stopped,
    Running,
}

pub struct PumpDriver<P: OutputPin> {
    pin: P,
    polarity: Polarity,
    state: PumpState,
}

impl<P: OutputPin> PumpDriver<P> {
    /// Take ownership of `pin` and force it to the off level.
    pub fn new(pin: P, polarity: Polarity) -> Result<Self, P::Error> {
        let mut driver = Self {
            pin,
            polarity,
            state: PumpState::Running,
        };
        driver.stop()?;
        Ok(driver)
    }

    pub fn run(&mut self) -> Result<(), P::Error> {
        match self.polarity {
            Polarity::ActiveHigh => self.pin.set_high()?,
            Polarity::ActiveLow => self.pin.set_low()?,
        }
        self.state = PumpState::Running;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), P::Error> {
        match self.polarity {
            Polarity::ActiveHigh => self.pin.set_low()?,
            Polarity::ActiveLow => self.pin.set_high()?,
        }
        self.state = PumpState::Stopped;
        Ok(())
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PumpState::Running
    }
}
