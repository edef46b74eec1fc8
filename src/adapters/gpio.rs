//! Relay-line adapter.
//!
//! Owns one [`PumpDriver`] per control line and exposes them through
//! [`ActuatorPort`].  Any `embedded-hal` output pin works, so the same
//! adapter drives real GPIO or the [`SimulatedPin`](super::sim_pin::SimulatedPin).
//!
//! Pin faults are logged here and never reach the dispense engine.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::app::ports::ActuatorPort;
use crate::drivers::pump::{Polarity, PumpDriver};

pub struct PinBank<P: OutputPin> {
    pumps: BTreeMap<u32, Mutex<PumpDriver<P>>>,
}

impl<P: OutputPin + Send> PinBank<P> {
    /// Take ownership of `(line, pin)` pairs; every line is driven to the
    /// off level before this returns.
    pub fn new(pins: impl IntoIterator<Item = (u32, P)>, polarity: Polarity) -> Result<Self, P::Error> {
        let mut pumps = BTreeMap::new();
        for (line, pin) in pins {
            pumps.insert(line, Mutex::new(PumpDriver::new(pin, polarity)?));
        }
        info!("PinBank: {} line(s) initialised off ({polarity:?})", pumps.len());
        Ok(Self { pumps })
    }

    pub fn lines(&self) -> Vec<u32> {
        self.pumps.keys().copied().collect()
    }

    /// `None` for a line this bank does not own.
    pub fn is_running(&self, line: u32) -> Option<bool> {
        self.pumps.get(&line).map(|p| lock(p).is_running())
    }

    fn with_pump(&self, line: u32, op: &str, f: impl FnOnce(&mut PumpDriver<P>) -> Result<(), P::Error>) {
        let Some(pump) = self.pumps.get(&line) else {
            error!("PinBank: no pump on line {line} ({op} ignored)");
            return;
        };
        let mut driver = lock(pump);
        if let Err(e) = f(&mut *driver) {
            error!("PinBank: {op} line {line} failed: {e:?}");
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: OutputPin + Send> ActuatorPort for PinBank<P> {
    fn activate(&self, line: u32) {
        self.with_pump(line, "activate", PumpDriver::run);
    }

    fn deactivate(&self, line: u32) {
        self.with_pump(line, "deactivate", PumpDriver::stop);
    }
}
