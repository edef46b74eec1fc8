//! Emergency stop.
//!
//! Every pump activation goes through [`EmergencyStop::activate`], which
//! records the line as live and hands back an [`ActiveLine`] guard.  The
//! guard switches the line off when dropped, so a worker that returns
//! early or panics still leaves its pump off.
//!
//! [`EmergencyStop::engage`] is the process-wide kill path used by the
//! signal handler and on graceful shutdown:
//!
//! 1. Under the state lock, mark the stop as engaged so no new line can
//!    be activated.
//! 2. Force every tracked line off, then every known line off.
//! 3. Wake any worker sleeping in [`EmergencyStop::wait_until`].
//!
//! Activation, release and engage all take the same lock, so a line can
//! never be switched on after the stop has swept it.  Engaging with no job
//! running is a harmless sweep.

use std::collections::BTreeSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{error, info, warn};

use crate::app::ports::ActuatorPort;

struct StopState {
    active: BTreeSet<u32>,
    engaged: bool,
}

struct Inner {
    actuators: Arc<dyn ActuatorPort>,
    known_lines: Vec<u32>,
    state: Mutex<StopState>,
    wake: Condvar,
}

/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct EmergencyStop {
    inner: Arc<Inner>,
}

impl EmergencyStop {
    pub fn new(actuators: Arc<dyn ActuatorPort>, known_lines: impl IntoIterator<Item = u32>) -> Self {
        Self {
            inner: Arc::new(Inner {
                actuators,
                known_lines: known_lines.into_iter().collect(),
                state: Mutex::new(StopState {
                    active: BTreeSet::new(),
                    engaged: false,
                }),
                wake: Condvar::new(),
            }),
        }
    }

    /// Switch `line` on and track it.  Returns `None` once the stop has
    /// been engaged.
    pub fn activate(&self, line: u32) -> Option<ActiveLine> {
        let mut state = self.lock();
        if state.engaged {
            warn!("Refusing to start line {line}: emergency stop engaged");
            return None;
        }
        if !state.active.insert(line) {
            error!("Line {line} is already running");
            return None;
        }
        self.inner.actuators.activate(line);
        Some(ActiveLine {
            stop: self.clone(),
            line,
        })
    }

    /// Force every line off and refuse further activations.  Returns the
    /// number of lines that were running.
    pub fn engage(&self) -> usize {
        let mut state = self.lock();
        state.engaged = true;
        let live: Vec<u32> = std::mem::take(&mut state.active).into_iter().collect();
        for &line in &live {
            self.inner.actuators.deactivate(line);
        }
        for &line in &self.inner.known_lines {
            self.inner.actuators.deactivate(line);
        }
        drop(state);
        self.inner.wake.notify_all();

        if live.is_empty() {
            info!("Emergency stop: all lines confirmed off");
        } else {
            warn!("Emergency stop: forced {} running line(s) off: {:?}", live.len(), live);
        }
        live.len()
    }

    /// Re-arm after an [`engage`](Self::engage).
    pub fn reset(&self) {
        self.lock().engaged = false;
        info!("Emergency stop re-armed");
    }

    pub fn is_engaged(&self) -> bool {
        self.lock().engaged
    }

    /// Lines currently switched on, ascending.
    pub fn active_lines(&self) -> Vec<u32> {
        self.lock().active.iter().copied().collect()
    }

    /// Sleep until `deadline`.  Returns `false` if the stop was engaged
    /// first.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut state = self.lock();
        loop {
            if state.engaged {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            state = self
                .inner
                .wake
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Drive every known line that is not tracked as running to off.
    pub fn sweep_idle(&self) {
        let state = self.lock();
        for line in self.inner.known_lines.iter().filter(|l| !state.active.contains(l)) {
            self.inner.actuators.deactivate(*line);
        }
    }

    fn release(&self, line: u32) {
        let mut state = self.lock();
        // Already swept by `engage` if missing.
        if state.active.remove(&line) {
            self.inner.actuators.deactivate(line);
        }
    }

    fn lock(&self) -> MutexGuard<'_, StopState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A running pump line.  Dropping it switches the line off.
pub struct ActiveLine {
    stop: EmergencyStop,
    line: u32,
}

impl ActiveLine {
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Drop for ActiveLine {
    fn drop(&mut self) {
        self.stop.release(self.line);
    }
}
