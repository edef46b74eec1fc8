//! Status indicator loop.
//!
//! While a job runs, a background thread ticks the
//! [`LedPatternEngine`] once per cadence and pushes the colour to the
//! [`IndicatorPort`].  The thread sleeps on a channel rather than a plain
//! sleep, so a stop request is seen within one cadence tick.
//!
//! ```text
//!   start(pattern) ──▶ [animate ⟲ cadence] ──stop──▶ [success cue] ──▶ off
//!                                          └─abort──────────────────▶ off
//! ```
//!
//! Indicator faults are logged and swallowed: lighting never aborts a
//! dispense.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::app::ports::IndicatorPort;
use crate::drivers::led_patterns::{LedPatternEngine, OFF, Pattern, Rgb, SUCCESS};

enum StopMode {
    /// Run the success cue, then switch off.
    Celebrate,
    /// Switch off straight away.
    Abort,
}

/// Factory for indicator runs; one per controller.
#[derive(Clone)]
pub struct IndicatorLoop {
    port: Arc<dyn IndicatorPort>,
    cadence: Duration,
    success_cue: Duration,
}

impl IndicatorLoop {
    pub fn new(port: Arc<dyn IndicatorPort>, cadence: Duration, success_cue: Duration) -> Self {
        Self {
            port,
            cadence: cadence.max(Duration::from_millis(1)),
            success_cue,
        }
    }

    /// Start animating `pattern` on a background thread.  Never blocks
    /// and never fails; if the thread cannot be spawned the run is dark.
    pub fn start(&self, pattern: Pattern) -> IndicatorHandle {
        let (tx, rx) = mpsc::channel::<StopMode>();
        let run = self.clone();
        let spawned = thread::Builder::new()
            .name("indicator".into())
            .spawn(move || {
                let mut painter = Painter::new(run.port.as_ref());
                let mut engine = LedPatternEngine::with_pattern(pattern);
                let step_ms = run.cadence.as_millis() as u32;
                let mut colour = engine.tick(0);
                let mode = loop {
                    painter.paint(colour);
                    match rx.recv_timeout(run.cadence) {
                        Ok(mode) => break mode,
                        Err(RecvTimeoutError::Timeout) => colour = engine.tick(step_ms),
                        Err(RecvTimeoutError::Disconnected) => break StopMode::Abort,
                    }
                };
                if let StopMode::Celebrate = mode {
                    run.play_cue(&mut painter);
                }
                painter.paint(OFF);
            });

        match spawned {
            Ok(thread) => IndicatorHandle {
                stop: Some(tx),
                thread: Some(thread),
            },
            Err(e) => {
                warn!("Indicator thread failed to start ({e}); continuing without lights");
                IndicatorHandle {
                    stop: None,
                    thread: None,
                }
            }
        }
    }

    fn play_cue(&self, painter: &mut Painter<'_>) {
        let mut engine = LedPatternEngine::with_pattern(SUCCESS);
        let step_ms = self.cadence.as_millis() as u32;
        let end = Instant::now() + self.success_cue;
        let mut colour = engine.tick(0);
        while Instant::now() < end {
            painter.paint(colour);
            thread::sleep(self.cadence.min(end.saturating_duration_since(Instant::now())));
            colour = engine.tick(step_ms);
        }
    }
}

/// Writes colours, logging the first failure of a run only.
struct Painter<'a> {
    port: &'a dyn IndicatorPort,
    faulted: bool,
}

impl<'a> Painter<'a> {
    fn new(port: &'a dyn IndicatorPort) -> Self {
        Self {
            port,
            faulted: false,
        }
    }

    fn paint(&mut self, colour: Rgb) {
        if let Err(e) = self.port.fill(colour) {
            if !self.faulted {
                warn!("{e}; lighting disabled for this run");
            }
            self.faulted = true;
        }
    }
}

/// A running indicator.  Dropping it aborts the animation.
pub struct IndicatorHandle {
    stop: Option<Sender<StopMode>>,
    thread: Option<JoinHandle<()>>,
}

impl IndicatorHandle {
    /// Stop the animation, play the success cue and wait for the strip
    /// to go dark.
    pub fn finish(mut self) {
        self.shutdown(StopMode::Celebrate);
    }

    /// Stop the animation and switch the strip off without the cue.
    pub fn abort(mut self) {
        self.shutdown(StopMode::Abort);
    }

    fn shutdown(&mut self, mode: StopMode) {
        if let Some(tx) = self.stop.take() {
            // A send error means the thread already exited.
            let _ = tx.send(mode);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Indicator thread panicked");
            } else {
                debug!("Indicator stopped");
            }
        }
    }
}

impl Drop for IndicatorHandle {
    fn drop(&mut self) {
        self.shutdown(StopMode::Abort);
    }
}
