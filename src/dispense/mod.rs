//! Dispense engine: concurrent pump fan-out with a join barrier.
//!
//! ```text
//!            T0                                   join
//!   line 17  ├── on ───────── off                   │
//!   line 27  ├── on ──────────────────────── off    │
//!   line 22  ├── on ──── off                        │
//!            │                                      │
//!   control  ├─ progress ─ progress ─ progress ─────┤──▶ lights cue ──▶ return
//!   lights   ├─ animate ⟲ ──────────────────────────┘
//! ```
//!
//! 1. Every line is switched on from the calling thread before any worker
//!    starts, so all activations happen-before the first deactivation.
//! 2. One scoped worker per line owns that line's [`ActiveLine`] guard,
//!    sleeps until `T0 + duration` and drops the guard.  Workers never
//!    wait for each other.
//! 3. The calling thread reports progress while draining worker
//!    completions; progress output never gates a worker.
//! 4. The scope is the barrier: `run` cannot return while any line is on.
//!
//! The engine holds no `running` flag; overlapping jobs are refused one
//! level up by the [`Session`](crate::app::session::Session).

pub mod job;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::app::events::DispenseEvent;
use crate::app::ports::EventSink;
use crate::drivers::led_patterns::POURING;
use crate::error::{Error, Result, UnresolvedIngredient};
use crate::indicator::IndicatorLoop;
use crate::recipes::Recipe;
use crate::registry::PumpRegistry;
use crate::safety::{ActiveLine, EmergencyStop};

pub use job::{DispenseJob, PlannedRun};

/// What happened to one line during a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpRun {
    pub slot: String,
    pub ingredient: Option<String>,
    pub line: u32,
    pub planned: Duration,
    /// Offset from T0 at which the line was switched off; `None` if it
    /// never switched on.
    pub stopped_after: Option<Duration>,
}

impl PumpRun {
    pub fn activated(&self) -> bool {
        self.stopped_after.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispenseResult {
    pub label: String,
    pub runs: Vec<PumpRun>,
    pub unresolved: Vec<UnresolvedIngredient>,
    pub elapsed: Duration,
    /// Every planned run reached its full duration.
    pub completed: bool,
}

impl DispenseResult {
    /// Lines that were actually switched on.
    pub fn activated_lines(&self) -> Vec<u32> {
        self.runs.iter().filter(|r| r.activated()).map(|r| r.line).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub flow_rate_secs_per_unit: f64,
    pub progress_interval: Duration,
}

pub struct DispenseEngine {
    stop: EmergencyStop,
    lights: IndicatorLoop,
    settings: EngineSettings,
}

struct WorkerDone {
    idx: usize,
    at: Duration,
    completed: bool,
}

impl DispenseEngine {
    pub fn new(stop: EmergencyStop, lights: IndicatorLoop, settings: EngineSettings) -> Self {
        Self {
            stop,
            lights,
            settings,
        }
    }

    pub fn emergency_stop(&self) -> &EmergencyStop {
        &self.stop
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn plan(&self, recipe: &Recipe, registry: &PumpRegistry) -> DispenseJob {
        DispenseJob::for_recipe(recipe, registry, self.settings.flow_rate_secs_per_unit)
    }

    /// Pour `recipe` with whatever pumps currently carry its ingredients.
    pub fn dispense(
        &self,
        recipe: &Recipe,
        registry: &PumpRegistry,
        sink: &mut dyn EventSink,
    ) -> Result<DispenseResult> {
        self.run(self.plan(recipe, registry), sink)
    }

    /// Flush every line for `duration`.
    pub fn clean(
        &self,
        registry: &PumpRegistry,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<DispenseResult> {
        self.run(DispenseJob::flush_all(registry, duration), sink)
    }

    /// Execute a planned job.  Returns once every line is off again.
    pub fn run(&self, job: DispenseJob, sink: &mut dyn EventSink) -> Result<DispenseResult> {
        if self.stop.is_engaged() {
            return Err(Error::EmergencyStopped);
        }

        let pattern = job.pattern();
        let total = job.total();
        let (label, planned, unresolved) = job.into_parts();

        for missing in &unresolved {
            warn!("{label}: {missing}; skipping");
            sink.emit(&DispenseEvent::IngredientSkipped {
                ingredient: missing.ingredient.clone(),
            });
        }

        let mut runs: Vec<PumpRun> = planned
            .iter()
            .map(|p| PumpRun {
                slot: p.slot.clone(),
                ingredient: p.ingredient.clone(),
                line: p.line,
                planned: p.duration,
                stopped_after: None,
            })
            .collect();

        let live: Vec<usize> = (0..planned.len())
            .filter(|&i| !planned[i].duration.is_zero())
            .collect();
        if live.is_empty() {
            info!("{label}: no pumps to run");
            return Ok(DispenseResult {
                label,
                runs,
                unresolved,
                elapsed: Duration::ZERO,
                completed: true,
            });
        }

        let lights = self.lights.start(pattern);
        info!("{label}: starting {} pump(s), {:.1}s total", live.len(), total.as_secs_f64());
        sink.emit(&DispenseEvent::Started {
            label: label.clone(),
            pumps: live.len(),
            total,
        });

        // ── T0: switch every line on ─────────────────────────
        let t0 = Instant::now();
        let mut guards: Vec<(usize, ActiveLine)> = Vec::with_capacity(live.len());
        for &idx in &live {
            match self.stop.activate(planned[idx].line) {
                Some(guard) => guards.push((idx, guard)),
                None => {
                    // Stop engaged between lines: everything already on
                    // goes off as `guards` drops.
                    drop(guards);
                    lights.abort();
                    sink.emit(&DispenseEvent::Interrupted { label: label.clone() });
                    return Ok(DispenseResult {
                        label,
                        runs,
                        unresolved,
                        elapsed: t0.elapsed(),
                        completed: false,
                    });
                }
            }
        }

        // ── Fan out, report progress, join ───────────────────
        let mut all_completed = true;
        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<WorkerDone>();
            for (idx, guard) in guards {
                let deadline = t0 + planned[idx].duration;
                let worker_tx = tx.clone();
                let stop = &self.stop;
                let spawned = thread::Builder::new()
                    .name(format!("pump-{}", guard.line()))
                    .spawn_scoped(scope, move || {
                        let completed = stop.wait_until(deadline);
                        drop(guard);
                        let _ = worker_tx.send(WorkerDone {
                            idx,
                            at: t0.elapsed(),
                            completed,
                        });
                    });
                if let Err(e) = spawned {
                    // The closure, and with it the guard, was dropped:
                    // the line is already off.
                    error!("{label}: pump worker for line {} failed to start: {e}", planned[idx].line);
                    runs[idx].stopped_after = Some(t0.elapsed());
                    all_completed = false;
                }
            }
            drop(tx);

            let mut last_pct = None;
            loop {
                match rx.recv_timeout(self.settings.progress_interval) {
                    Ok(done) => {
                        runs[done.idx].stopped_after = Some(done.at);
                        all_completed &= done.completed;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                let pct = progress_percent(t0.elapsed(), total);
                if last_pct != Some(pct) {
                    sink.emit(&DispenseEvent::Progress(pct));
                    last_pct = Some(pct);
                }
            }
        });

        let elapsed = t0.elapsed();
        let completed = all_completed && !self.stop.is_engaged();
        if completed {
            sink.emit(&DispenseEvent::Progress(100));
            lights.finish();
            info!("{label}: done in {:.2}s", elapsed.as_secs_f64());
            sink.emit(&DispenseEvent::Finished {
                label: label.clone(),
                elapsed,
            });
        } else {
            lights.abort();
            warn!("{label}: interrupted after {:.2}s", elapsed.as_secs_f64());
            sink.emit(&DispenseEvent::Interrupted { label: label.clone() });
        }

        Ok(DispenseResult {
            label,
            runs,
            unresolved,
            elapsed,
            completed,
        })
    }

    /// Run each pump on its own, one after another, for `run_for`, with a
    /// `pause` between pumps.  Idle lines are swept off before each pump
    /// and at the end.  Used to check wiring and prime lines.
    pub fn test_pumps(
        &self,
        registry: &PumpRegistry,
        run_for: Duration,
        pause: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<DispenseResult> {
        if self.stop.is_engaged() {
            return Err(Error::EmergencyStopped);
        }

        let label = "Pump test".to_owned();
        let slots = registry.slots();
        let lights = self.lights.start(POURING);
        sink.emit(&DispenseEvent::Started {
            label: label.clone(),
            pumps: slots.len(),
            total: run_for * slots.len() as u32,
        });

        let t0 = Instant::now();
        let mut runs = Vec::with_capacity(slots.len());
        let mut completed = true;
        for (i, slot) in slots.iter().enumerate() {
            let mut run = PumpRun {
                slot: slot.key().to_owned(),
                ingredient: slot.ingredient().map(str::to_owned),
                line: slot.line(),
                planned: run_for,
                stopped_after: None,
            };

            self.stop.sweep_idle();
            if let Some(guard) = self.stop.activate(slot.line()) {
                info!("Pump test: {} (line {}) on for {:.1}s", slot.name(), slot.line(), run_for.as_secs_f64());
                completed = self.stop.wait_until(Instant::now() + run_for);
                drop(guard);
                run.stopped_after = Some(t0.elapsed());
            } else {
                completed = false;
            }
            runs.push(run);
            sink.emit(&DispenseEvent::Progress((((i + 1) * 100) / slots.len()) as u8));

            if !completed || !self.stop.wait_until(Instant::now() + pause) {
                completed = false;
                break;
            }
        }

        self.stop.sweep_idle();
        let elapsed = t0.elapsed();
        if completed {
            lights.finish();
            sink.emit(&DispenseEvent::Finished {
                label: label.clone(),
                elapsed,
            });
        } else {
            lights.abort();
            sink.emit(&DispenseEvent::Interrupted { label: label.clone() });
        }

        Ok(DispenseResult {
            label,
            runs,
            unresolved: Vec::new(),
            elapsed,
            completed,
        })
    }
}

/// `elapsed / total` scaled to 0–100.
pub fn progress_percent(elapsed: Duration, total: Duration) -> u8 {
    if total.is_zero() {
        return 100;
    }
    let pct = elapsed.as_secs_f64() / total.as_secs_f64() * 100.0;
    pct.clamp(0.0, 100.0) as u8
}
