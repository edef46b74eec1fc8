//! Session controller.
//!
//! [`Session`] owns the pump registry, recipe catalog and dispense engine
//! and serialises jobs through a [`RunningFlag`].  [`Controller`] binds a
//! line-oriented input stream to menu navigation:
//!
//! ```text
//!  input ──▶ SessionCommand ──▶ Menu ──select──▶ MenuBinding ──▶ Session
//!                                 ▲                                 │
//!                                 └──── apply_filters ◀── registry ─┘
//! ```

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::DispenserConfig;
use crate::dispense::{DispenseEngine, DispenseResult};
use crate::error::{Error, Result};
use crate::menu::{LeafAction, LeafPolicy, Menu, MenuDelegate, MenuTree, Selection, apply_filters, build_menu};
use crate::recipes::RecipeCatalog;
use crate::registry::PumpRegistry;

use super::commands::SessionCommand;
use super::ports::{EventSink, MenuDisplay, PumpStore};

// ───────────────────────────────────────────────────────────────
// Running flag
// ───────────────────────────────────────────────────────────────

/// Set while a job is in flight.  The one piece of state shared between
/// the console and the remote poller.
#[derive(Debug, Default)]
pub struct RunningFlag(AtomicBool);

impl RunningFlag {
    /// Claim the flag, or `None` if a job is already running.
    pub fn try_acquire(&self) -> Option<RunGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(self))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the flag on drop.
pub struct RunGuard<'a>(&'a RunningFlag);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.0.store(false, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// Session
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub clean: Duration,
    pub pump_test: Duration,
    pub pump_test_pause: Duration,
    /// Quiet time after a job before the next one is accepted.
    pub settle: Duration,
}

impl From<&DispenserConfig> for SessionSettings {
    fn from(cfg: &DispenserConfig) -> Self {
        Self {
            clean: cfg.clean_duration(),
            pump_test: cfg.pump_test_duration(),
            pump_test_pause: cfg.pump_test_pause(),
            settle: cfg.settle(),
        }
    }
}

pub struct Session {
    registry: PumpRegistry,
    store: Box<dyn PumpStore>,
    catalog: RecipeCatalog,
    engine: DispenseEngine,
    running: RunningFlag,
    settings: SessionSettings,
}

impl Session {
    pub fn new(
        registry: PumpRegistry,
        store: Box<dyn PumpStore>,
        catalog: RecipeCatalog,
        engine: DispenseEngine,
        settings: SessionSettings,
    ) -> Self {
        Self {
            registry,
            store,
            catalog,
            engine,
            running: RunningFlag::default(),
            settings,
        }
    }

    pub fn registry(&self) -> &PumpRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &DispenseEngine {
        &self.engine
    }

    /// True while a job holds the running flag.
    pub fn is_busy(&self) -> bool {
        self.running.is_set()
    }

    /// Pour the recipe named `name` (exact name first, then a
    /// case-insensitive match).  Fails with [`Error::Busy`] if a job is
    /// already running; the running job is unaffected.
    pub fn dispense(&self, name: &str, sink: &mut dyn EventSink) -> Result<DispenseResult> {
        let recipe = self
            .catalog
            .get(name)
            .or_else(|| self.catalog.find(name))
            .ok_or_else(|| Error::UnknownRecipe(name.to_owned()))?;
        self.exclusive(|| self.engine.dispense(recipe, &self.registry, sink))
    }

    /// Flush every line.
    pub fn clean(&self, sink: &mut dyn EventSink) -> Result<DispenseResult> {
        self.exclusive(|| self.engine.clean(&self.registry, self.settings.clean, sink))
    }

    /// Run each pump in turn.
    pub fn test_pumps(&self, sink: &mut dyn EventSink) -> Result<DispenseResult> {
        self.exclusive(|| {
            self.engine.test_pumps(
                &self.registry,
                self.settings.pump_test,
                self.settings.pump_test_pause,
                sink,
            )
        })
    }

    /// Load `ingredient` into `slot` and persist.  On a failed write the
    /// slot keeps its previous ingredient.
    pub fn assign(&mut self, slot: &str, ingredient: Option<&str>) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }
        self.registry.assign(slot, ingredient, self.store.as_ref())
    }

    /// Perform a menu leaf's action.
    pub fn handle_selection(&mut self, action: &LeafAction, sink: &mut dyn EventSink) -> Result<()> {
        debug!("Selected {} leaf", action.tag());
        match action {
            LeafAction::Drink { recipe } => {
                let result = self.dispense(recipe, sink)?;
                finished(&result)
            }
            LeafAction::AssignPump {
                slot, ingredient, ..
            } => self.assign(slot, ingredient.as_deref()),
            LeafAction::Clean => {
                let result = self.clean(sink)?;
                finished(&result)
            }
            LeafAction::TestPumps => {
                let result = self.test_pumps(sink)?;
                finished(&result)
            }
        }
    }

    fn exclusive<T>(&self, job: impl FnOnce() -> Result<T>) -> Result<T> {
        let Some(_guard) = self.running.try_acquire() else {
            warn!("Request refused: a job is already running");
            return Err(Error::Busy);
        };
        let outcome = job();
        if outcome.is_ok() && !self.settings.settle.is_zero() {
            thread::sleep(self.settings.settle);
        }
        outcome
    }
}

/// A job that was cut short counts as a failed action.
fn finished(result: &DispenseResult) -> Result<()> {
    if result.completed {
        Ok(())
    } else {
        Err(Error::EmergencyStopped)
    }
}

// ───────────────────────────────────────────────────────────────
// Menu binding
// ───────────────────────────────────────────────────────────────

/// Borrows the session and the front end for the duration of one menu
/// operation.
struct MenuBinding<'a, F> {
    session: &'a mut Session,
    frontend: &'a mut F,
}

impl<F: MenuDisplay + EventSink> MenuDelegate for MenuBinding<'_, F> {
    fn prepare_for_render(&self, tree: &mut MenuTree) {
        apply_filters(tree, &self.session.catalog, &self.session.registry);
    }

    fn on_select(&mut self, action: &LeafAction) -> bool {
        match self.session.handle_selection(action, &mut *self.frontend) {
            Ok(()) => true,
            Err(e) => {
                warn!("{} failed: {e}", action.tag());
                self.frontend.notice(&e.to_string());
                false
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// Whether the input loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Render → read one command → apply → repeat.
pub struct Controller<F> {
    menu: Menu,
    session: Session,
    frontend: F,
}

impl<F: MenuDisplay + EventSink> Controller<F> {
    pub fn new(session: Session, frontend: F, policy: LeafPolicy) -> Self {
        let tree = build_menu(session.catalog(), session.registry());
        Self {
            menu: Menu::new(tree, policy),
            session,
            frontend,
        }
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn into_parts(self) -> (Session, F) {
        (self.session, self.frontend)
    }

    /// Re-run the visibility filters and show the current page.
    pub fn render(&mut self) {
        let binding = MenuBinding {
            session: &mut self.session,
            frontend: &mut self.frontend,
        };
        self.menu.refresh(&binding);
        self.frontend.show_menu(&self.menu.view());
    }

    pub fn apply(&mut self, command: SessionCommand) -> Flow {
        match command {
            SessionCommand::Advance => self.menu.advance(),
            SessionCommand::Select => {
                let mut binding = MenuBinding {
                    session: &mut self.session,
                    frontend: &mut self.frontend,
                };
                match self.menu.select(&mut binding) {
                    Selection::Nothing => self.frontend.notice("Nothing to select"),
                    Selection::Descended(_) | Selection::Ascended(_) => {}
                    Selection::Action { action, succeeded } => {
                        debug!("{} leaf finished, succeeded={succeeded}", action.tag());
                    }
                }
            }
            SessionCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Drive the menu from `input` until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead) {
        self.render();
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Input closed: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<SessionCommand>() {
                Ok(command) => {
                    if self.apply(command) == Flow::Quit {
                        info!("Session ended by user");
                        return;
                    }
                }
                Err(e) => self.frontend.notice(&e.to_string()),
            }
            self.render();
        }
        info!("Session ended: end of input");
    }
}
