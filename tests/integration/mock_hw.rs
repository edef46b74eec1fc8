//! Mock adapters for integration tests.
//!
//! Records every relay call with a timestamp so tests can assert on the
//! full switching history without touching real GPIO.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use barbot::app::events::DispenseEvent;
use barbot::app::ports::{
    ActuatorPort, CommandSource, EventSink, IndicatorError, IndicatorPort, MenuDisplay, PumpStore, RemoteCommand,
};
use barbot::app::session::{Session, SessionSettings};
use barbot::dispense::{DispenseEngine, EngineSettings};
use barbot::drivers::led_patterns::Rgb;
use barbot::error::{ConfigError, PersistenceError, TransportError};
use barbot::indicator::IndicatorLoop;
use barbot::menu::MenuView;
use barbot::recipes::RecipeCatalog;
use barbot::registry::{PumpRecord, PumpRegistry, PumpTable};
use barbot::safety::EmergencyStop;

// ── Relay call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCall {
    pub line: u32,
    pub on: bool,
    pub at: Duration,
}

pub struct RecordingActuator {
    t0: Instant,
    calls: Mutex<Vec<LineCall>>,
}

#[allow(dead_code)]
impl RecordingActuator {
    pub fn new() -> Self {
        Self {
            t0: Instant::now(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<LineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Lines switched on, in call order.
    pub fn activations(&self) -> Vec<u32> {
        self.calls().iter().filter(|c| c.on).map(|c| c.line).collect()
    }

    /// Offset (from the first activation) of the last switch-off of `line`.
    pub fn off_after_start(&self, line: u32) -> Option<Duration> {
        let calls = self.calls();
        let start = calls.iter().find(|c| c.on)?.at;
        calls
            .iter()
            .rev()
            .find(|c| c.line == line && !c.on)
            .map(|c| c.at.saturating_sub(start))
    }

    /// Lines whose most recent call switched them on.
    pub fn live_lines(&self) -> Vec<u32> {
        let calls = self.calls();
        let mut live: Vec<u32> = Vec::new();
        for c in &calls {
            live.retain(|l| *l != c.line);
            if c.on {
                live.push(c.line);
            }
        }
        live.sort_unstable();
        live
    }

    /// Largest number of lines on at the same time.
    pub fn max_concurrent(&self) -> usize {
        let mut live = Vec::new();
        let mut max = 0;
        for c in self.calls() {
            live.retain(|l| *l != c.line);
            if c.on {
                live.push(c.line);
            }
            max = max.max(live.len());
        }
        max
    }
}

impl ActuatorPort for RecordingActuator {
    fn activate(&self, line: u32) {
        let at = self.t0.elapsed();
        self.calls.lock().unwrap().push(LineCall { line, on: true, at });
    }

    fn deactivate(&self, line: u32) {
        let at = self.t0.elapsed();
        self.calls.lock().unwrap().push(LineCall { line, on: false, at });
    }
}

// ── Lighting ──────────────────────────────────────────────────

#[derive(Default)]
pub struct NullLights {
    pub frames: AtomicUsize,
}

impl IndicatorPort for NullLights {
    fn fill(&self, _colour: Rgb) -> Result<(), IndicatorError> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ── Pump store ────────────────────────────────────────────────

struct StoreState {
    table: Mutex<PumpTable>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

/// In-memory [`PumpStore`]; clones share one table.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreState>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new(table: PumpTable) -> Self {
        Self {
            inner: Arc::new(StoreState {
                table: Mutex::new(table),
                fail_saves: AtomicBool::new(false),
                saves: AtomicUsize::new(0),
            }),
        }
    }

    pub fn table(&self) -> PumpTable {
        self.inner.table.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl PumpStore for MemoryStore {
    fn load(&self) -> Result<PumpTable, ConfigError> {
        Ok(self.table())
    }

    fn save(&self, table: &PumpTable) -> Result<(), PersistenceError> {
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected("disk full".into()));
        }
        *self.inner.table.lock().unwrap() = table.clone();
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Event sink / front end ────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<DispenseEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn progress(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DispenseEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &DispenseEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct MockFrontend {
    pub pages: Vec<MenuView>,
    pub notices: Vec<String>,
    pub events: Vec<DispenseEvent>,
}

#[allow(dead_code)]
impl MockFrontend {
    pub fn last_page(&self) -> &MenuView {
        self.pages.last().expect("nothing rendered")
    }

    pub fn last_labels(&self) -> Vec<String> {
        self.last_page().items.iter().map(|i| i.label.clone()).collect()
    }
}

impl MenuDisplay for MockFrontend {
    fn show_menu(&mut self, view: &MenuView) {
        self.pages.push(view.clone());
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_owned());
    }
}

impl EventSink for MockFrontend {
    fn emit(&mut self, event: &DispenseEvent) {
        self.events.push(event.clone());
    }
}

// ── Command source ────────────────────────────────────────────

#[derive(Default)]
pub struct MockSource {
    pub inbox: Vec<RemoteCommand>,
    pub consumed: Vec<String>,
    pub sent: Vec<(String, String)>,
    /// Each `true` makes one fetch fail, front first.
    pub fetch_failures: VecDeque<bool>,
    pub fail_send: bool,
    pub fetches: usize,
}

#[allow(dead_code)]
impl MockSource {
    pub fn with(commands: &[(&str, &str)]) -> Self {
        Self {
            inbox: commands
                .iter()
                .map(|(id, text)| RemoteCommand {
                    id: (*id).to_owned(),
                    text: (*text).to_owned(),
                })
                .collect(),
            ..Self::default()
        }
    }
}

impl CommandSource for MockSource {
    fn fetch_unread(&mut self) -> Result<Vec<RemoteCommand>, TransportError> {
        self.fetches += 1;
        if self.fetch_failures.pop_front().unwrap_or(false) {
            return Err(TransportError::Fetch("mailbox unreachable".into()));
        }
        Ok(self
            .inbox
            .iter()
            .filter(|c| !self.consumed.contains(&c.id))
            .cloned()
            .collect())
    }

    fn mark_consumed(&mut self, id: &str) -> Result<(), TransportError> {
        self.consumed.push(id.to_owned());
        Ok(())
    }

    fn send_confirmation(&mut self, subject: &str, body: &str) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::Send("smtp down".into()));
        }
        self.sent.push((subject.to_owned(), body.to_owned()));
        Ok(())
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Seconds per unit used by most tests: 50 units → 200 ms.
pub const FAST_FLOW: f64 = 0.004;

pub fn table(slots: &[(&str, u32, Option<&str>)]) -> PumpTable {
    slots
        .iter()
        .enumerate()
        .map(|(i, (key, pin, value))| {
            (
                (*key).to_owned(),
                PumpRecord {
                    name: format!("Pump {}", i + 1),
                    pin: *pin,
                    value: value.map(str::to_owned),
                },
            )
        })
        .collect()
}

/// pump_1 = gin (17), pump_2 = tonic (27), pump_3 empty (22).
pub fn gin_and_tonic_table() -> PumpTable {
    table(&[
        ("pump_1", 17, Some("gin")),
        ("pump_2", 27, Some("tonic")),
        ("pump_3", 22, None),
    ])
}

pub struct Rig {
    pub actuator: Arc<RecordingActuator>,
    pub lights: Arc<NullLights>,
    pub store: MemoryStore,
    pub stop: EmergencyStop,
    pub session: Session,
}

/// The mocks behind a session, for tests that hand the session away.
#[allow(dead_code)]
pub struct Mocks {
    pub actuator: Arc<RecordingActuator>,
    pub lights: Arc<NullLights>,
    pub store: MemoryStore,
    pub stop: EmergencyStop,
}

impl Rig {
    #[allow(dead_code)]
    pub fn split(self) -> (Session, Mocks) {
        let Rig {
            actuator,
            lights,
            store,
            stop,
            session,
        } = self;
        (
            session,
            Mocks {
                actuator,
                lights,
                store,
                stop,
            },
        )
    }
}

pub fn rig(table: PumpTable, flow_rate: f64) -> Rig {
    rig_with(table, flow_rate, fast_settings())
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        clean: Duration::from_millis(100),
        pump_test: Duration::from_millis(60),
        pump_test_pause: Duration::from_millis(20),
        settle: Duration::ZERO,
    }
}

pub fn rig_with(table: PumpTable, flow_rate: f64, settings: SessionSettings) -> Rig {
    let store = MemoryStore::new(table);
    let registry = PumpRegistry::load(&store).unwrap();
    let actuator = Arc::new(RecordingActuator::new());
    let lights = Arc::new(NullLights::default());
    let stop = EmergencyStop::new(actuator.clone(), registry.lines());
    let engine = DispenseEngine::new(
        stop.clone(),
        IndicatorLoop::new(lights.clone(), Duration::from_millis(10), Duration::from_millis(20)),
        EngineSettings {
            flow_rate_secs_per_unit: flow_rate,
            progress_interval: Duration::from_millis(10),
        },
    );
    let session = Session::new(
        registry,
        Box::new(store.clone()),
        RecipeCatalog::default(),
        engine,
        settings,
    );
    Rig {
        actuator,
        lights,
        store,
        stop,
        session,
    }
}
