//! Mock adapters for integration tests.
//!
//! Records every emitted event and host call so tests can assert on the
//! full history. GPIO itself comes from the crate's simulated board.

use watershed::adapters::sim::{SimBackend, SimBoard};
use watershed::app::events::AppEvent;
use watershed::app::ports::{EventSink, HostError, HostPort};
use watershed::config::{Backend, ControllerConfig, EdgeDetection};

pub const PUMP: u8 = 18;
pub const BUTTON: u8 = 3;

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn shutdown_requests(&self) -> usize {
        self.count(|e| matches!(e, AppEvent::ShutdownRequested(_)))
    }

    pub fn presses(&self) -> usize {
        self.count(|e| matches!(e, AppEvent::ButtonPressed))
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── MockHost ──────────────────────────────────────────────────

pub struct MockHost {
    pub halts: u32,
    pub result: Result<(), HostError>,
}

#[allow(dead_code)]
impl MockHost {
    pub fn new() -> Self {
        Self {
            halts: 0,
            result: Ok(()),
        }
    }

    pub fn failing(err: HostError) -> Self {
        Self {
            halts: 0,
            result: Err(err),
        }
    }
}

impl HostPort for MockHost {
    fn halt(&mut self) -> Result<(), HostError> {
        self.halts += 1;
        self.result
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub fn sim_config(edge_detection: EdgeDetection) -> ControllerConfig {
    ControllerConfig {
        backend: Backend::Sim,
        pin_out: PUMP,
        pin_in: Some(BUTTON),
        debounce_ms: 30,
        edge_detection,
        ..ControllerConfig::default()
    }
}

pub fn sim() -> (SimBoard, SimBackend) {
    let board = SimBoard::new();
    let backend = SimBackend::new(board.clone());
    (board, backend)
}
