//! Debounced shutdown-button monitor.
//!
//! ## Hardware
//!
//! Momentary switch to ground with a pull-up (active-low by default; the
//! active level is configurable). Raw transitions arrive either from the
//! GPIO interrupt, through the edge queue, or from sampling the level on
//! every control tick.
//!
//! ## State machine
//!
//! ```text
//!          active edge            window elapsed, still active
//!  Idle ───────────────▶ PressedCandidate ─────────────────────▶ ConfirmedPress
//!   ▲                      │  inactive edge (noise)                 │    ▲
//!   └──────────────────────┘                          inactive edge │    │ active edge
//!   ▲                                                               ▼    │
//!   └────────────────────── window elapsed, still inactive ── ReleaseCandidate
//! ```
//!
//! Every raw edge restarts the window. A confirmed press raises the
//! shutdown latch; the latch itself guarantees a single request per
//! process, and the release debounce keeps one physical press from
//! confirming twice.

use embedded_hal::digital::{Error as _, InputPin};
use log::{debug, error, info, warn};

use crate::app::ports::{EdgeCapable, GpioBackend};
use crate::config::{EdgeDetection, Level};
use crate::error::{HardwareFault, TransientReadError};
use crate::events::{ButtonEdgeEvent, EdgeConsumer, drain_edges, edge_channel};
use crate::shutdown::{ShutdownLatch, ShutdownRequest, ShutdownSource};

/// Externally visible monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    PressedCandidate,
    ConfirmedPress,
    ReleaseCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    PressedCandidate { since_ms: u32 },
    ConfirmedPress,
    ReleaseCandidate { since_ms: u32 },
}

/// A debounced, qualified transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualified {
    Press,
    Release,
}

/// Record `next` unless a press is already pending this tick; a press
/// must reach the latch even if a release qualifies after it.
fn keep(slot: &mut Option<Qualified>, next: Option<Qualified>) {
    if next.is_some() && *slot != Some(Qualified::Press) {
        *slot = next;
    }
}

// ───────────────────────────────────────────────────────────────
// Debouncer (pure)
// ───────────────────────────────────────────────────────────────

/// Time-window debounce over raw active/inactive edges.
///
/// Hardware-free: feed it edges and clock ticks. All timestamps are
/// wrapping monotonic milliseconds.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u32,
    phase: Phase,
    active: bool,
}

impl Debouncer {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            phase: Phase::Idle,
            active: false,
        }
    }

    pub fn state(&self) -> MonitorState {
        match self.phase {
            Phase::Idle => MonitorState::Idle,
            Phase::PressedCandidate { .. } => MonitorState::PressedCandidate,
            Phase::ConfirmedPress => MonitorState::ConfirmedPress,
            Phase::ReleaseCandidate { .. } => MonitorState::ReleaseCandidate,
        }
    }

    /// Apply one raw edge. `active` is true when the line is now at the
    /// button's active level.
    ///
    /// Windows that had already elapsed by `at_ms` are settled first, so
    /// a queue drained late still qualifies a press that was stable long
    /// enough before it was released.
    pub fn on_edge(&mut self, active: bool, at_ms: u32) -> Option<Qualified> {
        let settled = self.settle(at_ms);
        self.active = active;
        self.phase = match (self.phase, active) {
            (Phase::Idle, true) | (Phase::PressedCandidate { .. }, true) => {
                Phase::PressedCandidate { since_ms: at_ms }
            }
            (Phase::Idle, false) | (Phase::PressedCandidate { .. }, false) => Phase::Idle,
            (Phase::ConfirmedPress, true) | (Phase::ReleaseCandidate { .. }, true) => {
                Phase::ConfirmedPress
            }
            (Phase::ConfirmedPress, false) | (Phase::ReleaseCandidate { .. }, false) => {
                Phase::ReleaseCandidate { since_ms: at_ms }
            }
        };
        settled
    }

    /// Advance the clock without a new edge.
    pub fn tick(&mut self, now_ms: u32) -> Option<Qualified> {
        self.settle(now_ms)
    }

    fn settle(&mut self, now_ms: u32) -> Option<Qualified> {
        match self.phase {
            Phase::PressedCandidate { since_ms }
                if self.active && now_ms.wrapping_sub(since_ms) >= self.window_ms =>
            {
                self.phase = Phase::ConfirmedPress;
                Some(Qualified::Press)
            }
            Phase::ReleaseCandidate { since_ms }
                if !self.active && now_ms.wrapping_sub(since_ms) >= self.window_ms =>
            {
                self.phase = Phase::Idle;
                Some(Qualified::Release)
            }
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ButtonMonitor (owns the input line)
// ───────────────────────────────────────────────────────────────

/// Outcome of one monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// A debounced press. `request` is `Some` only for the press that won
    /// the shutdown latch.
    Press { request: Option<ShutdownRequest> },
    Release,
}

pub struct ButtonMonitor<I: InputPin + EdgeCapable> {
    input: I,
    gpio: u8,
    active_level: Level,
    debouncer: Debouncer,
    edges: Option<EdgeConsumer>,
    last_raw: Option<bool>,
    consecutive_failures: u8,
    max_failures: u8,
    latch: ShutdownLatch,
}

/// Monitor construction parameters, taken from the controller config.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub active_level: Level,
    pub debounce_ms: u32,
    pub edge_detection: EdgeDetection,
    pub max_read_failures: u8,
}

impl<I: InputPin + EdgeCapable> ButtonMonitor<I> {
    /// Claim `gpio` from the backend and start monitoring it.
    pub fn initialize<B>(
        backend: &mut B,
        gpio: u8,
        settings: MonitorSettings,
        latch: ShutdownLatch,
    ) -> Result<Self, HardwareFault>
    where
        B: GpioBackend<Input = I>,
    {
        let input = backend.claim_input(gpio, settings.active_level)?;
        Self::from_pin(input, gpio, settings, latch)
    }

    pub fn from_pin(
        mut input: I,
        gpio: u8,
        settings: MonitorSettings,
        latch: ShutdownLatch,
    ) -> Result<Self, HardwareFault> {
        let edges = match settings.edge_detection {
            EdgeDetection::Poll => None,
            EdgeDetection::Interrupt => {
                let (producer, consumer) = edge_channel();
                if input.subscribe_to_edge(producer)? {
                    Some(consumer)
                } else {
                    warn!("button gpio{}: no edge interrupts, falling back to polling", gpio);
                    None
                }
            }
        };

        let mut monitor = Self {
            input,
            gpio,
            active_level: settings.active_level,
            debouncer: Debouncer::new(settings.debounce_ms),
            edges,
            last_raw: None,
            consecutive_failures: 0,
            max_failures: settings.max_read_failures,
            latch,
        };

        // Baseline level: a button held through boot is not an edge.
        match monitor.read_level() {
            Ok(high) => monitor.last_raw = Some(high),
            Err(e) => warn!("button {}; baseline deferred", e),
        }

        info!(
            "button gpio{}: monitoring (active {:?}, {} ms debounce, {})",
            gpio,
            settings.active_level,
            settings.debounce_ms,
            if monitor.edges.is_some() { "interrupt" } else { "poll" },
        );
        Ok(monitor)
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    pub fn state(&self) -> MonitorState {
        self.debouncer.state()
    }

    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive_failures
    }

    /// Call from the control loop every tick.
    ///
    /// Returns a debounced event, if any. Transient read failures are
    /// logged and treated as "no transition"; more than
    /// `max_read_failures` in a row escalate to a [`HardwareFault`].
    ///
    /// In interrupt mode the queued edges are replayed first, then the
    /// line is sampled: edges lost to a full queue or a disarmed interrupt
    /// leave the queue history behind the real level, and the sample
    /// resynchronises it.
    pub fn tick(&mut self, now_ms: u32) -> Result<Option<ButtonEvent>, HardwareFault> {
        let mut qualified = None;

        if let Some(edges) = self.edges.as_mut() {
            let active_level = self.active_level;
            let debouncer = &mut self.debouncer;
            let last_raw = &mut self.last_raw;
            drain_edges(edges, |ev: ButtonEdgeEvent| {
                let high = ev.edge.level_high();
                *last_raw = Some(high);
                let active = high == active_level.is_high();
                keep(&mut qualified, debouncer.on_edge(active, ev.at_ms));
            });
            if let Err(e) = self.input.rearm() {
                error!("button gpio{}: interrupt re-arm failed: {}", self.gpio, e);
                return Err(e);
            }
        }

        let sampled = self.sample(now_ms)?;
        keep(&mut qualified, sampled);
        keep(&mut qualified, self.debouncer.tick(now_ms));

        Ok(qualified.map(|q| self.qualify(q)))
    }

    /// Read the line once and feed a level change to the debouncer.
    fn sample(&mut self, now_ms: u32) -> Result<Option<Qualified>, HardwareFault> {
        match self.read_level() {
            Ok(high) => {
                self.consecutive_failures = 0;
                let changed = self.last_raw.is_some_and(|prev| prev != high);
                self.last_raw = Some(high);
                if !changed {
                    return Ok(None);
                }
                if self.edges.is_some() {
                    debug!("button gpio{}: missed edge, line now {}", self.gpio, high);
                }
                let active = high == self.active_level.is_high();
                Ok(self.debouncer.on_edge(active, now_ms))
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    "button {} ({}/{}), treating as no transition",
                    e, self.consecutive_failures, self.max_failures
                );
                if self.consecutive_failures > self.max_failures {
                    let fault = HardwareFault::ReadFailuresExceeded {
                        pin: self.gpio,
                        consecutive: self.consecutive_failures,
                    };
                    error!("button: {}", fault);
                    return Err(fault);
                }
                Ok(None)
            }
        }
    }

    fn qualify(&mut self, q: Qualified) -> ButtonEvent {
        match q {
            Qualified::Press => {
                let request = self.latch.raise(ShutdownSource::Button);
                if request.is_some() {
                    info!("button gpio{}: confirmed press, shutdown requested", self.gpio);
                } else {
                    debug!("button gpio{}: press ignored, shutdown already requested", self.gpio);
                }
                ButtonEvent::Press { request }
            }
            Qualified::Release => {
                debug!("button gpio{}: released", self.gpio);
                ButtonEvent::Release
            }
        }
    }

    fn read_level(&mut self) -> Result<bool, TransientReadError> {
        self.input.is_high().map_err(|e| TransientReadError {
            pin: self.gpio,
            kind: e.kind(),
        })
    }
}
