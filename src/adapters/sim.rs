//! Simulated GPIO board.
//!
//! Backs the [`GpioBackend`] port with an in-memory model so the controller
//! runs on a development host and in tests. Tests keep a [`SimBoard`]
//! handle to flip inputs, inject read/write failures, and observe the level
//! the pump gate was driven to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

use crate::app::ports::{EdgeCapable, GpioBackend};
use crate::config::Level;
use crate::error::HardwareFault;
use crate::events::{ButtonEdgeEvent, Edge, EdgeProducer, push_edge};
use crate::pins::SIM_MAX_GPIO;

const LINES: usize = SIM_MAX_GPIO as usize + 1;

struct BoardState {
    claimed: u64,
    configured: u64,
    levels: u64,
    write_faults: u64,
    /// Remaining reads that fail, per line. `u32::MAX` never runs out.
    read_faults: [u32; LINES],
    writes: [u32; LINES],
    subscribers: Vec<(u8, EdgeProducer)>,
}

impl BoardState {
    fn new() -> Self {
        Self {
            claimed: 0,
            configured: 0,
            levels: 0,
            write_faults: 0,
            read_faults: [0; LINES],
            writes: [0; LINES],
            subscribers: Vec::new(),
        }
    }

    fn set_level(&mut self, gpio: u8, high: bool) {
        let bit = 1u64 << gpio;
        self.configured |= bit;
        if high {
            self.levels |= bit;
        } else {
            self.levels &= !bit;
        }
    }

    fn level(&self, gpio: u8) -> bool {
        self.levels & (1u64 << gpio) != 0
    }
}

/// Shared handle to the simulated board. Clones observe the same lines.
#[derive(Clone)]
pub struct SimBoard {
    inner: Arc<Mutex<BoardState>>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BoardState::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current level of a line, `None` if nothing ever configured it.
    pub fn level(&self, gpio: u8) -> Option<bool> {
        let s = self.state();
        (gpio <= SIM_MAX_GPIO && s.configured & (1u64 << gpio) != 0).then(|| s.level(gpio))
    }

    pub fn is_claimed(&self, gpio: u8) -> bool {
        gpio <= SIM_MAX_GPIO && self.state().claimed & (1u64 << gpio) != 0
    }

    /// Number of successful output writes to a line since boot.
    pub fn write_count(&self, gpio: u8) -> u32 {
        self.state().writes.get(gpio as usize).copied().unwrap_or(0)
    }

    /// Make every write to `gpio` fail (or succeed again).
    pub fn fail_writes(&self, gpio: u8, fail: bool) {
        let mut s = self.state();
        if fail {
            s.write_faults |= 1u64 << gpio;
        } else {
            s.write_faults &= !(1u64 << gpio);
        }
    }

    /// Make the next `count` reads of `gpio` fail.
    pub fn fail_reads(&self, gpio: u8, count: u32) {
        if let Some(slot) = self.state().read_faults.get_mut(gpio as usize) {
            *slot = count;
        }
    }

    /// Drive an input line from outside, as the button contacts would.
    ///
    /// A change of level is reported to any edge subscriber with the given
    /// timestamp.
    pub fn set_input(&self, gpio: u8, high: bool, at_ms: u32) {
        if gpio > SIM_MAX_GPIO {
            return;
        }
        let mut s = self.state();
        let changed = s.level(gpio) != high || s.configured & (1u64 << gpio) == 0;
        s.set_level(gpio, high);
        if !changed {
            return;
        }
        let event = ButtonEdgeEvent {
            edge: Edge::to_level(high),
            at_ms,
        };
        for (line, producer) in &mut s.subscribers {
            if *line == gpio && !push_edge(producer, event) {
                log::warn!("sim gpio{}: edge queue full, edge dropped", gpio);
            }
        }
    }

    /// Change an input line without notifying edge subscribers, as when
    /// an interrupt fires while disarmed or the edge queue is full.
    pub fn set_input_unreported(&self, gpio: u8, high: bool) {
        if gpio <= SIM_MAX_GPIO {
            self.state().set_level(gpio, high);
        }
    }

    fn claim(&self, gpio: u8) -> Result<(), HardwareFault> {
        if gpio > SIM_MAX_GPIO {
            return Err(HardwareFault::InvalidPin { pin: gpio });
        }
        let mut s = self.state();
        let bit = 1u64 << gpio;
        if s.claimed & bit != 0 {
            return Err(HardwareFault::PinInUse { pin: gpio });
        }
        s.claimed |= bit;
        Ok(())
    }

    fn release(&self, gpio: u8) {
        let mut s = self.state();
        s.claimed &= !(1u64 << gpio);
        s.subscribers.retain(|(line, _)| *line != gpio);
    }

    fn write(&self, gpio: u8, high: bool) -> Result<(), SimPinError> {
        let mut s = self.state();
        if s.write_faults & (1u64 << gpio) != 0 {
            return Err(SimPinError);
        }
        s.set_level(gpio, high);
        s.writes[gpio as usize] = s.writes[gpio as usize].saturating_add(1);
        Ok(())
    }

    fn read(&self, gpio: u8) -> Result<bool, SimPinError> {
        let mut s = self.state();
        let remaining = s.read_faults[gpio as usize];
        if remaining > 0 {
            if remaining != u32::MAX {
                s.read_faults[gpio as usize] = remaining - 1;
            }
            return Err(SimPinError);
        }
        Ok(s.level(gpio))
    }
}

/// The only failure a simulated line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

// ── Pins ──────────────────────────────────────────────────────

pub struct SimOutputPin {
    board: SimBoard,
    gpio: u8,
}

impl ErrorType for SimOutputPin {
    type Error = SimPinError;
}

impl OutputPin for SimOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.board.write(self.gpio, false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.board.write(self.gpio, true)
    }
}

impl Drop for SimOutputPin {
    fn drop(&mut self) {
        self.board.release(self.gpio);
    }
}

pub struct SimInputPin {
    board: SimBoard,
    gpio: u8,
}

impl ErrorType for SimInputPin {
    type Error = SimPinError;
}

impl InputPin for SimInputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.board.read(self.gpio)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.board.read(self.gpio).map(|high| !high)
    }
}

impl EdgeCapable for SimInputPin {
    fn subscribe_to_edge(&mut self, producer: EdgeProducer) -> Result<bool, HardwareFault> {
        self.board.state().subscribers.push((self.gpio, producer));
        Ok(true)
    }
}

impl Drop for SimInputPin {
    fn drop(&mut self) {
        self.board.release(self.gpio);
    }
}

// ── Backend ───────────────────────────────────────────────────

/// [`GpioBackend`] over a [`SimBoard`].
pub struct SimBackend {
    board: SimBoard,
}

impl SimBackend {
    pub fn new(board: SimBoard) -> Self {
        Self { board }
    }
}

impl GpioBackend for SimBackend {
    type Output = SimOutputPin;
    type Input = SimInputPin;

    fn name(&self) -> &'static str {
        "sim"
    }

    fn claim_output(&mut self, gpio: u8, initial: Level) -> Result<SimOutputPin, HardwareFault> {
        self.board.claim(gpio)?;
        self.board.state().set_level(gpio, initial.is_high());
        Ok(SimOutputPin {
            board: self.board.clone(),
            gpio,
        })
    }

    fn claim_input(&mut self, gpio: u8, active: Level) -> Result<SimInputPin, HardwareFault> {
        self.board.claim(gpio)?;
        // Pull resistor holds the line at its inactive level.
        {
            let mut s = self.board.state();
            if s.configured & (1u64 << gpio) == 0 {
                s.set_level(gpio, active.inverse().is_high());
            }
        }
        Ok(SimInputPin {
            board: self.board.clone(),
            gpio,
        })
    }
}
