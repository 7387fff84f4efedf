//! Pump gate driver (logic-level MOSFET, low-side switch).
//!
//! Owns the single output line that energises the 12V pump.
//!
//! ## Safety contract
//!
//! - The line is driven off before [`PumpActuator::initialize`] returns,
//!   and again when the actuator is dropped.
//! - The committed [`ActuatorState`] only changes after a successful write,
//!   so `is_on()` never reports a level the gate was not driven to.
//! - A failed write marks the actuator faulted: it makes a best-effort
//!   off-write, reports `Off`, and refuses to energise again.
//! - [`PumpActuator::emergency_stop`] always writes, whatever the cached
//!   state says, and never fails.

use embedded_hal::digital::{Error as _, OutputPin, PinState};
use log::{error, info, warn};

use crate::app::ports::GpioBackend;
use crate::config::Level;
use crate::error::HardwareFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Off,
    On,
}

pub struct PumpActuator<P: OutputPin> {
    pin: P,
    gpio: u8,
    on_level: Level,
    state: ActuatorState,
    faulted: bool,
}

impl<P: OutputPin> PumpActuator<P> {
    /// Claim `gpio` from the backend and drive it off.
    ///
    /// Any failure here is fatal to the caller: a pump that cannot be
    /// guaranteed off must not run unattended.
    pub fn initialize<B>(backend: &mut B, gpio: u8, on_level: Level) -> Result<Self, HardwareFault>
    where
        B: GpioBackend<Output = P>,
    {
        let pin = backend.claim_output(gpio, on_level.inverse())?;
        Self::from_pin(pin, gpio, on_level)
    }

    /// Wrap an already-claimed output pin and drive it off.
    pub fn from_pin(pin: P, gpio: u8, on_level: Level) -> Result<Self, HardwareFault> {
        let mut pump = Self {
            pin,
            gpio,
            on_level,
            state: ActuatorState::Off,
            faulted: false,
        };
        pump.drive(ActuatorState::Off).inspect_err(|e| {
            error!("pump gpio{}: cannot drive off at init: {}", gpio, e);
        })?;
        info!("pump gpio{}: claimed, gate off (on-level {:?})", gpio, on_level);
        Ok(pump)
    }

    pub fn turn_on(&mut self) -> Result<(), HardwareFault> {
        if self.faulted {
            warn!("pump gpio{}: refusing turn_on while faulted", self.gpio);
            return Err(HardwareFault::ActuatorFaulted { pin: self.gpio });
        }
        self.set(ActuatorState::On)
    }

    pub fn turn_off(&mut self) -> Result<(), HardwareFault> {
        self.set(ActuatorState::Off)
    }

    pub fn is_on(&self) -> bool {
        self.state == ActuatorState::On
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    /// Force the gate off regardless of cached state or faults.
    pub fn emergency_stop(&mut self) {
        if let Err(e) = self.drive(ActuatorState::Off) {
            error!("pump gpio{}: emergency off-write failed: {}", self.gpio, e);
            self.faulted = true;
        }
        self.state = ActuatorState::Off;
    }

    fn set(&mut self, target: ActuatorState) -> Result<(), HardwareFault> {
        // A faulted line's level is unknown, so off is always re-driven.
        if self.state == target && !(self.faulted && target == ActuatorState::Off) {
            return Ok(());
        }

        match self.drive(target) {
            Ok(()) => {
                self.state = target;
                if target == ActuatorState::Off {
                    self.faulted = false;
                }
                Ok(())
            }
            Err(e) => {
                error!("pump gpio{}: write {:?} failed: {}", self.gpio, target, e);
                self.faulted = true;
                self.emergency_stop();
                Err(e)
            }
        }
    }

    fn drive(&mut self, target: ActuatorState) -> Result<(), HardwareFault> {
        let level = match target {
            ActuatorState::On => self.on_level,
            ActuatorState::Off => self.on_level.inverse(),
        };
        self.pin
            .set_state(PinState::from(level.is_high()))
            .map_err(|e| HardwareFault::Write {
                pin: self.gpio,
                kind: e.kind(),
            })
    }
}

impl<P: OutputPin> Drop for PumpActuator<P> {
    fn drop(&mut self) {
        self.emergency_stop();
    }
}
