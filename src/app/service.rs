//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the pump actuator, the optional button monitor, and
//! the shutdown latch. Every pin write goes through it from the single
//! control task; interrupt and signal contexts only feed the edge queue
//! and the latch.
//!
//! ```text
//!  GpioBackend ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                  │        AppService        │
//!  AppCommand  ──▶ │  PumpActuator · Button   │
//!                  └──────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::config::ControllerConfig;
use crate::drivers::button::{ButtonEvent, ButtonMonitor, MonitorSettings};
use crate::drivers::pump::PumpActuator;
use crate::error::{Error, HardwareFault};
use crate::shutdown::{ShutdownLatch, ShutdownRequest, ShutdownSource};

use super::commands::AppCommand;
use super::events::{AppEvent, ControllerStatus};
use super::ports::{EventSink, GpioBackend, HostError, HostPort};

/// What the control loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Stop looping and run the orderly shutdown.
    Shutdown(ShutdownRequest),
    /// The pump has been emergency-stopped; exit with an error.
    Fault(HardwareFault),
}

pub struct AppService<B: GpioBackend> {
    pump: PumpActuator<B::Output>,
    button: Option<ButtonMonitor<B::Input>>,
    latch: ShutdownLatch,
    tick_count: u64,
    fault: Option<HardwareFault>,
    shutdown_announced: bool,
}

impl<B: GpioBackend> AppService<B> {
    // ── Lifecycle ─────────────────────────────────────────────

    /// Validate the config, claim pins, and verify the pump is off.
    ///
    /// Any error aborts startup before the pump can be energised. If the
    /// button cannot be claimed the already-claimed pump is dropped, which
    /// drives it off again.
    pub fn start(
        config: &ControllerConfig,
        backend: &mut B,
        latch: ShutdownLatch,
        sink: &mut impl EventSink,
    ) -> Result<Self, Error> {
        config.validate().inspect_err(|e| error!("config rejected: {}", e))?;
        if !config.backend.is_available() {
            let fault = HardwareFault::BackendUnavailable(config.backend);
            error!("startup: {}", fault);
            return Err(fault.into());
        }

        info!(
            "startup: backend={} pump=gpio{} button={:?}",
            backend.name(),
            config.pin_out,
            config.pin_in
        );

        let pump = PumpActuator::initialize(backend, config.pin_out, config.pump_active_level)
            .inspect_err(|e| error!("startup: pump init failed: {}", e))?;

        let button = match config.pin_in {
            Some(gpio) => {
                let settings = MonitorSettings {
                    active_level: config.active_level,
                    debounce_ms: config.debounce_ms,
                    edge_detection: config.edge_detection,
                    max_read_failures: config.max_read_failures,
                };
                let monitor = ButtonMonitor::initialize(backend, gpio, settings, latch.clone())
                    .inspect_err(|e| error!("startup: button init failed: {}", e))?;
                Some(monitor)
            }
            None => {
                info!("startup: no shutdown button configured");
                None
            }
        };

        let mut service = Self {
            pump,
            button,
            latch,
            tick_count: 0,
            fault: None,
            shutdown_announced: false,
        };

        sink.emit(&AppEvent::Started {
            backend: config.backend,
            pump_gpio: config.pin_out,
            button_gpio: config.pin_in,
        });

        if config.manual_on {
            service.set_pump(true, "manual_on", sink)?;
        }

        Ok(service)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: button → latch → outcome.
    pub fn tick(&mut self, now_ms: u32, sink: &mut impl EventSink) -> TickOutcome {
        self.tick_count += 1;

        if let Some(fault) = self.fault {
            return TickOutcome::Fault(fault);
        }

        if let Some(button) = self.button.as_mut() {
            match button.tick(now_ms) {
                Ok(Some(ButtonEvent::Press { .. })) => sink.emit(&AppEvent::ButtonPressed),
                Ok(Some(ButtonEvent::Release)) => sink.emit(&AppEvent::ButtonReleased),
                Ok(None) => {}
                Err(fault) => {
                    self.fail(fault, sink);
                    return TickOutcome::Fault(fault);
                }
            }
        }

        if let Some(request) = self.latch.requested() {
            if !self.shutdown_announced {
                self.shutdown_announced = true;
                warn!("shutdown requested by {:?}", request.source);
                sink.emit(&AppEvent::ShutdownRequested(request));
            }
            return TickOutcome::Shutdown(request);
        }

        TickOutcome::Continue
    }

    // ── Commands ──────────────────────────────────────────────

    /// Handle an external command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        sink: &mut impl EventSink,
    ) -> Result<(), HardwareFault> {
        info!("command: {:?}", cmd);
        match cmd {
            AppCommand::PumpOn => self.command_pump(cmd, true, sink),
            AppCommand::PumpOff => self.command_pump(cmd, false, sink),
            AppCommand::TogglePump => {
                let target = !self.pump.is_on();
                self.command_pump(cmd, target, sink)
            }
            AppCommand::EmergencyStop => {
                self.emergency_stop("command", sink);
                Ok(())
            }
            AppCommand::Shutdown => {
                if self.latch.raise(ShutdownSource::Command).is_none() {
                    sink.emit(&AppEvent::CommandRejected {
                        command: cmd,
                        reason: "shutdown already requested",
                    });
                }
                Ok(())
            }
        }
    }

    fn command_pump(
        &mut self,
        cmd: AppCommand,
        on: bool,
        sink: &mut impl EventSink,
    ) -> Result<(), HardwareFault> {
        if on {
            let reason = if self.fault.is_some() {
                Some("controller faulted")
            } else if self.latch.is_raised() {
                Some("shutdown in progress")
            } else {
                None
            };
            if let Some(reason) = reason {
                warn!("command {:?} rejected: {}", cmd, reason);
                sink.emit(&AppEvent::CommandRejected { command: cmd, reason });
                return Ok(());
            }
        }
        self.set_pump(on, "command", sink)
    }

    fn set_pump(
        &mut self,
        on: bool,
        cause: &'static str,
        sink: &mut impl EventSink,
    ) -> Result<(), HardwareFault> {
        let was_on = self.pump.is_on();
        let result = if on { self.pump.turn_on() } else { self.pump.turn_off() };
        if let Err(fault) = result {
            error!("pump gpio{}: {} failed: {}", self.pump.gpio(), cause, fault);
            sink.emit(&AppEvent::Fault(fault));
            if was_on {
                sink.emit(&AppEvent::PumpChanged { on: false, cause: "write fault" });
            }
            return Err(fault);
        }
        if was_on != on {
            sink.emit(&AppEvent::PumpChanged { on, cause });
        }
        Ok(())
    }

    // ── Fail-safe paths ───────────────────────────────────────

    /// Force the pump off. Never fails; write errors are logged.
    pub fn emergency_stop(&mut self, reason: &'static str, sink: &mut impl EventSink) {
        let was_on = self.pump.is_on();
        self.pump.emergency_stop();
        warn!("pump gpio{}: emergency stop ({})", self.pump.gpio(), reason);
        sink.emit(&AppEvent::EmergencyStop { reason });
        if was_on {
            sink.emit(&AppEvent::PumpChanged { on: false, cause: reason });
        }
    }

    /// Orderly shutdown: turn the pump off, falling back to an emergency
    /// stop if the normal write fails.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) {
        if self.set_pump(false, "shutdown", sink).is_err() {
            self.emergency_stop("shutdown write failed", sink);
        }
        info!("shutdown: pump off, {} ticks run", self.tick_count);
    }

    /// Take the controller down for `request` and release both pins.
    ///
    /// A termination signal gets the emergency stop, button and command
    /// requests the orderly path. Only a button press halts the host.
    pub fn finish(
        mut self,
        request: ShutdownRequest,
        host: &mut impl HostPort,
        sink: &mut impl EventSink,
    ) -> Result<(), HostError> {
        match request.source {
            ShutdownSource::Signal => self.emergency_stop("termination signal", sink),
            ShutdownSource::Button | ShutdownSource::Command => self.shutdown(sink),
        }
        drop(self);
        if request.source == ShutdownSource::Button {
            host.halt().inspect_err(|e| error!("host halt failed: {}", e))?;
        }
        Ok(())
    }

    fn fail(&mut self, fault: HardwareFault, sink: &mut impl EventSink) {
        error!("runtime hardware fault: {}", fault);
        self.fault = Some(fault);
        sink.emit(&AppEvent::Fault(fault));
        self.emergency_stop("hardware fault", sink);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_pump_on(&self) -> bool {
        self.pump.is_on()
    }

    pub fn latch(&self) -> &ShutdownLatch {
        &self.latch
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            pump_on: self.pump.is_on(),
            pump_faulted: self.pump.is_faulted(),
            button: self.button.as_ref().map(ButtonMonitor::state),
            read_failures: self
                .button
                .as_ref()
                .map_or(0, ButtonMonitor::consecutive_failures),
            shutdown_requested: self.latch.is_raised(),
            ticks: self.tick_count,
        }
    }
}
