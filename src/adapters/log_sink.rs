//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade: the ESP-IDF logger on the board (UART / USB-CDC),
//! the `tracing` fmt subscriber on a host. Lines are `TAG | key=value`
//! so they grep cleanly.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                backend,
                pump_gpio,
                button_gpio,
            } => match button_gpio {
                Some(btn) => info!(
                    "START | backend={:?} pump=gpio{} button=gpio{}",
                    backend, pump_gpio, btn
                ),
                None => info!(
                    "START | backend={:?} pump=gpio{} button=none",
                    backend, pump_gpio
                ),
            },
            AppEvent::PumpChanged { on, cause } => {
                info!("PUMP | {} cause={}", if *on { "on" } else { "off" }, cause);
            }
            AppEvent::ButtonPressed => info!("BUTTON | pressed"),
            AppEvent::ButtonReleased => info!("BUTTON | released"),
            AppEvent::ShutdownRequested(req) => {
                warn!("SHUTDOWN | requested source={:?}", req.source);
            }
            AppEvent::Fault(fault) => error!("FAULT | {}", fault),
            AppEvent::EmergencyStop { reason } => warn!("ESTOP | reason={}", reason),
            AppEvent::CommandRejected { command, reason } => {
                warn!("PUMP | rejected command={:?} reason={}", command, reason);
            }
        }
    }
}
