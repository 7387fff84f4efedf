//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them.

use super::commands::AppCommand;
use crate::config::Backend;
use crate::error::HardwareFault;
use crate::shutdown::ShutdownRequest;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Pins are claimed and the pump gate is verified off.
    Started {
        backend: Backend,
        pump_gpio: u8,
        button_gpio: Option<u8>,
    },

    /// The pump gate changed state.
    PumpChanged { on: bool, cause: &'static str },

    /// A debounced button press (whether or not it won the shutdown latch).
    ButtonPressed,

    /// A debounced button release.
    ButtonReleased,

    /// The one shutdown request of this process was raised.
    ShutdownRequested(ShutdownRequest),

    /// A hardware fault was detected at runtime.
    Fault(HardwareFault),

    /// The pump was forced off outside the normal command path.
    EmergencyStop { reason: &'static str },

    /// A command was refused.
    CommandRejected {
        command: AppCommand,
        reason: &'static str,
    },
}

/// Point-in-time controller status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub pump_on: bool,
    pub pump_faulted: bool,
    pub button: Option<crate::drivers::button::MonitorState>,
    pub read_failures: u8,
    pub shutdown_requested: bool,
    pub ticks: u64,
}
