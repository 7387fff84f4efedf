//! Inbound commands to the application service.
//!
//! These are the requests an external driver (manual switch, timer, a
//! future scheduler) makes of the pump. The service is the only thing
//! that turns them into pin writes.
//!
//! The `watershed` binary has no command source of its own: it applies
//! `manual_on` at startup and otherwise reacts to the button and to
//! termination signals. [`AppService::handle_command`] is the library
//! entry point for drivers that embed the service.
//!
//! [`AppService::handle_command`]: super::service::AppService::handle_command

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Energise the pump.
    PumpOn,

    /// De-energise the pump.
    PumpOff,

    /// Flip the current pump state.
    TogglePump,

    /// Force the pump off immediately, bypassing the normal path.
    EmergencyStop,

    /// Request an orderly shutdown of the controller.
    Shutdown,
}
