//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (GPIO backends, event sinks, config storage, host power
//! control) implement these traits. The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly and runs unchanged against the simulated board in tests.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{ControllerConfig, Level};
use crate::error::{ConfigError, HardwareFault};
use crate::events::EdgeProducer;

// ───────────────────────────────────────────────────────────────
// GPIO backend port (driven adapter: domain ↔ pin hardware)
// ───────────────────────────────────────────────────────────────

/// Edge-notification capability of an input line.
///
/// Backends that can raise interrupts hand every raw transition to the
/// producer half of an edge queue; lines that can only be polled return
/// `Ok(false)` and the monitor samples them with [`InputPin::is_high`].
pub trait EdgeCapable {
    /// Route raw transitions on this line into `producer`.
    fn subscribe_to_edge(&mut self, producer: EdgeProducer) -> Result<bool, HardwareFault>;

    /// Re-enable notification after the consumer drained the queue.
    /// Backends whose interrupts stay armed keep the default.
    fn rearm(&mut self) -> Result<(), HardwareFault> {
        Ok(())
    }
}

/// Pin factory: claims lines by number and hands back typed drivers.
///
/// A claimed pin stays owned until its driver is dropped; claiming it a
/// second time fails with [`HardwareFault::PinInUse`].
pub trait GpioBackend {
    type Output: OutputPin;
    type Input: InputPin + EdgeCapable;

    fn name(&self) -> &'static str;

    /// Claim `gpio` as a push-pull output, initially driven to `initial`.
    fn claim_output(&mut self, gpio: u8, initial: Level) -> Result<Self::Output, HardwareFault>;

    /// Claim `gpio` as an input biased to the inverse of `active`.
    fn claim_input(&mut self, gpio: u8, active: Level) -> Result<Self::Input, HardwareFault>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate before persisting; invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Load configuration. Returns [`ControllerConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Host port (driven adapter: domain → power / process control)
// ───────────────────────────────────────────────────────────────

/// Powers the host down after an orderly button shutdown.
pub trait HostPort {
    fn halt(&mut self) -> Result<(), HostError>;
}

/// Errors from [`HostPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// The halt command could not be started.
    SpawnFailed,
    /// The halt command ran and exited non-zero.
    CommandFailed(i32),
}

impl core::fmt::Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpawnFailed => write!(f, "halt command could not be started"),
            Self::CommandFailed(code) => write!(f, "halt command exited with {}", code),
        }
    }
}

impl core::error::Error for HostError {}
