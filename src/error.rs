//! Unified error types for the Watershed controller.
//!
//! A single `Error` enum that every subsystem converts into, so the control
//! loop and startup path handle failures uniformly. All variants are `Copy`
//! so they can be passed through the service and event sink without
//! allocation.

use core::fmt;

use embedded_hal::digital::ErrorKind;

use crate::config::Backend;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A pin could not be claimed, read, or written.
    Hardware(HardwareFault),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A single input read failed; recoverable.
    TransientRead(TransientReadError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware fault: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::TransientRead(e) => write!(f, "transient read: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware faults
// ---------------------------------------------------------------------------

/// Unrecoverable pin failures.
///
/// Raised during initialization (fatal, startup aborts) or when repeated
/// read failures escalate at runtime (the pump is emergency-stopped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareFault {
    /// The pin number does not exist on this backend.
    InvalidPin { pin: u8 },
    /// Another driver already owns the pin.
    PinInUse { pin: u8 },
    /// The selected GPIO backend cannot run on this target.
    BackendUnavailable(Backend),
    /// The backend driver refused to configure the pin.
    Claim { pin: u8, code: i32 },
    /// The kernel refused a GPIO line request (Linux character device).
    LineRequest { pin: u8 },
    /// Driving an output pin failed.
    Write { pin: u8, kind: ErrorKind },
    /// The actuator lost track of its line level and refuses to energise.
    ActuatorFaulted { pin: u8 },
    /// Consecutive input reads failed past the configured threshold.
    ReadFailuresExceeded { pin: u8, consecutive: u8 },
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin { pin } => write!(f, "gpio{pin}: no such pin"),
            Self::PinInUse { pin } => write!(f, "gpio{pin}: already claimed"),
            Self::BackendUnavailable(b) => write!(f, "backend {b:?} unavailable on this target"),
            Self::Claim { pin, code } => write!(f, "gpio{pin}: claim failed (rc={code})"),
            Self::LineRequest { pin } => write!(f, "gpio{pin}: line request refused"),
            Self::Write { pin, kind } => write!(f, "gpio{pin}: write failed ({kind:?})"),
            Self::ActuatorFaulted { pin } => write!(f, "gpio{pin}: actuator faulted"),
            Self::ReadFailuresExceeded { pin, consecutive } => {
                write!(f, "gpio{pin}: {consecutive} consecutive read failures")
            }
        }
    }
}

impl core::error::Error for HardwareFault {}

impl From<HardwareFault> for Error {
    fn from(e: HardwareFault) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// An environment override could not be parsed.
    InvalidEnv(&'static str),
    /// Stored config failed deserialization.
    Corrupted,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::InvalidEnv(key) => write!(f, "invalid value for {key}"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Transient read errors
// ---------------------------------------------------------------------------

/// One failed input read. Absorbed by the button monitor and counted;
/// never triggers a shutdown by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientReadError {
    pub pin: u8,
    pub kind: ErrorKind,
}

impl fmt::Display for TransientReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}: read failed ({:?})", self.pin, self.kind)
    }
}

impl core::error::Error for TransientReadError {}

impl From<TransientReadError> for Error {
    fn from(e: TransientReadError) -> Self {
        Self::TransientRead(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
