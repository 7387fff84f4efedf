//! Watershed pump controller library.
//!
//! Exposes the domain core, drivers, and adapters for the binary and for
//! integration testing. ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; everything else
//! runs on a host against the simulated board.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;
pub mod shutdown;
