//! Application core: pure domain logic, zero direct I/O.
//!
//! Owns the pump-on/off rules, the shutdown flow, and the fail-safe paths.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer testable against the simulated board.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
