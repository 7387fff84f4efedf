//! Pump gate driver, shutdown button monitor, and the loop watchdog.

pub mod button;
pub mod pump;
pub mod watchdog;
