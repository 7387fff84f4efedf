//! Default GPIO assignments and per-backend pin ranges.
//!
//! Wiring follows the irrigation board: the pump gate drives a logic-level
//! N-channel MOSFET on the low side of the 12V pump, and the shutdown
//! button pulls its input to ground against a pull-up.

// ---------------------------------------------------------------------------
// Pump (MOSFET low-side switch)
// ---------------------------------------------------------------------------

/// Digital output to the MOSFET gate. HIGH = pump energised.
pub const PUMP_GATE_GPIO: u8 = 18;

// ---------------------------------------------------------------------------
// Shutdown button (active-low with pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button on a Raspberry Pi header (BCM numbering). BCM 3
/// carries a fixed pull-up, and a press also wakes a halted Pi.
pub const SHUTDOWN_BUTTON_GPIO: u8 = 3;

/// Shutdown button on the ESP32-S3. GPIO 0, 3, 45 and 46 are strapping
/// pins, so the button sits on a plain IO.
pub const ESP32_SHUTDOWN_BUTTON_GPIO: u8 = 4;

// ---------------------------------------------------------------------------
// Pin ranges
// ---------------------------------------------------------------------------

/// Highest GPIO number exposed by the ESP32-S3.
pub const ESP32_MAX_GPIO: u8 = 48;
/// Highest line offset the Linux backend claims (one `u64` bitmask).
pub const LINUX_MAX_GPIO: u8 = 63;
/// Highest line number the simulated board models (one `u64` bitmask).
pub const SIM_MAX_GPIO: u8 = 63;
