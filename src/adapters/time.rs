//! Monotonic millisecond clock for the control loop.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer, the same source the edge ISR stamps
//!   events with.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant`.
//!
//! Readings are truncated to `u32` and wrap after ~49.7 days; consumers
//! compare them with `wrapping_sub`.

pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot, wrapping.
    #[cfg(target_os = "espidf")]
    pub fn now_ms(&self) -> u32 {
        now_ms_since_boot()
    }

    /// Milliseconds since this clock was created, wrapping.
    #[cfg(not(target_os = "espidf"))]
    pub fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Boot-relative milliseconds straight from the hardware timer. Safe to
/// call from ISR context.
#[cfg(target_os = "espidf")]
pub fn now_ms_since_boot() -> u32 {
    ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1_000) as u32
}
