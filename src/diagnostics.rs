//! Panic-time fail-safe.
//!
//! A panic anywhere in the control task must not leave the pump running.
//! The hook installed here drives the pump gate to its off level with a
//! raw register write (no driver, no allocation), logs the reason, then
//! hands over to the previous hook (abort/reset on the board, the normal
//! report on a host).

use std::any::Any;

use crate::config::Level;

/// Best-effort panic message from a panic payload.
pub fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

/// Install the pump-off panic hook for the gate on `pump_gpio`.
///
/// Call once, after the pump line has been configured as an output.
pub fn install_panic_handler(pump_gpio: u8, pump_active_level: Level) {
    let off_high = pump_active_level.inverse().is_high();
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        force_gate_off(pump_gpio, off_high);
        log::error!(
            "PANIC | {} | pump gpio{} forced {}",
            panic_reason(info.payload()),
            pump_gpio,
            if off_high { "high" } else { "low" }
        );
        previous(info);
    }));
}

#[cfg(target_os = "espidf")]
fn force_gate_off(gpio: u8, high: bool) {
    // SAFETY: gpio_set_level is a single register write on a line that is
    // already configured as an output; safe from panic context.
    unsafe {
        esp_idf_svc::sys::gpio_set_level(i32::from(gpio), u32::from(high));
    }
}

/// The simulated board lives in this process and goes away with it.
#[cfg(not(target_os = "espidf"))]
fn force_gate_off(_gpio: u8, _high: bool) {}
