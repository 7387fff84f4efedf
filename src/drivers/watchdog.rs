//! Task watchdog for the control loop.
//!
//! On ESP-IDF the loop task subscribes to the TWDT and panics (which runs
//! the pump-off panic hook, then resets) if it stops feeding. Elsewhere the
//! service manager supervises the process and this is a no-op.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Subscribe the current task with a `timeout_ms` deadline.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the control task during startup.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("watchdog: reconfigure returned {} (already configured?)", ret);
                }

                let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
                if subscribed {
                    info!("watchdog: control task subscribed ({} ms)", timeout_ms);
                } else {
                    log::warn!("watchdog: subscribe failed, loop stalls will not reset");
                }
                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("watchdog(sim): {} ms deadline left to the service manager", timeout_ms);
            Self {}
        }
    }

    /// Call once per control-loop iteration.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the TWDT entry of the calling (subscribed) task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
