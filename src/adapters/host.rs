//! Host power and process-lifecycle adapter.
//!
//! - [`SystemHost`] implements [`HostPort`]: on a Linux host it runs the
//!   configured halt command (e.g. `sudo halt`); on the ESP32 it enters
//!   deep sleep with no wake source armed.
//! - [`install_signal_handlers`] / [`take_signal`] turn SIGTERM and SIGINT
//!   into a flag the control loop polls. The handler only stores to an
//!   atomic; everything else happens on the control task.

use core::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::app::ports::{HostError, HostPort};

static SIGNALLED: AtomicBool = AtomicBool::new(false);

// ── Termination signals ───────────────────────────────────────

#[cfg(all(unix, not(target_os = "espidf")))]
extern "C" fn on_termination_signal(_signum: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Route SIGTERM and SIGINT to the termination flag.
///
/// Returns `false` if a handler could not be installed; the process then
/// keeps the default disposition for that signal.
#[cfg(all(unix, not(target_os = "espidf")))]
pub fn install_signal_handlers() -> bool {
    let handler = on_termination_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    let mut ok = true;
    for sig in [libc::SIGTERM, libc::SIGINT] {
        // SAFETY: the handler is async-signal-safe (a single atomic store).
        if unsafe { libc::signal(sig, handler) } == libc::SIG_ERR {
            log::warn!("signal {}: handler not installed", sig);
            ok = false;
        }
    }
    ok
}

/// No process signals on this target.
#[cfg(not(all(unix, not(target_os = "espidf"))))]
pub fn install_signal_handlers() -> bool {
    false
}

/// Consume a pending termination signal.
pub fn take_signal() -> bool {
    SIGNALLED.swap(false, Ordering::SeqCst)
}

// ── Halt ──────────────────────────────────────────────────────

pub struct SystemHost {
    #[cfg_attr(target_os = "espidf", allow(dead_code))]
    halt_command: Option<heapless::String<64>>,
}

impl SystemHost {
    pub fn new(halt_command: Option<heapless::String<64>>) -> Self {
        Self { halt_command }
    }
}

impl HostPort for SystemHost {
    #[cfg(target_os = "espidf")]
    fn halt(&mut self) -> Result<(), HostError> {
        info!("host: entering deep sleep, no wake source");
        // SAFETY: the pump line is already driven off; nothing else runs.
        unsafe {
            esp_idf_svc::sys::esp_deep_sleep_start();
        }
        #[allow(unreachable_code)]
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn halt(&mut self) -> Result<(), HostError> {
        let Some(command) = self.halt_command.as_deref() else {
            info!("host: no halt command configured, exiting only");
            return Ok(());
        };
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(HostError::SpawnFailed);
        };
        info!("host: running `{}`", command);
        let status = std::process::Command::new(program)
            .args(parts)
            .status()
            .map_err(|e| {
                log::warn!("host: `{}` could not start: {}", command, e);
                HostError::SpawnFailed
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(HostError::CommandFailed(status.code().unwrap_or(-1)))
        }
    }
}
