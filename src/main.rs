//! Watershed pump controller: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  Esp32Backend / LinuxBackend LogEventSink   NvsAdapter /     │
//! │  / SimBackend (GpioBackend)  (EventSink)    FileConfigStore  │
//! │  SystemHost (HostPort)       MonotonicClock (ConfigPort)     │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            AppService (pure logic)                     │  │
//! │  │  PumpActuator · ButtonMonitor · ShutdownLatch          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Control loop: watchdog · signals · tick · sleep             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};

use watershed::adapters::host::{self, SystemHost};
use watershed::adapters::log_sink::LogEventSink;
use watershed::adapters::sim::{SimBackend, SimBoard};
use watershed::adapters::time::MonotonicClock;
use watershed::app::ports::{ConfigPort, GpioBackend, HostPort};
use watershed::app::service::{AppService, TickOutcome};
use watershed::config::{Backend, ControllerConfig};
use watershed::diagnostics;
use watershed::drivers::watchdog::Watchdog;
use watershed::error::HardwareFault;
use watershed::shutdown::{ShutdownLatch, ShutdownSource};

/// Control-loop stall that resets the board.
const WATCHDOG_TIMEOUT_MS: u32 = 5_000;

// ── Logging ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_logging() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_logging() -> Result<()> {
    use tracing_subscriber::filter::LevelFilter;

    let level = std::env::var("WATERSHED_LOG")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
    Ok(())
}

// ── Configuration ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn config_store() -> Result<impl ConfigPort> {
    watershed::adapters::nvs::NvsAdapter::new().context("initialising NVS")
}

#[cfg(not(target_os = "espidf"))]
fn config_store() -> Result<impl ConfigPort> {
    Ok(watershed::adapters::config_file::FileConfigStore::from_env())
}

/// Defaults → persisted store → environment, validated once.
fn load_config() -> Result<ControllerConfig> {
    let store = config_store()?;
    let mut config = store.load().context("loading stored config")?;
    config
        .apply_env(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
        .context("applying environment overrides")?;
    config.validate().context("validating config")?;
    Ok(config)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging()?;
    info!("watershed v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!("config: {:?}", config);
    diagnostics::install_panic_handler(config.pin_out, config.pump_active_level);

    if !host::install_signal_handlers() && cfg!(not(target_os = "espidf")) {
        warn!("termination signals will not stop the pump cleanly");
    }

    let latch = ShutdownLatch::new();
    let mut host = SystemHost::new(config.halt_command.clone());

    match config.backend {
        Backend::Sim => {
            warn!("simulated GPIO backend: the pump and button are not connected");
            run(SimBackend::new(SimBoard::new()), &config, latch, &mut host)
        }
        #[cfg(target_os = "espidf")]
        Backend::Esp32 => run(
            watershed::adapters::esp_gpio::Esp32Backend::new(),
            &config,
            latch,
            &mut host,
        ),
        #[cfg(not(target_os = "espidf"))]
        Backend::Esp32 => unavailable(Backend::Esp32),
        #[cfg(target_os = "linux")]
        Backend::Linux => {
            let backend = watershed::adapters::linux_gpio::LinuxBackend::open(&config.gpio_chip)
                .map_err(watershed::error::Error::from)
                .with_context(|| format!("opening {}", config.gpio_chip))?;
            run(backend, &config, latch, &mut host)
        }
        #[cfg(not(target_os = "linux"))]
        Backend::Linux => unavailable(Backend::Linux),
    }
}

fn unavailable(backend: Backend) -> Result<()> {
    Err(watershed::error::Error::from(HardwareFault::BackendUnavailable(backend)))
        .context("selecting GPIO backend (set WATERSHED_BACKEND=sim for a dry run)")
}

/// Start the service on `backend` and run the control loop to completion.
fn run<B: GpioBackend>(
    mut backend: B,
    config: &ControllerConfig,
    latch: ShutdownLatch,
    host: &mut impl HostPort,
) -> Result<()> {
    let mut sink = LogEventSink::new();
    let mut app = AppService::start(config, &mut backend, latch.clone(), &mut sink)
        .context("starting pump controller")?;

    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT_MS);
    let clock = MonotonicClock::new();
    let period = Duration::from_millis(u64::from(config.poll_interval_ms));
    info!("ready, control loop every {} ms", config.poll_interval_ms);

    let request = loop {
        watchdog.feed();
        if host::take_signal() {
            latch.raise(ShutdownSource::Signal);
        }
        match app.tick(clock.now_ms(), &mut sink) {
            TickOutcome::Continue => {}
            TickOutcome::Shutdown(request) => break request,
            TickOutcome::Fault(fault) => {
                error!("halting on fault, status {:?}", app.status());
                return Err(watershed::error::Error::from(fault))
                    .context("control loop stopped");
            }
        }
        std::thread::sleep(period);
    };

    app.finish(request, host, &mut sink).context("halting host")?;
    info!("stopped");
    Ok(())
}
