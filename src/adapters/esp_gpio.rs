//! ESP32-S3 GPIO backend.
//!
//! Implements [`GpioBackend`] over `esp-idf-hal` pin drivers. Lines are
//! claimed by number from config; a process-wide bitmask tracks which
//! ones this crate already owns so a second claim fails with
//! [`HardwareFault::PinInUse`] instead of silently aliasing a driver.
//!
//! Input lines can raise an any-edge interrupt. The ISR stamps the edge
//! with the boot-relative millisecond timer, reads the new level, and
//! pushes a [`ButtonEdgeEvent`] into the SPSC queue; it does nothing
//! else. ESP-IDF disables a subscribed interrupt after it fires, so the
//! control task re-arms it after every drain; edges in between are lost
//! and the monitor recovers the level by sampling the line.

use core::sync::atomic::{AtomicU64, Ordering};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use esp_idf_hal::gpio::{
    AnyIOPin, AnyOutputPin, Input, InterruptType, Output, PinDriver, Pull,
};
use esp_idf_svc::sys::EspError;
use log::{error, info};

use crate::adapters::time::now_ms_since_boot;
use crate::app::ports::{EdgeCapable, GpioBackend};
use crate::config::Level;
use crate::error::HardwareFault;
use crate::events::{ButtonEdgeEvent, Edge, EdgeProducer, push_edge};
use crate::pins::ESP32_MAX_GPIO;

static CLAIMED: AtomicU64 = AtomicU64::new(0);

fn claim(gpio: u8) -> Result<(), HardwareFault> {
    if gpio > ESP32_MAX_GPIO {
        return Err(HardwareFault::InvalidPin { pin: gpio });
    }
    let bit = 1u64 << gpio;
    if CLAIMED.fetch_or(bit, Ordering::AcqRel) & bit != 0 {
        return Err(HardwareFault::PinInUse { pin: gpio });
    }
    Ok(())
}

fn release(gpio: u8) {
    CLAIMED.fetch_and(!(1u64 << gpio), Ordering::AcqRel);
}

fn claim_fault(gpio: u8, e: EspError) -> HardwareFault {
    error!("gpio{}: driver setup failed: {}", gpio, e);
    release(gpio);
    HardwareFault::Claim {
        pin: gpio,
        code: e.code(),
    }
}

// ── Output ────────────────────────────────────────────────────

type OutDriver = PinDriver<'static, AnyOutputPin, Output>;

pub struct EspOutputPin {
    driver: OutDriver,
    gpio: u8,
}

impl ErrorType for EspOutputPin {
    type Error = <OutDriver as ErrorType>::Error;
}

impl OutputPin for EspOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_low(&mut self.driver)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_high(&mut self.driver)
    }
}

impl Drop for EspOutputPin {
    fn drop(&mut self) {
        release(self.gpio);
    }
}

// ── Input ─────────────────────────────────────────────────────

type InDriver = PinDriver<'static, AnyIOPin, Input>;

pub struct EspInputPin {
    driver: InDriver,
    gpio: u8,
    subscribed: bool,
}

impl ErrorType for EspInputPin {
    type Error = <InDriver as ErrorType>::Error;
}

impl InputPin for EspInputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_high(&mut self.driver)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_low(&mut self.driver)
    }
}

impl EdgeCapable for EspInputPin {
    fn subscribe_to_edge(&mut self, mut producer: EdgeProducer) -> Result<bool, HardwareFault> {
        let gpio = self.gpio;
        let fault = |e: EspError| HardwareFault::Claim {
            pin: gpio,
            code: e.code(),
        };
        self.driver
            .set_interrupt_type(InterruptType::AnyEdge)
            .map_err(fault)?;

        // SAFETY: the closure only touches the SPSC producer it owns and two
        // ISR-safe register reads; no allocation, no locks.
        unsafe {
            self.driver
                .subscribe(move || {
                    let high = esp_idf_svc::sys::gpio_get_level(i32::from(gpio)) != 0;
                    let event = ButtonEdgeEvent {
                        edge: Edge::to_level(high),
                        at_ms: now_ms_since_boot(),
                    };
                    // A full queue drops the edge; the monitor's per-tick sample
                    // brings the level back in line.
                    let _ = push_edge(&mut producer, event);
                })
                .map_err(fault)?;
        }
        self.driver.enable_interrupt().map_err(fault)?;
        self.subscribed = true;
        info!("gpio{}: any-edge interrupt armed", gpio);
        Ok(true)
    }

    fn rearm(&mut self) -> Result<(), HardwareFault> {
        if !self.subscribed {
            return Ok(());
        }
        self.driver
            .enable_interrupt()
            .map_err(|e| HardwareFault::Claim {
                pin: self.gpio,
                code: e.code(),
            })
    }
}

impl Drop for EspInputPin {
    fn drop(&mut self) {
        if self.subscribed {
            let _ = self.driver.unsubscribe();
        }
        release(self.gpio);
    }
}

// ── Backend ───────────────────────────────────────────────────

/// [`GpioBackend`] over the ESP32-S3 GPIO matrix.
#[derive(Debug, Default)]
pub struct Esp32Backend;

impl Esp32Backend {
    pub fn new() -> Self {
        Self
    }
}

impl GpioBackend for Esp32Backend {
    type Output = EspOutputPin;
    type Input = EspInputPin;

    fn name(&self) -> &'static str {
        "esp32"
    }

    fn claim_output(&mut self, gpio: u8, initial: Level) -> Result<EspOutputPin, HardwareFault> {
        claim(gpio)?;
        // SAFETY: the CLAIMED registry makes this the only driver for the line.
        let pin = unsafe { AnyOutputPin::new(i32::from(gpio)) };
        let mut driver = PinDriver::output(pin).map_err(|e| claim_fault(gpio, e))?;
        let level = if initial.is_high() {
            driver.set_high()
        } else {
            driver.set_low()
        };
        level.map_err(|e| claim_fault(gpio, e))?;
        Ok(EspOutputPin { driver, gpio })
    }

    fn claim_input(&mut self, gpio: u8, active: Level) -> Result<EspInputPin, HardwareFault> {
        claim(gpio)?;
        // SAFETY: as above. Pull resistors need an IO-capable pin type.
        let pin = unsafe { AnyIOPin::new(i32::from(gpio)) };
        let mut driver = PinDriver::input(pin).map_err(|e| claim_fault(gpio, e))?;
        let pull = match active {
            Level::Low => Pull::Up,
            Level::High => Pull::Down,
        };
        driver.set_pull(pull).map_err(|e| claim_fault(gpio, e))?;
        Ok(EspInputPin {
            driver,
            gpio,
            subscribed: false,
        })
    }
}
