//! Linux GPIO character-device backend.
//!
//! Implements [`GpioBackend`] over `/dev/gpiochipN` with
//! `linux-embedded-hal`'s [`CdevPin`], which already speaks the
//! `embedded-hal` pin traits. The kernel refuses a line that another
//! process holds; a process-wide bitmask turns a second local claim into
//! [`HardwareFault::PinInUse`] before the kernel is asked.
//!
//! The line-handle ABI used here cannot set bias, so the button needs a
//! pull resistor on the board. BCM 3 on the Raspberry Pi header has a
//! fixed pull-up. Inputs are polled: edge events are not routed into the
//! monitor, and `subscribe_to_edge` reports no interrupt support.

use core::sync::atomic::{AtomicU64, Ordering};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use linux_embedded_hal::CdevPin;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags, errors::Error as CdevError};
use log::{error, info};

use crate::app::ports::{EdgeCapable, GpioBackend};
use crate::config::{Backend, Level};
use crate::error::HardwareFault;
use crate::events::EdgeProducer;
use crate::pins::LINUX_MAX_GPIO;

/// Consumer label `gpioinfo` shows for lines this process holds.
const CONSUMER: &str = "watershed";

static CLAIMED: AtomicU64 = AtomicU64::new(0);

fn claim(gpio: u8) -> Result<(), HardwareFault> {
    if gpio > LINUX_MAX_GPIO {
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

fn request_fault(gpio: u8, e: &CdevError) -> HardwareFault {
    error!("gpio{}: line request failed: {}", gpio, e);
    release(gpio);
    HardwareFault::LineRequest { pin: gpio }
}

// ── Pins ──────────────────────────────────────────────────────

pub struct LinuxOutputPin {
    pin: CdevPin,
    gpio: u8,
}

impl ErrorType for LinuxOutputPin {
    type Error = <CdevPin as ErrorType>::Error;
}

impl OutputPin for LinuxOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_low(&mut self.pin)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_high(&mut self.pin)
    }
}

impl Drop for LinuxOutputPin {
    fn drop(&mut self) {
        release(self.gpio);
    }
}

pub struct LinuxInputPin {
    pin: CdevPin,
    gpio: u8,
}

impl ErrorType for LinuxInputPin {
    type Error = <CdevPin as ErrorType>::Error;
}

impl InputPin for LinuxInputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_high(&mut self.pin)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_low(&mut self.pin)
    }
}

impl EdgeCapable for LinuxInputPin {
    fn subscribe_to_edge(&mut self, _producer: EdgeProducer) -> Result<bool, HardwareFault> {
        Ok(false)
    }
}

impl Drop for LinuxInputPin {
    fn drop(&mut self) {
        release(self.gpio);
    }
}

// ── Backend ───────────────────────────────────────────────────

/// [`GpioBackend`] over one GPIO character device.
pub struct LinuxBackend {
    chip: Chip,
    lines: u32,
}

impl LinuxBackend {
    /// Open the chip at `path`, e.g. `/dev/gpiochip0`.
    pub fn open(path: &str) -> Result<Self, HardwareFault> {
        let chip = Chip::new(path).map_err(|e| {
            error!("{}: cannot open GPIO chip: {}", path, e);
            HardwareFault::BackendUnavailable(Backend::Linux)
        })?;
        let lines = chip.num_lines();
        info!("gpio: {} ({}), {} lines", path, chip.label(), lines);
        Ok(Self { chip, lines })
    }

    fn request(
        &mut self,
        gpio: u8,
        flags: LineRequestFlags,
        initial: u8,
    ) -> Result<CdevPin, HardwareFault> {
        if u32::from(gpio) >= self.lines {
            return Err(HardwareFault::InvalidPin { pin: gpio });
        }
        claim(gpio)?;
        let handle = self
            .chip
            .get_line(u32::from(gpio))
            .and_then(|line| line.request(flags, initial, CONSUMER))
            .map_err(|e| request_fault(gpio, &e))?;
        CdevPin::new(handle).map_err(|e| request_fault(gpio, &e))
    }
}

impl GpioBackend for LinuxBackend {
    type Output = LinuxOutputPin;
    type Input = LinuxInputPin;

    fn name(&self) -> &'static str {
        "linux"
    }

    fn claim_output(&mut self, gpio: u8, initial: Level) -> Result<LinuxOutputPin, HardwareFault> {
        let pin = self.request(gpio, LineRequestFlags::OUTPUT, u8::from(initial.is_high()))?;
        Ok(LinuxOutputPin { pin, gpio })
    }

    fn claim_input(&mut self, gpio: u8, _active: Level) -> Result<LinuxInputPin, HardwareFault> {
        let pin = self.request(gpio, LineRequestFlags::INPUT, 0)?;
        Ok(LinuxInputPin { pin, gpio })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_chip_is_unavailable() {
        assert_eq!(
            LinuxBackend::open("/dev/watershed-no-such-gpiochip").err(),
            Some(HardwareFault::BackendUnavailable(Backend::Linux))
        );
    }

    #[test]
    fn local_claims_are_exclusive() {
        // Line 63 is never used by the other tests in this module.
        assert_eq!(claim(63), Ok(()));
        assert_eq!(claim(63), Err(HardwareFault::PinInUse { pin: 63 }));
        release(63);
        assert_eq!(claim(63), Ok(()));
        release(63);
    }

    #[test]
    fn out_of_range_line_rejected() {
        assert_eq!(claim(64), Err(HardwareFault::InvalidPin { pin: 64 }));
    }
}
