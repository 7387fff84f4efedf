//! Controller configuration.
//!
//! Resolved once at startup: defaults, then the persisted store, then
//! environment overrides. Nothing reads configuration after the service
//! has started; the GPIO backend is selected here rather than through
//! ambient process state.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn from_high(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }

    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "1" => Some(Self::High),
            "low" | "0" => Some(Self::Low),
            _ => None,
        }
    }
}

/// GPIO backend that turns logical pin operations into register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// ESP-IDF `PinDriver` on the ESP32-S3.
    Esp32,
    /// Linux GPIO character device (`/dev/gpiochipN`), e.g. a Raspberry Pi.
    Linux,
    /// In-memory board for development runs and tests. Never the default.
    Sim,
}

impl Backend {
    /// Backend used when the config does not name one: real hardware for
    /// the build target. Where that is unavailable startup fails rather
    /// than quietly driving the simulated board.
    pub const fn native() -> Self {
        if cfg!(target_os = "espidf") { Self::Esp32 } else { Self::Linux }
    }

    /// Whether this backend can be instantiated on the running target.
    pub const fn is_available(self) -> bool {
        match self {
            Self::Esp32 => cfg!(target_os = "espidf"),
            Self::Linux => cfg!(target_os = "linux"),
            Self::Sim => true,
        }
    }

    pub const fn max_gpio(self) -> u8 {
        match self {
            Self::Esp32 => pins::ESP32_MAX_GPIO,
            Self::Linux => pins::LINUX_MAX_GPIO,
            Self::Sim => pins::SIM_MAX_GPIO,
        }
    }

    /// Default shutdown-button line for this backend's numbering.
    pub const fn default_button_gpio(self) -> u8 {
        match self {
            Self::Esp32 => pins::ESP32_SHUTDOWN_BUTTON_GPIO,
            Self::Linux | Self::Sim => pins::SHUTDOWN_BUTTON_GPIO,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "esp32" | "espidf" => Some(Self::Esp32),
            "linux" | "cdev" => Some(Self::Linux),
            "sim" | "mock" => Some(Self::Sim),
            _ => None,
        }
    }
}

/// How the button monitor learns about input transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeDetection {
    /// GPIO interrupt pushes timestamped edges into a lock-free queue.
    Interrupt,
    /// The control loop samples the input level every tick.
    Poll,
}

/// Character device of the first GPIO bank (the 40-pin header on a Pi).
pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";

/// Everything needed to bring up the pump gate and the shutdown button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Backend ---
    pub backend: Backend,
    /// GPIO character device opened by the Linux backend.
    pub gpio_chip: heapless::String<32>,

    // --- Pump ---
    /// GPIO driving the MOSFET gate.
    pub pin_out: u8,
    /// Level that energises the pump.
    pub pump_active_level: Level,
    /// Command the pump on as soon as startup succeeds.
    pub manual_on: bool,

    // --- Shutdown button ---
    /// GPIO of the shutdown button, or `None` when no button is fitted.
    pub pin_in: Option<u8>,
    /// Level the button input reads while pressed.
    pub active_level: Level,
    /// Debounce window (milliseconds). `0` disables filtering.
    pub debounce_ms: u32,
    pub edge_detection: EdgeDetection,
    /// Consecutive failed reads tolerated before escalating to a fault.
    pub max_read_failures: u8,

    // --- Timing ---
    /// Control loop period (milliseconds).
    pub poll_interval_ms: u32,

    // --- Host ---
    /// Command run after a button-initiated shutdown (host targets only).
    pub halt_command: Option<heapless::String<64>>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let backend = Backend::native();
        Self {
            backend,
            gpio_chip: heapless::String::try_from(DEFAULT_GPIO_CHIP).unwrap_or_default(),

            pin_out: pins::PUMP_GATE_GPIO,
            pump_active_level: Level::High,
            manual_on: false,

            pin_in: Some(backend.default_button_gpio()),
            active_level: Level::Low,
            debounce_ms: 50,
            edge_detection: EdgeDetection::Poll,
            max_read_failures: 5,

            poll_interval_ms: 10,

            halt_command: None,
        }
    }
}

impl ControllerConfig {
    /// Range-check every field. Called before any pin is claimed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.backend.max_gpio();
        if self.pin_out > max {
            return Err(ConfigError::ValidationFailed(
                "pin_out is outside the backend's GPIO range",
            ));
        }
        if let Some(pin_in) = self.pin_in {
            if pin_in > max {
                return Err(ConfigError::ValidationFailed(
                    "pin_in is outside the backend's GPIO range",
                ));
            }
            if pin_in == self.pin_out {
                return Err(ConfigError::ValidationFailed(
                    "pin_in and pin_out must be different pins",
                ));
            }
        }
        if self.debounce_ms > 1000 {
            return Err(ConfigError::ValidationFailed("debounce_ms must be 0–1000"));
        }
        if !(1..=100).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 1–100",
            ));
        }
        if !(1..=100).contains(&self.max_read_failures) {
            return Err(ConfigError::ValidationFailed(
                "max_read_failures must be 1–100",
            ));
        }
        if self.backend == Backend::Linux && self.gpio_chip.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("gpio_chip must not be blank"));
        }
        if self
            .halt_command
            .as_ref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed(
                "halt_command must not be blank",
            ));
        }
        Ok(())
    }

    /// Apply `WATERSHED_*` overrides from an environment snapshot.
    ///
    /// Unknown keys are ignored; a recognised key with an unparsable value
    /// is an error so a typo never silently falls back to a default pin.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "WATERSHED_BACKEND" => {
                    self.backend = Backend::parse(value)
                        .ok_or(ConfigError::InvalidEnv("WATERSHED_BACKEND"))?;
                }
                "WATERSHED_GPIO_CHIP" => {
                    self.gpio_chip = heapless::String::try_from(value.trim())
                        .map_err(|_| ConfigError::InvalidEnv("WATERSHED_GPIO_CHIP"))?;
                }
                "WATERSHED_PIN_OUT" => {
                    self.pin_out = value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidEnv("WATERSHED_PIN_OUT"))?;
                }
                "WATERSHED_PIN_IN" => {
                    self.pin_in = if value.trim().eq_ignore_ascii_case("none") {
                        None
                    } else {
                        Some(
                            value
                                .trim()
                                .parse()
                                .map_err(|_| ConfigError::InvalidEnv("WATERSHED_PIN_IN"))?,
                        )
                    };
                }
                "WATERSHED_ACTIVE_LEVEL" => {
                    self.active_level = Level::parse(value)
                        .ok_or(ConfigError::InvalidEnv("WATERSHED_ACTIVE_LEVEL"))?;
                }
                "WATERSHED_DEBOUNCE_MS" => {
                    self.debounce_ms = value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidEnv("WATERSHED_DEBOUNCE_MS"))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = ControllerConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.backend, Backend::native());
        assert_ne!(Some(c.pin_out), c.pin_in);
        assert!(!c.manual_on);
    }

    #[test]
    fn sim_is_never_the_default() {
        assert_ne!(Backend::native(), Backend::Sim);
        assert_ne!(ControllerConfig::default().backend, Backend::Sim);
    }

    #[test]
    fn button_default_avoids_esp32_strapping_pins() {
        let esp = Backend::Esp32.default_button_gpio();
        assert!(![0, 3, 45, 46].contains(&esp));
        assert_ne!(esp, pins::PUMP_GATE_GPIO);
        assert_eq!(Backend::Linux.default_button_gpio(), 3);
    }

    #[test]
    fn blank_gpio_chip_rejected_for_linux() {
        let mut c = ControllerConfig {
            backend: Backend::Linux,
            ..ControllerConfig::default()
        };
        c.gpio_chip.clear();
        assert!(c.validate().is_err());
        c.backend = Backend::Sim;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn shared_pin_rejected() {
        let c = ControllerConfig {
            pin_in: Some(18),
            pin_out: 18,
            ..ControllerConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn out_of_range_pins_rejected() {
        let c = ControllerConfig {
            backend: Backend::Esp32,
            pin_out: 49,
            ..ControllerConfig::default()
        };
        assert!(c.validate().is_err());

        let c = ControllerConfig {
            backend: Backend::Sim,
            pin_in: Some(64),
            ..ControllerConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn timing_bounds() {
        let mut c = ControllerConfig::default();
        c.debounce_ms = 0;
        assert!(c.validate().is_ok());
        c.debounce_ms = 1001;
        assert!(c.validate().is_err());

        let mut c = ControllerConfig::default();
        c.poll_interval_ms = 0;
        assert!(c.validate().is_err());

        let mut c = ControllerConfig::default();
        c.max_read_failures = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn button_is_optional() {
        let c = ControllerConfig {
            pin_in: None,
            ..ControllerConfig::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let mut c = ControllerConfig::default();
        c.apply_env([
            ("WATERSHED_BACKEND", "sim"),
            ("WATERSHED_GPIO_CHIP", "/dev/gpiochip4"),
            ("WATERSHED_PIN_OUT", "17"),
            ("WATERSHED_PIN_IN", "none"),
            ("WATERSHED_ACTIVE_LEVEL", "HIGH"),
            ("WATERSHED_DEBOUNCE_MS", "30"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();
        assert_eq!(c.backend, Backend::Sim);
        assert_eq!(c.gpio_chip.as_str(), "/dev/gpiochip4");
        assert_eq!(c.pin_out, 17);
        assert_eq!(c.pin_in, None);
        assert_eq!(c.active_level, Level::High);
        assert_eq!(c.debounce_ms, 30);
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut c = ControllerConfig::default();
        let err = c.apply_env([("WATERSHED_PIN_OUT", "eighteen")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidEnv("WATERSHED_PIN_OUT"));
        assert_eq!(c.pin_out, pins::PUMP_GATE_GPIO);
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let c: ControllerConfig =
            serde_json::from_str(r#"{"pin_out": 12, "debounce_ms": 30}"#).unwrap();
        assert_eq!(c.pin_out, 12);
        assert_eq!(c.debounce_ms, 30);
        assert_eq!(c.pin_in, Some(Backend::native().default_button_gpio()));
        assert_eq!(c.active_level, Level::Low);
    }

    #[test]
    fn postcard_roundtrip() {
        let mut c = ControllerConfig::default();
        c.halt_command = Some(heapless::String::try_from("sudo halt").unwrap());
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: ControllerConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c, c2);
    }
}
