//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                     |
//! |---------------|--------------|---------------------------------|
//! | `esp_gpio`    | GpioBackend  | ESP32-S3 GPIO matrix + ISR      |
//! | `linux_gpio`  | GpioBackend  | `/dev/gpiochipN` (Raspberry Pi) |
//! | `sim`         | GpioBackend  | In-memory board (dev, tests)    |
//! | `log_sink`    | EventSink    | `log` facade                    |
//! | `nvs`         | ConfigPort   | NVS / in-memory blob            |
//! | `config_file` | ConfigPort   | JSON file on a Linux host       |
//! | `host`        | HostPort     | halt command / deep sleep       |
//! | `time`        | (none)       | Monotonic millisecond clock     |

#[cfg(not(target_os = "espidf"))]
pub mod config_file;
#[cfg(target_os = "espidf")]
pub mod esp_gpio;
pub mod host;
#[cfg(target_os = "linux")]
pub mod linux_gpio;
pub mod log_sink;
pub mod nvs;
pub mod sim;
pub mod time;
