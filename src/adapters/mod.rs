//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                  |
//! |----------------|--------------|------------------------------|
//! | `hardware`     | ActuatorPort | Relay GPIOs (embedded-hal)   |
//! | `time`         | ClockPort    | ESP32 high-resolution timer  |
//! | `log_sink`     | EventSink    | Serial log output            |
//! | `channel_sink` | EventSink    | Bounded queue to main loop   |
//! | `nvs`          | ConfigPort   | NVS / in-memory store        |

pub mod channel_sink;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
