//! WiFi station lifecycle for ESP32 firmware.
//!
//! This library contains the platform-independent connection manager, retry
//! policy, signal flags, and scan workflow, all testable on the host machine
//! without ESP32 hardware. The `esp32` feature adds the ESP-IDF backed
//! driver and the event loop bridge.

pub mod sim;
pub mod station;

#[cfg(feature = "esp32")]
pub mod esp32;

// Re-export commonly used items
pub use sim::{SimBehavior, SimCall, SimStation};
pub use station::{
    classify_signal, AccessPointRecord, AuthMode, ConnectionManager, Credentials, DriverError,
    IpInfo, Phase2Method, RetryLimit, SignalStrength, StationDriver, StationEvent,
};

#[cfg(feature = "esp32")]
pub use esp32::{EspStation, EventBridge};
