//! ESP32 backend.
//!
//! Binds the connection manager to the real radio through ESP-IDF.
//!
//! # Components
//!
//! - [`station`] - [`StationDriver`](crate::station::StationDriver)
//!   implementation on top of the ESP-IDF WiFi driver
//! - [`events`] - bridge that forwards system event loop notifications
//!   into the manager
//!
//! Only compiled for the `esp32` feature; host builds use the simulator
//! instead.

pub mod events;
pub mod station;

pub use events::EventBridge;
pub use station::EspStation;
