//! Station connection core.
//!
//! Platform-independent connection lifecycle logic: everything here runs on
//! the host against the in-process simulator and on the device against the
//! ESP-IDF backend.
//!
//! # Lifecycle
//!
//! There is no stored state enum; the station's state is the composition of
//! the [`signal`] flags and the retry budget. Idle is all flags clear.
//! A connect request starts the hardware; the started event sets `STARTED`
//! and triggers association (connecting). Each disassociation either
//! re-attempts, staying in connecting, or spends the last of the budget and
//! sets `FAILED`. Address acquisition sets `CONNECTED`. `CONNECTED` and
//! `FAILED` are terminal for the attempt; only the next connect request
//! clears them.
//!
//! # Components
//!
//! - [`credentials`] - bounded credential buffers (personal / enterprise)
//! - [`driver`] - the trait seam to the station hardware
//! - [`event`] - lifecycle events and the IP snapshot
//! - [`manager`] - connection manager: connect, disconnect, wait, query
//! - [`retry`] - reconnect budget accounting
//! - [`scan`] - access-point survey and signal classification
//! - [`signal`] - cross-thread flag signalling

pub mod credentials;
pub mod driver;
pub mod event;
pub mod manager;
pub mod retry;
pub mod scan;
pub mod signal;

pub use credentials::{AuthMode, Credentials, Phase2Method};
pub use driver::{DriverError, StationDriver};
pub use event::{IpInfo, StationEvent};
pub use manager::ConnectionManager;
pub use retry::RetryLimit;
pub use scan::{classify_signal, AccessPointRecord, SignalStrength};
pub use signal::EventGroup;
