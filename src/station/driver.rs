//! The seam to the station hardware.
//!
//! [`StationDriver`] is the set of primitives the connection and scan
//! workflows drive. The asynchronous event feed travels the other way,
//! through `ConnectionManager::handle_event`; the driver trait knows nothing
//! about event delivery. Implementations: the ESP-IDF backend (behind the
//! `esp32` feature) and the in-process simulator used on the host.

use std::fmt;

use super::credentials::Credentials;
use super::scan::AccessPointRecord;

/// Raw platform error value (`esp_err_t` on device, synthetic codes in the
/// simulator).
pub type ErrorCode = i32;

/// Failures reported by a [`StationDriver`] primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Mode switch or credential installation was rejected.
    Configure(ErrorCode),
    /// A start, stop, connect or disconnect request was rejected.
    Control(ErrorCode),
    /// The scan trigger failed or results could not be fetched.
    Scan(ErrorCode),
    /// Scan result storage could not be allocated.
    OutOfMemory,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure(code) => write!(f, "configuration rejected (code {})", code),
            Self::Control(code) => write!(f, "control request rejected (code {})", code),
            Self::Scan(code) => write!(f, "scan failed (code {})", code),
            Self::OutOfMemory => write!(f, "out of memory for scan results"),
        }
    }
}

impl std::error::Error for DriverError {}

/// Primitives the station hardware exposes.
///
/// All methods take `&self`; implementations manage their own interior
/// mutability (the underlying ESP-IDF calls are task-safe, the simulator
/// locks per call). Methods return as soon as the hardware accepts the
/// request; the actual lifecycle outcome arrives later as a `StationEvent`.
pub trait StationDriver: Send + Sync {
    /// Switches the radio into station (client) role without touching any
    /// installed credentials.
    fn enter_station_mode(&self) -> Result<(), DriverError>;

    /// Installs credentials for subsequent association attempts.
    fn set_credentials(&self, credentials: &Credentials) -> Result<(), DriverError>;

    /// Brings the station interface up. Completion is signalled by a
    /// `Started` event.
    fn start(&self) -> Result<(), DriverError>;

    /// Takes the station interface down. Completion is signalled by a
    /// `Stopped` event.
    fn stop(&self) -> Result<(), DriverError>;

    /// Triggers an association attempt against the installed credentials.
    fn connect(&self) -> Result<(), DriverError>;

    /// Tears down the current association, if any.
    fn disconnect(&self) -> Result<(), DriverError>;

    /// Runs a blocking active scan across all channels, skipping hidden
    /// networks. Result storage is sized to the reported count;
    /// [`DriverError::OutOfMemory`] reports an allocation failure.
    fn scan(&self) -> Result<Vec<AccessPointRecord>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DriverError::Configure(12289).to_string(),
            "configuration rejected (code 12289)"
        );
        assert_eq!(
            DriverError::OutOfMemory.to_string(),
            "out of memory for scan results"
        );
    }
}
