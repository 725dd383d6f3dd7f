//! Lifecycle events delivered by the station hardware.
//!
//! The hardware side (ESP-IDF event loop, simulator thread, test harness)
//! translates whatever it receives into [`StationEvent`] values and feeds
//! them to `ConnectionManager::handle_event`. The manager never learns what
//! the delivery mechanism was.

use std::fmt;
use std::net::Ipv4Addr;

/// Snapshot of the station's IPv4 configuration.
///
/// Overwritten in place on every address acquisition. Readers may observe a
/// stale-but-valid snapshot (all zeros before the first acquisition); check
/// `is_connected` before trusting freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl IpInfo {
    pub fn new(address: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        Self {
            address,
            netmask,
            gateway,
        }
    }

    /// True until the first acquisition writes a real snapshot.
    pub fn is_unspecified(&self) -> bool {
        self.address.is_unspecified()
    }
}

impl Default for IpInfo {
    fn default() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl fmt::Display for IpInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} netmask {} gateway {}",
            self.address, self.netmask, self.gateway
        )
    }
}

/// The closed set of events the manager reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationEvent {
    /// The station interface came up.
    Started,
    /// The station interface went down.
    Stopped,
    /// The link to the access point was lost, or an attempt never formed one.
    Disassociated,
    /// An IPv4 address was acquired for the station interface.
    AddressAcquired(IpInfo),
}
