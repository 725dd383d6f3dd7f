//! Access-point survey.
//!
//! The scan workflow rides the same hardware mode switch the connection
//! path uses: a stopped station is brought up just to listen (the scanning
//! flag suppresses the auto-association that normally follows a `Started`
//! event) and stopped again afterwards, so a scan never changes the station
//! state it found. Failures degrade to an empty result list.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{error, info, warn};

use super::driver::StationDriver;
use super::manager::ConnectionManager;
use super::signal::STARTED;

/// Wait bound for the started condition when the scan itself brings the
/// station up.
const STARTED_WAIT: Duration = Duration::from_secs(2);

// Classification thresholds in dBm. Comparisons are strictly greater-than,
// so a value equal to a threshold falls into the lower bucket.
const THRESH_VERY_GOOD: i8 = -55;
const THRESH_GOOD: i8 = -67;
const THRESH_BAD: i8 = -78;

/// Signal quality buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    VeryGood,
    Good,
    Bad,
    VeryBad,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::VeryGood => "very good",
            Self::Good => "good",
            Self::Bad => "bad",
            Self::VeryBad => "very bad",
        };
        f.write_str(label)
    }
}

/// Buckets a measured RSSI.
pub fn classify_signal(rssi: i8) -> SignalStrength {
    if rssi > THRESH_VERY_GOOD {
        SignalStrength::VeryGood
    } else if rssi > THRESH_GOOD {
        SignalStrength::Good
    } else if rssi > THRESH_BAD {
        SignalStrength::Bad
    } else {
        SignalStrength::VeryBad
    }
}

/// One access point observed by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointRecord {
    pub bssid: [u8; 6],
    pub ssid: String,
    /// Received signal strength in dBm.
    pub rssi: i8,
    pub supports_11b: bool,
    pub supports_11g: bool,
    pub supports_11n: bool,
}

impl AccessPointRecord {
    /// Colon-separated hex form of the BSSID.
    pub fn bssid_string(&self) -> String {
        let b = &self.bssid;
        format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }

    /// `11b/g/n`-style summary of the advertised PHY modes; empty when the
    /// record advertises none of them.
    pub fn phy_summary(&self) -> String {
        let mut modes = String::new();
        for (supported, tag) in [
            (self.supports_11b, "b"),
            (self.supports_11g, "g"),
            (self.supports_11n, "n"),
        ] {
            if supported {
                if !modes.is_empty() {
                    modes.push('/');
                }
                modes.push_str(tag);
            }
        }
        if modes.is_empty() {
            modes
        } else {
            format!("11{}", modes)
        }
    }
}

impl fmt::Display for AccessPointRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} rssi={}", self.bssid_string(), self.ssid, self.rssi)?;
        let phy = self.phy_summary();
        if !phy.is_empty() {
            write!(f, " {}", phy)?;
        }
        Ok(())
    }
}

impl<D: StationDriver> ConnectionManager<D> {
    /// One-shot access-point survey.
    ///
    /// Never changes the station state it found: a stopped station is
    /// brought up for the duration of the scan and stopped again on every
    /// exit path; a running one is left running and its association is not
    /// disturbed. Returns an empty vector on any failure.
    ///
    /// Serialized externally against `connect_async`/`disconnect`, like all
    /// configuration operations.
    pub fn scan(&self) -> Vec<AccessPointRecord> {
        info!("Scanning for access points");
        let _scanning = ScanFlagGuard::raise(&self.scanning);

        let was_running = self.signal.is_set(STARTED);
        let mut restore = StopOnExit::disarmed(self.driver.as_ref());
        if !was_running {
            // Up just to listen; the raised scanning flag keeps the Started
            // reaction from associating.
            if let Err(e) = self.driver.enter_station_mode() {
                error!("Scan aborted, station mode switch rejected: {}", e);
                return Vec::new();
            }
            if let Err(e) = self.driver.start() {
                error!("Scan aborted, station start rejected: {}", e);
                return Vec::new();
            }
            restore.arm();
            if self.signal.wait_any(STARTED, Some(STARTED_WAIT)) & STARTED == 0 {
                warn!(
                    "Station not up after {:?}, attempting the scan anyway",
                    STARTED_WAIT
                );
            }
        }

        match self.driver.scan() {
            Ok(records) => {
                info!("Scan found {} access points", records.len());
                for record in &records {
                    info!("AP {}", record);
                }
                records
            }
            Err(e) => {
                error!("Scan failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Raises the scanning flag for the duration of the survey.
///
/// The Release store pairs with the Acquire load in the manager's Started
/// reaction; dropping the guard clears the flag on every exit path.
struct ScanFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ScanFlagGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self { flag }
    }
}

impl Drop for ScanFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Stops the station on drop once armed.
///
/// Armed only after the scan workflow started the station itself, so a
/// station that was already running is left alone and one whose start was
/// rejected is not "stopped" redundantly.
struct StopOnExit<'a, D: StationDriver> {
    driver: &'a D,
    armed: bool,
}

impl<'a, D: StationDriver> StopOnExit<'a, D> {
    fn disarmed(driver: &'a D) -> Self {
        Self {
            driver,
            armed: false,
        }
    }

    fn arm(&mut self) {
        self.armed = true;
    }
}

impl<D: StationDriver> Drop for StopOnExit<'_, D> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.driver.stop() {
                warn!("Station stop after scan failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBehavior, SimCall, SimStation};
    use crate::station::credentials::{AuthMode, Credentials};
    use crate::station::driver::DriverError;
    use crate::station::event::IpInfo;
    use crate::station::retry::RetryLimit;
    use std::net::Ipv4Addr;
    use std::sync::{Arc, Weak};

    fn harness(behavior: SimBehavior) -> (Arc<SimStation>, Arc<ConnectionManager<SimStation>>) {
        let driver = Arc::new(SimStation::with_behavior(behavior));
        let manager = Arc::new(ConnectionManager::new(Arc::clone(&driver)));
        let sink: Weak<ConnectionManager<SimStation>> = Arc::downgrade(&manager);
        driver.attach(move |event| {
            if let Some(manager) = sink.upgrade() {
                manager.handle_event(event);
            }
        });
        (driver, manager)
    }

    fn test_records() -> Vec<AccessPointRecord> {
        vec![
            AccessPointRecord {
                bssid: [0xAA, 0xBB, 0xCC, 0x00, 0x11, 0x22],
                ssid: "HomeNet".to_string(),
                rssi: -48,
                supports_11b: true,
                supports_11g: true,
                supports_11n: true,
            },
            AccessPointRecord {
                bssid: [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01],
                ssid: "CoffeeShop".to_string(),
                rssi: -71,
                supports_11b: false,
                supports_11g: true,
                supports_11n: false,
            },
        ]
    }

    // ==================== Classification ====================

    #[test]
    fn test_classify_signal_boundaries() {
        // One above each threshold lands in the higher bucket
        assert_eq!(classify_signal(-54), SignalStrength::VeryGood);
        assert_eq!(classify_signal(-66), SignalStrength::Good);
        assert_eq!(classify_signal(-77), SignalStrength::Bad);

        // Exactly on a threshold lands in the lower bucket
        assert_eq!(classify_signal(-55), SignalStrength::Good);
        assert_eq!(classify_signal(-67), SignalStrength::Bad);
        assert_eq!(classify_signal(-78), SignalStrength::VeryBad);
    }

    #[test]
    fn test_classify_signal_extremes() {
        assert_eq!(classify_signal(0), SignalStrength::VeryGood);
        assert_eq!(classify_signal(i8::MAX), SignalStrength::VeryGood);
        assert_eq!(classify_signal(i8::MIN), SignalStrength::VeryBad);
    }

    // ==================== Record formatting ====================

    #[test]
    fn test_phy_summary_variants() {
        let mut record = test_records().remove(0);
        assert_eq!(record.phy_summary(), "11b/g/n");

        record.supports_11b = false;
        assert_eq!(record.phy_summary(), "11g/n");

        record.supports_11g = false;
        record.supports_11n = false;
        assert_eq!(record.phy_summary(), "");
    }

    #[test]
    fn test_record_display() {
        let record = test_records().remove(0);
        assert_eq!(
            record.to_string(),
            "AA:BB:CC:00:11:22 \"HomeNet\" rssi=-48 11b/g/n"
        );
    }

    // ==================== Scan workflow ====================

    #[test]
    fn test_scan_from_stopped_restores_stopped() {
        let (driver, manager) = harness(SimBehavior {
            access_points: test_records(),
            ..Default::default()
        });

        let records = manager.scan();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ssid, "HomeNet");

        // The station was brought up for the scan only, and the Started
        // event must not have triggered an association
        assert!(!driver.is_started());
        assert_eq!(driver.call_count(SimCall::Connect), 0);
        assert_eq!(
            driver.calls(),
            vec![
                SimCall::EnterStationMode,
                SimCall::Start,
                SimCall::Scan,
                SimCall::Stop
            ]
        );
        assert!(!manager.scanning.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_while_running_leaves_running() {
        let (driver, manager) = harness(SimBehavior {
            grant: IpInfo::new(
                Ipv4Addr::new(10, 0, 0, 9),
                Ipv4Addr::new(255, 255, 255, 0),
                Ipv4Addr::new(10, 0, 0, 1),
            ),
            access_points: test_records(),
            ..Default::default()
        });

        let creds = Credentials::personal("HomeNet", "secret123", AuthMode::Wpa2Personal);
        assert!(manager.connect(&creds, RetryLimit::Limited(1)));
        let stops_before = driver.call_count(SimCall::Stop);
        let starts_before = driver.call_count(SimCall::Start);

        let records = manager.scan();
        assert_eq!(records.len(), 2);

        // Still up, still associated, no extra start/stop
        assert!(driver.is_started());
        assert!(manager.is_connected());
        assert_eq!(driver.call_count(SimCall::Stop), stops_before);
        assert_eq!(driver.call_count(SimCall::Start), starts_before);
        assert!(!manager.scanning.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_failure_from_stopped_returns_empty_and_restores() {
        let (driver, manager) = harness(SimBehavior {
            scan_failure: Some(DriverError::OutOfMemory),
            ..Default::default()
        });

        assert!(manager.scan().is_empty());
        assert!(!driver.is_started());
        assert_eq!(driver.calls().last(), Some(&SimCall::Stop));
        assert!(!manager.scanning.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_failure_while_running_leaves_running() {
        let (driver, manager) = harness(SimBehavior {
            grant: IpInfo::new(
                Ipv4Addr::new(10, 0, 0, 9),
                Ipv4Addr::new(255, 255, 255, 0),
                Ipv4Addr::new(10, 0, 0, 1),
            ),
            scan_failure: Some(DriverError::Scan(7)),
            ..Default::default()
        });

        let creds = Credentials::personal("HomeNet", "secret123", AuthMode::Wpa2Personal);
        assert!(manager.connect(&creds, RetryLimit::Limited(1)));
        let stops_before = driver.call_count(SimCall::Stop);

        assert!(manager.scan().is_empty());
        assert!(driver.is_started());
        assert_eq!(driver.call_count(SimCall::Stop), stops_before);
        assert!(!manager.scanning.load(Ordering::SeqCst));
    }

    #[test]
    fn test_rejected_mode_switch_aborts_scan_cleanly() {
        let (driver, manager) = harness(SimBehavior {
            mode_failure: Some(DriverError::Configure(3)),
            access_points: test_records(),
            ..Default::default()
        });

        assert!(manager.scan().is_empty());
        // Never started, so nothing to stop
        assert_eq!(driver.call_count(SimCall::Start), 0);
        assert_eq!(driver.call_count(SimCall::Stop), 0);
        assert!(!manager.scanning.load(Ordering::SeqCst));
    }
}
