//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the retry policy, the IP snapshot and the
//! scanning flag, and is the single place where hardware lifecycle events
//! mutate shared state. Callers invoke the public operations from any
//! thread; the hardware's event source feeds `handle_event` from its own
//! context; blocking callers park on the internal [`EventGroup`] until the
//! attempt settles one way or the other.
//!
//! Configuration operations (`connect_async`, `disconnect`, `scan`) assume
//! at most one in-flight configuration change at a time; callers serialize
//! them externally. Everything else is safe to call concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, info, warn};

use super::credentials::Credentials;
use super::driver::{DriverError, StationDriver};
use super::event::{IpInfo, StationEvent};
use super::retry::{RetryDecision, RetryLimit, RetryPolicy};
use super::signal::{EventGroup, CONNECTED, FAILED, STARTED};

/// Station connection state and the operations that drive it.
///
/// Construct once, share by [`Arc`]: the event source holds one handle and
/// delivers events through [`ConnectionManager::handle_event`], callers hold
/// another and invoke the connect/disconnect/scan/query operations.
pub struct ConnectionManager<D: StationDriver> {
    pub(super) driver: Arc<D>,
    pub(super) signal: EventGroup,
    pub(super) scanning: AtomicBool,
    policy: Mutex<RetryPolicy>,
    ip_info: Mutex<IpInfo>,
}

impl<D: StationDriver> ConnectionManager<D> {
    /// Creates a manager driving `driver`.
    ///
    /// Hook the hardware's event feed to [`ConnectionManager::handle_event`]
    /// before the first connect request, or started/disassociated events
    /// will be lost.
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            signal: EventGroup::new(),
            scanning: AtomicBool::new(false),
            policy: Mutex::new(RetryPolicy::new()),
            ip_info: Mutex::new(IpInfo::default()),
        }
    }

    /// Starts a connection attempt and returns as soon as the hardware has
    /// accepted the configuration.
    ///
    /// Any prior connection is abandoned without waiting: the station is
    /// stopped, every signal flag cleared and the retry policy re-armed
    /// before the new credentials are installed. Stale events from the old
    /// attempt may still arrive afterwards and are evaluated against the new
    /// policy; that non-determinism is accepted rather than trying to cancel
    /// in-flight events.
    ///
    /// A rejected driver call aborts early with the error already logged;
    /// state set up to that point stays consistent for the next attempt.
    pub fn connect_async(
        &self,
        credentials: &Credentials,
        retry_limit: RetryLimit,
    ) -> Result<(), DriverError> {
        info!(
            "Connecting to '{}' (retry limit {})",
            credentials.ssid().display_lossy(),
            retry_limit
        );

        self.lock_policy().arm(retry_limit);

        // Abandon whatever the radio was doing. Best effort: a failure here
        // usually means "was not running", which is the state we want.
        if let Err(e) = self.driver.disconnect() {
            debug!("Pre-connect disconnect: {}", e);
        }
        if let Err(e) = self.driver.stop() {
            debug!("Pre-connect stop: {}", e);
        }
        self.signal.clear_all();

        self.driver.enter_station_mode().map_err(|e| {
            error!("Station mode switch rejected: {}", e);
            e
        })?;
        self.driver.set_credentials(credentials).map_err(|e| {
            error!("Credential installation rejected: {}", e);
            e
        })?;
        self.driver.start().map_err(|e| {
            error!("Station start rejected: {}", e);
            e
        })?;
        Ok(())
    }

    /// Blocking connect: [`ConnectionManager::connect_async`] followed by an
    /// unbounded [`ConnectionManager::wait_connection`].
    ///
    /// Returns true only if an address was acquired before the retry budget
    /// ran out.
    pub fn connect(&self, credentials: &Credentials, retry_limit: RetryLimit) -> bool {
        if self.connect_async(credentials, retry_limit).is_err() {
            // Already logged. The hardware never started, so no event will
            // ever set the flags; waiting would block forever.
            return false;
        }
        self.wait_connection(None)
    }

    /// Stops the station and zeroes the retry budget, so in-flight retry
    /// logic gives up instead of re-attempting. Idempotent.
    ///
    /// Does not wake a blocked [`ConnectionManager::wait_connection`]
    /// directly; that caller returns on the resulting disassociation event
    /// or on its own timeout.
    pub fn disconnect(&self) -> Result<(), DriverError> {
        info!("Disconnecting station");
        self.lock_policy().exhaust();
        self.driver.stop()
    }

    /// Parks the caller until the current attempt settles.
    ///
    /// `None` waits without bound. Returns true when the connected flag is
    /// set. On failure, timeout, or a wake without an outcome the station is
    /// stopped defensively and false is returned; retry counters are left
    /// for the next connect request to re-arm.
    pub fn wait_connection(&self, timeout: Option<Duration>) -> bool {
        let bits = self.signal.wait_any(CONNECTED | FAILED, timeout);
        if bits & CONNECTED != 0 {
            true
        } else if bits & FAILED != 0 {
            error!("Failed to connect");
            self.stop_quietly();
            false
        } else {
            error!("Wait for connection ended without an outcome, stopping station");
            self.stop_quietly();
            false
        }
    }

    /// Non-blocking read of the connected flag.
    pub fn is_connected(&self) -> bool {
        self.signal.is_set(CONNECTED)
    }

    /// Non-blocking snapshot of the last-known address configuration.
    ///
    /// All zeros before the first acquisition, stale after a drop; pair with
    /// [`ConnectionManager::is_connected`] when freshness matters.
    pub fn ip_info(&self) -> IpInfo {
        *self.lock_ip()
    }

    /// Entry point for the hardware event feed.
    ///
    /// The sole writer of the retry policy, the IP snapshot and the signal
    /// flags. Events arrive serially from one delivery context. No lock is
    /// held across a driver call, so a driver that delivers events inline
    /// from its own primitives (the simulator does) cannot deadlock here.
    pub fn handle_event(&self, event: StationEvent) {
        match event {
            StationEvent::Started => {
                info!("Station started");
                self.signal.set(STARTED);
                // During a scan the station is up only to listen; do not
                // associate. Pairs with the Release store in the scan guard.
                if !self.scanning.load(Ordering::Acquire) {
                    if let Err(e) = self.driver.connect() {
                        error!("Association request rejected: {}", e);
                    }
                }
            }
            StationEvent::Stopped => {
                info!("Station stopped");
                self.signal.clear(STARTED);
            }
            StationEvent::Disassociated => {
                self.signal.clear(CONNECTED);
                let decision = {
                    let mut policy = self.lock_policy();
                    let decision = policy.on_disassociation();
                    if decision == RetryDecision::Reattempt {
                        info!(
                            "Disassociated, retrying ({} of {})",
                            policy.attempted(),
                            policy.limit()
                        );
                    }
                    decision
                };
                match decision {
                    RetryDecision::Reattempt => {
                        if let Err(e) = self.driver.connect() {
                            error!("Re-association request rejected: {}", e);
                        }
                    }
                    RetryDecision::GiveUp => {
                        error!("Disassociated with retry budget spent, giving up");
                        self.signal.set(FAILED);
                    }
                }
            }
            StationEvent::AddressAcquired(info) => {
                info!("Connected: {}", info);
                *self.lock_ip() = info;
                self.lock_policy().reset_attempts();
                self.signal.set(CONNECTED);
            }
        }
    }

    fn stop_quietly(&self) {
        if let Err(e) = self.driver.stop() {
            warn!("Station stop failed: {}", e);
        }
    }

    fn lock_policy(&self) -> MutexGuard<'_, RetryPolicy> {
        self.policy.lock().unwrap_or_else(|poisoned| {
            warn!("Retry policy mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_ip(&self) -> MutexGuard<'_, IpInfo> {
        self.ip_info.lock().unwrap_or_else(|poisoned| {
            warn!("IP snapshot mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Test hook: re-attempts consumed by the current connect request.
    #[cfg(test)]
    pub(crate) fn retry_attempted(&self) -> u8 {
        self.lock_policy().attempted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBehavior, SimCall, SimStation};
    use crate::station::credentials::AuthMode;
    use std::net::Ipv4Addr;
    use std::sync::Weak;
    use std::time::Instant;

    fn test_ip() -> IpInfo {
        IpInfo::new(
            Ipv4Addr::new(10, 0, 0, 7),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(10, 0, 0, 1),
        )
    }

    fn test_creds() -> Credentials {
        Credentials::personal("MyNet", "secret123", AuthMode::Wpa2Personal)
    }

    /// Wires a simulator to a manager the way an embedder would: the event
    /// feed goes through a weak handle so the pair does not keep itself
    /// alive.
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

    #[test]
    fn test_connect_retries_twice_then_succeeds() {
        let (driver, manager) = harness(SimBehavior {
            drops_before_grant: 2,
            grant: test_ip(),
            ..Default::default()
        });

        assert!(manager.connect(&test_creds(), RetryLimit::Limited(3)));
        assert!(manager.is_connected());
        assert_eq!(manager.ip_info(), test_ip());
        // Acquisition resets the attempt counter
        assert_eq!(manager.retry_attempted(), 0);
        // Initial association plus two re-attempts
        assert_eq!(driver.call_count(SimCall::Connect), 3);

        let installed = driver.installed_credentials().expect("credentials installed");
        assert_eq!(installed.ssid().as_bytes(), b"MyNet");
    }

    #[test]
    fn test_connect_fails_once_budget_is_spent() {
        let (driver, manager) = harness(SimBehavior {
            drops_before_grant: 4,
            grant: test_ip(),
            ..Default::default()
        });

        assert!(!manager.connect(&test_creds(), RetryLimit::Limited(3)));
        assert!(!manager.is_connected());
        assert!(manager.signal.is_set(FAILED));
        // Initial association plus the three budgeted re-attempts
        assert_eq!(driver.call_count(SimCall::Connect), 4);
        // The failed wait stops the station defensively
        assert_eq!(driver.calls().last(), Some(&SimCall::Stop));
        assert!(!driver.is_started());
    }

    #[test]
    fn test_unlimited_budget_outlasts_many_drops() {
        let (driver, manager) = harness(SimBehavior {
            drops_before_grant: 300,
            grant: test_ip(),
            ..Default::default()
        });

        assert!(manager.connect(&test_creds(), RetryLimit::Unlimited));
        assert!(!manager.signal.is_set(FAILED));
        assert_eq!(driver.call_count(SimCall::Connect), 301);
    }

    #[test]
    fn test_is_connected_drops_on_disassociation() {
        let (driver, manager) = harness(SimBehavior {
            grant: test_ip(),
            ..Default::default()
        });

        // Zero budget: the first drop is terminal
        assert!(manager.connect(&test_creds(), RetryLimit::Limited(0)));
        assert!(manager.is_connected());
        let connects = driver.call_count(SimCall::Connect);

        manager.handle_event(StationEvent::Disassociated);
        assert!(!manager.is_connected());
        assert!(manager.signal.is_set(FAILED));

        // A further stale disassociation must not re-attempt
        manager.handle_event(StationEvent::Disassociated);
        assert_eq!(driver.call_count(SimCall::Connect), connects);
    }

    #[test]
    fn test_disconnect_forces_budget_to_zero() {
        let (driver, manager) = harness(SimBehavior {
            grant: test_ip(),
            ..Default::default()
        });

        assert!(manager.connect(&test_creds(), RetryLimit::Unlimited));
        let connects = driver.call_count(SimCall::Connect);

        manager.disconnect().expect("disconnect");
        assert!(!driver.is_started());

        // Stale drops after an explicit disconnect never reconnect, even
        // though the policy was unlimited
        manager.handle_event(StationEvent::Disassociated);
        manager.handle_event(StationEvent::Disassociated);
        assert_eq!(driver.call_count(SimCall::Connect), connects);
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_wait_times_out_and_stops_the_station() {
        // A radio that accepts the association request but never resolves it
        let (driver, manager) = harness(SimBehavior {
            silent_connect: true,
            ..Default::default()
        });

        manager
            .connect_async(&test_creds(), RetryLimit::Limited(3))
            .expect("connect_async");

        let start = Instant::now();
        assert!(!manager.wait_connection(Some(Duration::from_millis(80))));
        assert!(start.elapsed() >= Duration::from_millis(60));
        assert_eq!(driver.calls().last(), Some(&SimCall::Stop));
        assert!(!driver.is_started());
    }

    #[test]
    fn test_wait_returns_immediately_when_already_connected() {
        let (_driver, manager) = harness(SimBehavior {
            grant: test_ip(),
            ..Default::default()
        });

        assert!(manager.connect(&test_creds(), RetryLimit::Limited(1)));

        let start = Instant::now();
        assert!(manager.wait_connection(Some(Duration::from_secs(5))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_rejected_configuration_aborts_early() {
        let (driver, manager) = harness(SimBehavior {
            mode_failure: Some(DriverError::Configure(13)),
            ..Default::default()
        });

        assert_eq!(
            manager.connect_async(&test_creds(), RetryLimit::Limited(3)),
            Err(DriverError::Configure(13))
        );
        assert_eq!(driver.call_count(SimCall::Start), 0);

        // The aborted attempt leaves consistent state behind; the next try
        // works once the radio cooperates
        driver.set_behavior(SimBehavior {
            grant: test_ip(),
            ..Default::default()
        });
        assert!(manager.connect(&test_creds(), RetryLimit::Limited(3)));
    }

    #[test]
    fn test_blocking_connect_with_rejected_start_returns_false_fast() {
        let (_driver, manager) = harness(SimBehavior {
            start_failure: Some(DriverError::Control(5)),
            ..Default::default()
        });

        let start = Instant::now();
        assert!(!manager.connect(&test_creds(), RetryLimit::Unlimited));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_second_connect_replaces_the_first() {
        let first_ip = test_ip();
        let second_ip = IpInfo::new(
            Ipv4Addr::new(172, 16, 4, 20),
            Ipv4Addr::new(255, 255, 0, 0),
            Ipv4Addr::new(172, 16, 0, 1),
        );

        let (driver, manager) = harness(SimBehavior {
            grant: first_ip,
            ..Default::default()
        });
        assert!(manager.connect(&test_creds(), RetryLimit::Limited(1)));
        assert_eq!(manager.ip_info(), first_ip);

        driver.set_behavior(SimBehavior {
            drops_before_grant: 1,
            grant: second_ip,
            ..Default::default()
        });
        let other = Credentials::personal("OtherNet", "hunter22", AuthMode::Wpa3Personal);
        assert!(manager.connect(&other, RetryLimit::Limited(2)));

        assert_eq!(manager.ip_info(), second_ip);
        assert_eq!(manager.retry_attempted(), 0);
        let installed = driver.installed_credentials().expect("credentials installed");
        assert_eq!(installed.ssid().as_bytes(), b"OtherNet");
    }

    #[test]
    fn test_ip_info_is_zero_before_first_acquisition() {
        let (_driver, manager) = harness(SimBehavior::default());
        assert!(manager.ip_info().is_unspecified());
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_stopped_event_clears_started_flag() {
        let (_driver, manager) = harness(SimBehavior {
            grant: test_ip(),
            ..Default::default()
        });

        assert!(manager.connect(&test_creds(), RetryLimit::Limited(1)));
        assert!(manager.signal.is_set(STARTED));

        manager.handle_event(StationEvent::Stopped);
        assert!(!manager.signal.is_set(STARTED));
    }
}
