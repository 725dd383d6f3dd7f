//! In-process station simulator.
//!
//! A scripted [`StationDriver`] that stands in for the radio on the host:
//! unit tests and the host demo drive the real connection manager against
//! it. Events are delivered inline on the calling thread through the
//! attached sink, and every primitive invocation is recorded so tests can
//! assert on the hardware interaction.
//!
//! Deliberately not modeled: the queued disassociation a real radio
//! delivers some time after an explicit disconnect. Tests that need
//! stale-event behavior inject events into the manager directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::station::credentials::Credentials;
use crate::station::driver::{DriverError, ErrorCode, StationDriver};
use crate::station::event::{IpInfo, StationEvent};
use crate::station::scan::AccessPointRecord;

/// Synthetic error code: the primitive needs a started station.
pub const ERR_NOT_STARTED: ErrorCode = 0x3002;

/// Where simulated events go; the embedder points this at
/// `ConnectionManager::handle_event`.
type EventSink = Arc<dyn Fn(StationEvent) + Send + Sync>;

/// Behavior script for a [`SimStation`].
#[derive(Debug, Clone, Default)]
pub struct SimBehavior {
    /// Disassociations delivered before an address is granted.
    pub drops_before_grant: u32,
    /// Address handed out once an association succeeds.
    pub grant: IpInfo,
    /// Swallow association requests entirely (no event): a radio that keeps
    /// negotiating forever.
    pub silent_connect: bool,
    /// Records returned by a successful scan.
    pub access_points: Vec<AccessPointRecord>,
    /// Error injected into `enter_station_mode`.
    pub mode_failure: Option<DriverError>,
    /// Error injected into `start`.
    pub start_failure: Option<DriverError>,
    /// Error injected into `scan`.
    pub scan_failure: Option<DriverError>,
}

/// One recorded driver invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCall {
    EnterStationMode,
    SetCredentials,
    Start,
    Stop,
    Connect,
    Disconnect,
    Scan,
}

/// Scripted in-process station.
pub struct SimStation {
    behavior: Mutex<SimBehavior>,
    sink: Mutex<Option<EventSink>>,
    started: AtomicBool,
    calls: Mutex<Vec<SimCall>>,
    credentials: Mutex<Option<Credentials>>,
}

impl SimStation {
    /// A station that associates on the first attempt and grants the
    /// all-zeros address.
    pub fn new() -> Self {
        Self::with_behavior(SimBehavior::default())
    }

    pub fn with_behavior(behavior: SimBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            sink: Mutex::new(None),
            started: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            credentials: Mutex::new(None),
        }
    }

    /// Points the event feed at the manager (or any other sink). Attach
    /// before the first driver call; events emitted earlier are dropped.
    pub fn attach(&self, sink: impl Fn(StationEvent) + Send + Sync + 'static) {
        *lock(&self.sink) = Some(Arc::new(sink));
    }

    /// Replaces the behavior script. Applies from the next primitive call.
    pub fn set_behavior(&self, behavior: SimBehavior) {
        *lock(&self.behavior) = behavior;
    }

    /// Every primitive invocation so far, in order.
    pub fn calls(&self) -> Vec<SimCall> {
        lock(&self.calls).clone()
    }

    /// How often `call` was invoked.
    pub fn call_count(&self, call: SimCall) -> usize {
        lock(&self.calls).iter().filter(|c| **c == call).count()
    }

    /// The credentials most recently installed, if any.
    pub fn installed_credentials(&self) -> Option<Credentials> {
        lock(&self.credentials).clone()
    }

    /// Whether the simulated interface is currently up.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn record(&self, call: SimCall) {
        lock(&self.calls).push(call);
    }

    /// Delivers an event inline. The sink is cloned out first so no
    /// simulator lock is held while the handler runs; handlers may re-enter
    /// the driver.
    fn emit(&self, event: StationEvent) {
        let sink = lock(&self.sink).clone();
        match sink {
            Some(sink) => sink(event),
            None => debug!("Simulated event {:?} dropped, no sink attached", event),
        }
    }
}

impl Default for SimStation {
    fn default() -> Self {
        Self::new()
    }
}

impl StationDriver for SimStation {
    fn enter_station_mode(&self) -> Result<(), DriverError> {
        self.record(SimCall::EnterStationMode);
        if let Some(e) = lock(&self.behavior).mode_failure.clone() {
            return Err(e);
        }
        Ok(())
    }

    fn set_credentials(&self, credentials: &Credentials) -> Result<(), DriverError> {
        self.record(SimCall::SetCredentials);
        *lock(&self.credentials) = Some(credentials.clone());
        Ok(())
    }

    fn start(&self) -> Result<(), DriverError> {
        self.record(SimCall::Start);
        if let Some(e) = lock(&self.behavior).start_failure.clone() {
            return Err(e);
        }
        // Starting an already-started station is accepted silently, like the
        // real driver; only a transition emits the event.
        if !self.started.swap(true, Ordering::AcqRel) {
            self.emit(StationEvent::Started);
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), DriverError> {
        self.record(SimCall::Stop);
        if self.started.swap(false, Ordering::AcqRel) {
            self.emit(StationEvent::Stopped);
        }
        Ok(())
    }

    fn connect(&self) -> Result<(), DriverError> {
        self.record(SimCall::Connect);
        if !self.started.load(Ordering::Acquire) {
            return Err(DriverError::Control(ERR_NOT_STARTED));
        }
        let event = {
            let mut behavior = lock(&self.behavior);
            if behavior.silent_connect {
                return Ok(());
            }
            if behavior.drops_before_grant > 0 {
                behavior.drops_before_grant -= 1;
                StationEvent::Disassociated
            } else {
                StationEvent::AddressAcquired(behavior.grant)
            }
        };
        self.emit(event);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), DriverError> {
        self.record(SimCall::Disconnect);
        Ok(())
    }

    fn scan(&self) -> Result<Vec<AccessPointRecord>, DriverError> {
        self.record(SimCall::Scan);
        let behavior = lock(&self.behavior);
        if let Some(e) = behavior.scan_failure.clone() {
            return Err(e);
        }
        if !self.started.load(Ordering::Acquire) {
            return Err(DriverError::Scan(ERR_NOT_STARTED));
        }
        Ok(behavior.access_points.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
