//! System event loop bridge.
//!
//! ESP-IDF reports station lifecycle changes on its system event loop task.
//! [`EventBridge`] subscribes to the WiFi and IP topics there and forwards
//! the interesting notifications to the manager as [`StationEvent`]s.
//!
//! The bridge holds the manager weakly: once the manager is gone, further
//! notifications are ignored. Keep the bridge alive for as long as events
//! should flow; dropping it unsubscribes.

use std::net::Ipv4Addr;
use std::sync::{Arc, Weak};

use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::wifi::WifiEvent;
use esp_idf_sys::EspError;

use crate::station::driver::StationDriver;
use crate::station::event::{IpInfo, StationEvent};
use crate::station::manager::ConnectionManager;

/// Live subscriptions feeding a [`ConnectionManager`].
pub struct EventBridge {
    _wifi: EspSubscription<'static, System>,
    _ip: EspSubscription<'static, System>,
}

impl EventBridge {
    /// Subscribes to the WiFi and IP event topics and routes them into
    /// `manager`.
    pub fn attach<D>(
        sysloop: &EspSystemEventLoop,
        manager: &Arc<ConnectionManager<D>>,
    ) -> Result<Self, EspError>
    where
        D: StationDriver + 'static,
    {
        let sink: Weak<ConnectionManager<D>> = Arc::downgrade(manager);
        let wifi = sysloop.subscribe::<WifiEvent, _>(move |event| {
            if let Some(manager) = sink.upgrade() {
                match event {
                    WifiEvent::StaStarted => manager.handle_event(StationEvent::Started),
                    WifiEvent::StaStopped => manager.handle_event(StationEvent::Stopped),
                    WifiEvent::StaDisconnected(_) => {
                        manager.handle_event(StationEvent::Disassociated)
                    }
                    _ => (),
                }
            }
        })?;

        let sink: Weak<ConnectionManager<D>> = Arc::downgrade(manager);
        let ip = sysloop.subscribe::<IpEvent, _>(move |event| {
            if let Some(manager) = sink.upgrade() {
                if let IpEvent::DhcpIpAssigned(assignment) = event {
                    let settings = assignment.ip_info();
                    let snapshot = IpInfo::new(
                        settings.ip,
                        Ipv4Addr::from(settings.subnet.mask),
                        settings.subnet.gateway,
                    );
                    manager.handle_event(StationEvent::AddressAcquired(snapshot));
                }
            }
        })?;

        Ok(Self {
            _wifi: wifi,
            _ip: ip,
        })
    }
}
