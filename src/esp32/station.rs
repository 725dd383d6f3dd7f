//! Station primitives on the ESP-IDF WiFi driver.
//!
//! Each trait method maps to one or two driver calls and returns without
//! waiting for the radio; outcomes arrive later as events on the system
//! event loop (see [`events`](super::events)).

use std::sync::{Mutex, MutexGuard};

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{
    AccessPointInfo, AuthMethod, ClientConfiguration, Configuration, EspWifi, Protocol,
};
use esp_idf_sys::{esp, EspError};
use log::warn;

use crate::station::credentials::{AuthMode, Credentials, EnterpriseCredentials, Phase2Method};
use crate::station::driver::{DriverError, StationDriver};
use crate::station::scan::AccessPointRecord;

/// [`StationDriver`] backed by the ESP32 radio.
///
/// The driver object is kept behind a mutex so the manager can call in from
/// any task; events are delivered on the system event loop task, never from
/// inside these calls, so a handler that re-enters the driver does not
/// deadlock.
pub struct EspStation {
    wifi: Mutex<EspWifi<'static>>,
}

impl EspStation {
    /// Takes ownership of the modem and registers the WiFi driver with the
    /// system event loop.
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, None)?;
        Ok(Self {
            wifi: Mutex::new(wifi),
        })
    }

    fn lock(&self) -> MutexGuard<'_, EspWifi<'static>> {
        self.wifi.lock().unwrap_or_else(|poisoned| {
            warn!("WiFi driver mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl StationDriver for EspStation {
    fn enter_station_mode(&self) -> Result<(), DriverError> {
        let mut wifi = self.lock();
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .map_err(configure_err)
    }

    fn set_credentials(&self, credentials: &Credentials) -> Result<(), DriverError> {
        let mut wifi = self.lock();
        match credentials {
            Credentials::Personal(personal) => {
                let configuration = Configuration::Client(ClientConfiguration {
                    ssid: personal
                        .ssid
                        .display_lossy()
                        .as_ref()
                        .try_into()
                        .map_err(|_| invalid_arg())?,
                    password: personal
                        .passphrase
                        .display_lossy()
                        .as_ref()
                        .try_into()
                        .map_err(|_| invalid_arg())?,
                    auth_method: auth_method(personal.auth_mode),
                    ..Default::default()
                });
                wifi.set_configuration(&configuration).map_err(configure_err)?;
            }
            Credentials::Enterprise(enterprise) => {
                let configuration = Configuration::Client(ClientConfiguration {
                    ssid: enterprise
                        .ssid
                        .display_lossy()
                        .as_ref()
                        .try_into()
                        .map_err(|_| invalid_arg())?,
                    auth_method: AuthMethod::WPA2Enterprise,
                    ..Default::default()
                });
                wifi.set_configuration(&configuration).map_err(configure_err)?;
                enable_enterprise(enterprise)?;
            }
        }
        // Legacy 11b rates stay off for both credential kinds.
        esp!(unsafe {
            esp_idf_sys::esp_wifi_config_11b_rate(esp_idf_sys::wifi_interface_t_WIFI_IF_STA, true)
        })
        .map_err(configure_err)
    }

    fn start(&self) -> Result<(), DriverError> {
        self.lock().start().map_err(control_err)
    }

    fn stop(&self) -> Result<(), DriverError> {
        self.lock().stop().map_err(control_err)
    }

    fn connect(&self) -> Result<(), DriverError> {
        self.lock().connect().map_err(control_err)
    }

    fn disconnect(&self) -> Result<(), DriverError> {
        self.lock().disconnect().map_err(control_err)
    }

    fn scan(&self) -> Result<Vec<AccessPointRecord>, DriverError> {
        let mut wifi = self.lock();
        let found = wifi.scan().map_err(scan_err)?;
        Ok(found.iter().map(record_from).collect())
    }
}

/// Installs the EAP-TTLS material and switches the supplicant to
/// enterprise authentication.
///
/// The radio presents `anonymous_identity` as the outer identity before
/// the TLS tunnel comes up; `identity` is the username the phase-2 method
/// authenticates inside it.
fn enable_enterprise(enterprise: &EnterpriseCredentials) -> Result<(), DriverError> {
    let anonymous = enterprise.anonymous_identity.as_bytes();
    let identity = enterprise.identity.as_bytes();
    let passphrase = enterprise.passphrase.as_bytes();

    unsafe {
        esp!(esp_idf_sys::esp_eap_client_set_identity(
            anonymous.as_ptr(),
            anonymous.len() as i32
        ))
        .map_err(configure_err)?;
        esp!(esp_idf_sys::esp_eap_client_set_username(
            identity.as_ptr(),
            identity.len() as i32
        ))
        .map_err(configure_err)?;
        esp!(esp_idf_sys::esp_eap_client_set_password(
            passphrase.as_ptr(),
            passphrase.len() as i32
        ))
        .map_err(configure_err)?;
        esp!(esp_idf_sys::esp_eap_client_set_ttls_phase2_method(
            phase2_type(enterprise.phase2)
        ))
        .map_err(configure_err)?;
        esp!(esp_idf_sys::esp_wifi_sta_enterprise_enable()).map_err(configure_err)?;
    }
    Ok(())
}

fn auth_method(mode: AuthMode) -> AuthMethod {
    match mode {
        AuthMode::Open => AuthMethod::None,
        AuthMode::Wep => AuthMethod::WEP,
        AuthMode::Wpa => AuthMethod::WPA,
        AuthMode::Wpa2Personal => AuthMethod::WPA2Personal,
        AuthMode::WpaWpa2Personal => AuthMethod::WPAWPA2Personal,
        AuthMode::Wpa3Personal => AuthMethod::WPA3Personal,
        AuthMode::Wpa2Wpa3Personal => AuthMethod::WPA2WPA3Personal,
    }
}

fn phase2_type(method: Phase2Method) -> esp_idf_sys::esp_eap_ttls_phase2_types {
    match method {
        Phase2Method::Eap => esp_idf_sys::esp_eap_ttls_phase2_types_ESP_EAP_TTLS_PHASE2_EAP,
        Phase2Method::Mschapv2 => {
            esp_idf_sys::esp_eap_ttls_phase2_types_ESP_EAP_TTLS_PHASE2_MSCHAPV2
        }
        Phase2Method::Mschap => esp_idf_sys::esp_eap_ttls_phase2_types_ESP_EAP_TTLS_PHASE2_MSCHAP,
        Phase2Method::Pap => esp_idf_sys::esp_eap_ttls_phase2_types_ESP_EAP_TTLS_PHASE2_PAP,
        Phase2Method::Chap => esp_idf_sys::esp_eap_ttls_phase2_types_ESP_EAP_TTLS_PHASE2_CHAP,
    }
}

fn record_from(info: &AccessPointInfo) -> AccessPointRecord {
    let protocols = info.protocols;
    AccessPointRecord {
        bssid: info.bssid,
        ssid: info.ssid.as_str().to_string(),
        rssi: info.signal_strength,
        supports_11b: protocols.contains(Protocol::P802D11B)
            || protocols.contains(Protocol::P802D11BG)
            || protocols.contains(Protocol::P802D11BGN)
            || protocols.contains(Protocol::P802D11BGNLR)
            || protocols.contains(Protocol::P802D11BGNAX),
        supports_11g: protocols.contains(Protocol::P802D11BG)
            || protocols.contains(Protocol::P802D11BGN)
            || protocols.contains(Protocol::P802D11BGNLR)
            || protocols.contains(Protocol::P802D11BGNAX),
        supports_11n: protocols.contains(Protocol::P802D11BGN)
            || protocols.contains(Protocol::P802D11BGNLR)
            || protocols.contains(Protocol::P802D11BGNAX),
    }
}

fn invalid_arg() -> DriverError {
    DriverError::Configure(esp_idf_sys::ESP_ERR_INVALID_ARG)
}

fn configure_err(e: EspError) -> DriverError {
    DriverError::Configure(e.code())
}

fn control_err(e: EspError) -> DriverError {
    DriverError::Control(e.code())
}

fn scan_err(e: EspError) -> DriverError {
    if e.code() == esp_idf_sys::ESP_ERR_NO_MEM {
        DriverError::OutOfMemory
    } else {
        DriverError::Scan(e.code())
    }
}
