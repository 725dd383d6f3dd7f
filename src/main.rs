//! WiFi station demo binary.
//!
//! On ESP32 hardware this joins the network given at compile time:
//!
//!   WIFI_SSID="MyNetwork" WIFI_PASSPHRASE="secret" cargo build --features esp32
//!
//! On the host it runs the same manager against a scripted radio, which is
//! handy for eyeballing the log output without a device.

use log::{error, info};

/// WiFi SSID - set via WIFI_SSID environment variable at compile time.
#[cfg(feature = "esp32")]
const WIFI_SSID: Option<&str> = option_env!("WIFI_SSID");

/// WiFi passphrase - set via WIFI_PASSPHRASE environment variable at compile
/// time. Empty for open networks.
#[cfg(feature = "esp32")]
const WIFI_PASSPHRASE: Option<&str> = option_env!("WIFI_PASSPHRASE");

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("ESP-IDF initialized");
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn main() {
    platform_init();

    info!("=== WiFi station starting ===");

    #[cfg(feature = "esp32")]
    info!("Platform: ESP32");
    #[cfg(not(feature = "esp32"))]
    info!("Platform: Host (simulated radio)");

    run();
}

#[cfg(feature = "esp32")]
fn run() {
    use std::sync::Arc;
    use std::time::Duration;

    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use wifi_station_esp32::{
        classify_signal, AuthMode, ConnectionManager, Credentials, EspStation, EventBridge,
        RetryLimit,
    };

    let peripherals = match Peripherals::take() {
        Ok(peripherals) => peripherals,
        Err(e) => {
            error!("Failed to take peripherals: {}", e);
            return;
        }
    };
    let sysloop = match EspSystemEventLoop::take() {
        Ok(sysloop) => sysloop,
        Err(e) => {
            error!("Failed to take the system event loop: {}", e);
            return;
        }
    };
    let station = match EspStation::new(peripherals.modem, sysloop.clone()) {
        Ok(station) => Arc::new(station),
        Err(e) => {
            error!("Failed to bring up the WiFi driver: {}", e);
            return;
        }
    };

    let manager = Arc::new(ConnectionManager::new(Arc::clone(&station)));
    let _bridge = match EventBridge::attach(&sysloop, &manager) {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Failed to subscribe to system events: {}", e);
            return;
        }
    };

    // Survey the neighborhood before connecting.
    for record in manager.scan() {
        info!("{} signal is {}", record, classify_signal(record.rssi));
    }

    let ssid = WIFI_SSID.unwrap_or("");
    if ssid.is_empty() {
        error!("WIFI_SSID was not set at compile time, idling");
    } else {
        let passphrase = WIFI_PASSPHRASE.unwrap_or("");
        let credentials = Credentials::personal(ssid, passphrase, AuthMode::Wpa2Personal);
        if manager.connect(&credentials, RetryLimit::Limited(5)) {
            info!("Online at {}", manager.ip_info());
        } else {
            error!("Could not join {}", ssid);
        }
    }

    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}

#[cfg(not(feature = "esp32"))]
fn run() {
    use std::net::Ipv4Addr;
    use std::sync::{Arc, Weak};

    use log::warn;
    use wifi_station_esp32::{
        classify_signal, AccessPointRecord, AuthMode, ConnectionManager, Credentials, IpInfo,
        RetryLimit, SimBehavior, SimStation,
    };

    // A radio that drops the first two attempts, then hands out an address.
    let behavior = SimBehavior {
        drops_before_grant: 2,
        grant: IpInfo::new(
            Ipv4Addr::new(192, 168, 1, 10),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(192, 168, 1, 1),
        ),
        access_points: vec![
            AccessPointRecord {
                bssid: [0xAA, 0xBB, 0xCC, 0x00, 0x11, 0x22],
                ssid: "HomeNet".to_string(),
                rssi: -48,
                supports_11b: true,
                supports_11g: true,
                supports_11n: true,
            },
            AccessPointRecord {
                bssid: [0xAA, 0xBB, 0xCC, 0x33, 0x44, 0x55],
                ssid: "Depths of the parking garage".to_string(),
                rssi: -81,
                supports_11b: true,
                supports_11g: true,
                supports_11n: false,
            },
        ],
        ..Default::default()
    };

    let driver = Arc::new(SimStation::with_behavior(behavior));
    let manager = Arc::new(ConnectionManager::new(Arc::clone(&driver)));
    let sink: Weak<ConnectionManager<SimStation>> = Arc::downgrade(&manager);
    driver.attach(move |event| {
        if let Some(manager) = sink.upgrade() {
            manager.handle_event(event);
        }
    });

    for record in manager.scan() {
        info!("{} signal is {}", record, classify_signal(record.rssi));
    }

    let credentials = Credentials::personal("HomeNet", "correct-horse", AuthMode::Wpa2Personal);
    if manager.connect(&credentials, RetryLimit::Limited(3)) {
        info!("Online at {}", manager.ip_info());
    } else {
        error!("Could not join HomeNet");
    }

    if let Err(e) = manager.disconnect() {
        warn!("Disconnect failed: {}", e);
    }
}
