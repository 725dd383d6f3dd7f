fn main() {
    // The ESP-IDF build system only applies when cross-compiling for the
    // ESP32 (Xtensa). Build scripts run on the host, so sniff TARGET.
    if let Ok(target) = std::env::var("TARGET") {
        if target.contains("xtensa") {
            embuild::espidf::sysenv::output();
        }
    }
}
