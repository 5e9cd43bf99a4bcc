fn main() {
    println!("cargo:rerun-if-env-changed=FARMSYNC_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=FARMSYNC_WIFI_PASS");

    // Host builds (tests, simulation) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
