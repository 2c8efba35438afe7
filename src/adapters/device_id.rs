//! Device identity and entropy derived from the ESP32 factory MAC.
//!
//! Produces a stable device name in the form `motion-XXYYZZ` (last 3 bytes
//! of the 6-byte MAC in uppercase hex), used when no `device_id` is
//! configured.

use core::fmt::Write;

use log::warn;

/// Same capacity as the configured `device_id`.
pub type DeviceIdString = heapless::String<32>;

pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte buffer, as the call requires.
    let rc = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if rc != esp_idf_svc::sys::ESP_OK {
        warn!("device_id: eFuse MAC read failed (rc={rc})");
    }
    mac
}

/// Simulation: a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `motion-XXYYZZ` from the last 3 MAC bytes.
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    if write!(id, "motion-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]).is_err() {
        warn!("device_id: name truncated");
    }
    id
}

/// Seed for the flicker / blink-jitter RNG.
#[cfg(target_os = "espidf")]
pub fn entropy_seed() -> u64 {
    // SAFETY: esp_random has no preconditions; with the radio on it draws
    // from the hardware RNG.
    let (hi, lo) = unsafe { (esp_idf_svc::sys::esp_random(), esp_idf_svc::sys::esp_random()) };
    (u64::from(hi) << 32) | u64::from(lo)
}

/// Seed for the flicker / blink-jitter RNG.
#[cfg(not(target_os = "espidf"))]
pub fn entropy_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let mac = read_mac();
    let mut seed = [0u8; 8];
    seed[2..].copy_from_slice(&mac);
    u64::from_be_bytes(seed) ^ (nanos as u64)
}
