//! Board clock and blocking delay.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` for uptime and
//!   FreeRTOS / ROM delays.
//! - **`not(target_os = "espidf")`**: a process-wide `Instant` epoch and
//!   `std::thread::sleep`.
//!
//! [`uptime_ms`] is a free function because both execution contexts
//! need the same clock: the main loop through [`SystemClock`], and the
//! timer service callback directly.

use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

/// Milliseconds since boot (monotonic).
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u64 {
    // SAFETY: esp_timer_get_time has no preconditions once the esp_timer
    // component is up, which happens before app_main.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
}

/// Milliseconds since the first call in this process (monotonic).
#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let elapsed = EPOCH.get_or_init(Instant::now).elapsed();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Clock + delay for the main loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        uptime_ms()
    }
}

#[cfg(target_os = "espidf")]
impl DelayNs for SystemClock {
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_svc::hal::delay::Ets::delay_us(ns.div_ceil(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        // Yields to other tasks, unlike the busy-wait above.
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayNs for SystemClock {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
