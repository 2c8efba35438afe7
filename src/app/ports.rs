//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AlertStateMachine (domain)
//! ```
//!
//! Driven adapters (WiFi station, HTTP client, PIR input, clock, event
//! sinks) implement these traits.  The domain consumes them via generics,
//! so the control logic never touches ESP-IDF directly and every path can
//! be exercised on the host with mocks.

use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;

use crate::config::StaticIpConfig;
use crate::error::{LinkError, TransportError};

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// WiFi driver port (driven adapter: domain → radio)
// ───────────────────────────────────────────────────────────────

/// Station-mode primitives the connectivity manager sequences.
///
/// Every call is non-blocking: `associate` only initiates association,
/// and the manager polls `is_associated` / `address` for completion.
pub trait WifiDriver {
    /// Power the station interface up (`true`) or down (`false`).
    fn activate(&mut self, on: bool) -> Result<(), LinkError>;

    /// Whether the interface is powered.
    fn is_active(&self) -> bool;

    /// Start association with the given access point.
    fn associate(&mut self, ssid: &str, password: &str) -> Result<(), LinkError>;

    /// Drop any current or pending association.
    fn disassociate(&mut self) -> Result<(), LinkError>;

    /// Whether the station is associated with an access point.
    fn is_associated(&self) -> bool;

    /// Assigned IPv4 address, once the interface has one.
    fn address(&self) -> Option<Ipv4Addr>;

    /// Apply static addressing before association.
    fn set_static_ip(&mut self, config: &StaticIpConfig) -> Result<(), LinkError> {
        let _ = config;
        Ok(())
    }

    /// Return the driver to a clean state after a failed cycle.
    /// Drivers without a reset primitive keep the default no-op.
    fn reset(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}

/// Read-only link snapshot handed to the notification client.
pub trait LinkStatus {
    fn link_up(&self) -> bool;
}

/// Side effects the connectivity manager performs while it waits, so the
/// device shows visible progress.
pub trait LinkProgress {
    /// One address poll elapsed without success.
    fn poll_tick(&mut self) {}

    /// Wait `delay_ms` before retry number `retry`.  Implementations own
    /// the wait and must spend all of it.
    fn backoff(&mut self, retry: u8, delay_ms: u32, delay: &mut impl DelayNs) {
        let _ = retry;
        delay.delay_ms(delay_ms);
    }

    /// `ensure()` finished, successfully or not.
    fn settle(&mut self, connected: bool, delay: &mut impl DelayNs) {
        let _ = (connected, delay);
    }
}

// ───────────────────────────────────────────────────────────────
// HTTP transport port
// ───────────────────────────────────────────────────────────────

/// Synchronous HTTP client.  Each call blocks for at most `timeout_ms`
/// and returns the response status code.
pub trait HttpTransport {
    fn get(&mut self, url: &str, timeout_ms: u32) -> Result<u16, TransportError>;

    fn post_json(&mut self, url: &str, body: &[u8], timeout_ms: u32)
    -> Result<u16, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor + time ports
// ───────────────────────────────────────────────────────────────

/// Read-side port for the motion sensor.
pub trait MotionSensor {
    /// `true` while the sensor reports motion.
    fn motion_detected(&mut self) -> bool;
}

/// Monotonic millisecond clock shared by the main loop and the timer
/// context.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// Outbound port for structured application events.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
