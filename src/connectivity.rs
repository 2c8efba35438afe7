//! Wireless link bring-up with bounded retries and exponential backoff.
//!
//! [`ConnectivityManager`] sequences a [`WifiDriver`] through connect
//! cycles.  It owns the only [`ConnectionState`]; everyone else sees a
//! snapshot through [`status`](ConnectivityManager::status) or the
//! [`LinkStatus`] port.
//!
//! ## Cycle
//!
//! ```text
//!  activate ─▶ static IP? ─▶ disassociate ─▶ associate ─▶ poll address
//!                                                          │ every poll_interval
//!                                                          │ (progress tick)
//!                                               timeout ◀──┘
//!                                                  │
//!                            disassociate ─▶ deactivate ─▶ reset
//! ```
//!
//! Backoff before retry `n` is `min(backoff_s · 2^(n-1), 30)` seconds.

use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{LinkProgress, LinkStatus, WifiDriver};
use crate::config::{DeviceConfig, StaticIpConfig};
use crate::error::LinkError;

/// Cap on a single backoff delay.
pub const MAX_BACKOFF_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Delay before retry number `retry` (1-based), in milliseconds.
pub fn backoff_delay_ms(backoff_s: u32, retry: u8) -> u32 {
    if retry == 0 {
        return 0;
    }
    let factor = 2u32.saturating_pow(u32::from(retry - 1));
    backoff_s.saturating_mul(factor).min(MAX_BACKOFF_SECS) * 1000
}

// ───────────────────────────────────────────────────────────────
// Settings
// ───────────────────────────────────────────────────────────────

/// Link parameters with the lower bounds applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub timeout_s: u32,
    pub retries: u8,
    pub backoff_s: u32,
    pub poll_interval_ms: u32,
    pub static_ip: Option<StaticIpConfig>,
}

impl LinkSettings {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            timeout_s: config.timeout_s.max(1),
            retries: config.retries.max(1),
            backoff_s: config.backoff_s,
            poll_interval_ms: config.poll_interval_ms.max(1),
            static_ip: config.static_ip,
        }
    }

    /// Address polls per cycle, rounded up so the full timeout is covered.
    pub fn polls_per_cycle(&self) -> u32 {
        self.timeout_s
            .saturating_mul(1000)
            .div_ceil(self.poll_interval_ms)
            .max(1)
    }
}

// ───────────────────────────────────────────────────────────────
// Manager
// ───────────────────────────────────────────────────────────────

pub struct ConnectivityManager<D: WifiDriver> {
    driver: D,
    state: ConnectionState,
    address: Option<Ipv4Addr>,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    settings: LinkSettings,
    last_attempts: u8,
}

impl<D: WifiDriver> ConnectivityManager<D> {
    pub fn new(driver: D, config: &DeviceConfig) -> Self {
        Self {
            driver,
            state: ConnectionState::Disconnected,
            address: None,
            ssid: config.ssid.clone(),
            password: config.password.clone(),
            settings: LinkSettings::from_config(config),
            last_attempts: 0,
        }
    }

    pub fn status(&self) -> ConnectionState {
        self.state
    }

    /// Assigned address while connected.
    pub fn address(&self) -> Option<Ipv4Addr> {
        if self.state == ConnectionState::Connected {
            self.address
        } else {
            None
        }
    }

    /// Cycles run by the most recent `ensure()` that did work.
    pub fn last_attempts(&self) -> u8 {
        self.last_attempts
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Bring the link up if it is not already.
    ///
    /// Returns immediately, with no side effects, when the link is up.
    /// Missing credentials fail without running a cycle or delaying.
    pub fn ensure(&mut self, delay: &mut impl DelayNs, progress: &mut impl LinkProgress) -> bool {
        if self.link_up() {
            return true;
        }
        if self.state == ConnectionState::Connected {
            warn!("WiFi: association lost");
            self.state = ConnectionState::Disconnected;
            self.address = None;
        }
        if self.ssid.is_empty() || self.password.is_empty() {
            warn!("WiFi: credentials missing (ssid and password are both required)");
            self.state = ConnectionState::Failed;
            self.last_attempts = 0;
            return false;
        }

        let retries = self.settings.retries;
        self.state = ConnectionState::Connecting;
        for cycle in 1..=retries {
            self.last_attempts = cycle;
            info!("WiFi: connecting to '{}' (attempt {cycle}/{retries})", self.ssid);
            match self.connect_once(delay, progress) {
                Ok(address) => {
                    self.address = Some(address);
                    self.state = ConnectionState::Connected;
                    progress.settle(true, delay);
                    info!("WiFi: connected, address {address}");
                    return true;
                }
                Err(e) => {
                    warn!("WiFi: attempt {cycle} failed: {e}");
                    self.teardown();
                }
            }
            if cycle < retries {
                let wait = backoff_delay_ms(self.settings.backoff_s, cycle);
                if wait > 0 {
                    progress.backoff(cycle, wait, delay);
                }
            }
        }

        progress.settle(false, delay);
        self.state = ConnectionState::Failed;
        warn!("WiFi: giving up after {retries} attempts");
        false
    }

    /// Drop the association and power the interface down.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.driver.disassociate() {
            debug!("WiFi: disassociate on disconnect: {e}");
        }
        if let Err(e) = self.driver.activate(false) {
            debug!("WiFi: deactivate on disconnect: {e}");
        }
        self.address = None;
        self.state = ConnectionState::Disconnected;
        info!("WiFi: disconnected");
    }

    fn connect_once(
        &mut self,
        delay: &mut impl DelayNs,
        progress: &mut impl LinkProgress,
    ) -> Result<Ipv4Addr, LinkError> {
        self.driver.activate(true)?;
        if let Some(ip) = &self.settings.static_ip {
            if let Err(e) = self.driver.set_static_ip(ip) {
                warn!("WiFi: static address {} not applied: {e}", ip.ip_addr());
            }
        }
        // A stale association from an earlier cycle blocks a fresh one.
        if let Err(e) = self.driver.disassociate() {
            debug!("WiFi: disassociate before connect: {e}");
        }
        self.driver.associate(&self.ssid, &self.password)?;

        let polls = self.settings.polls_per_cycle();
        for poll in 0..=polls {
            if self.driver.is_associated() {
                if let Some(address) = self.driver.address() {
                    return Ok(address);
                }
            }
            if poll == polls {
                break;
            }
            progress.poll_tick();
            delay.delay_ms(self.settings.poll_interval_ms);
        }
        Err(LinkError::Timeout)
    }

    fn teardown(&mut self) {
        if let Err(e) = self.driver.disassociate() {
            debug!("WiFi: disassociate on teardown: {e}");
        }
        if let Err(e) = self.driver.activate(false) {
            debug!("WiFi: deactivate failed: {e}");
        }
        if let Err(e) = self.driver.reset() {
            debug!("WiFi: reset failed: {e}");
        }
        self.address = None;
    }
}

impl<D: WifiDriver> LinkStatus for ConnectivityManager<D> {
    fn link_up(&self) -> bool {
        self.state == ConnectionState::Connected && self.driver.is_associated()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
