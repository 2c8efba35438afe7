//! WiFi station-mode driver.
//!
//! Implements [`WifiDriver`], the primitive operations the
//! [`ConnectivityManager`](crate::connectivity::ConnectivityManager)
//! sequences into connect cycles.  Retry and backoff policy live in the
//! manager; this adapter only talks to the radio.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi`.
//! - **all other targets**: a simulated station that associates a fixed
//!   latency after `associate()` is called.

use core::net::Ipv4Addr;

use log::{debug, info};

use crate::app::ports::WifiDriver;
use crate::config::StaticIpConfig;
use crate::error::LinkError;

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use super::*;

    use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::ipv4::{
        ClientConfiguration as IpClientConfiguration, ClientSettings as IpClientSettings,
        Configuration as IpConfiguration, Mask, Subnet,
    };
    use esp_idf_svc::netif::{EspNetif, NetifConfiguration};
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::wifi::EspWifi;

    fn driver_err(e: EspError) -> LinkError {
        LinkError::Driver(e.code())
    }

    pub struct WifiStation {
        wifi: EspWifi<'static>,
        static_ip_applied: bool,
    }

    impl WifiStation {
        pub fn new(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: Option<EspDefaultNvsPartition>,
        ) -> Result<Self, EspError> {
            Ok(Self {
                wifi: EspWifi::new(modem, sysloop, nvs)?,
                static_ip_applied: false,
            })
        }
    }

    impl WifiDriver for WifiStation {
        fn activate(&mut self, on: bool) -> Result<(), LinkError> {
            let started = self.wifi.is_started().map_err(driver_err)?;
            match (on, started) {
                (true, false) => self.wifi.start().map_err(driver_err),
                (false, true) => self.wifi.stop().map_err(driver_err),
                _ => Ok(()),
            }
        }

        fn is_active(&self) -> bool {
            self.wifi.is_started().unwrap_or(false)
        }

        fn associate(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
            if ssid.is_empty() || password.is_empty() {
                return Err(LinkError::NoCredentials);
            }
            let client = ClientConfiguration {
                ssid: ssid.try_into().map_err(|_| LinkError::InvalidCredentials)?,
                password: password
                    .try_into()
                    .map_err(|_| LinkError::InvalidCredentials)?,
                auth_method: AuthMethod::WPAWPA2Personal,
                ..Default::default()
            };
            self.wifi
                .set_configuration(&Configuration::Client(client))
                .map_err(driver_err)?;
            self.wifi.connect().map_err(driver_err)
        }

        fn disassociate(&mut self) -> Result<(), LinkError> {
            if self.wifi.is_connected().unwrap_or(false) {
                self.wifi.disconnect().map_err(driver_err)?;
            }
            Ok(())
        }

        fn is_associated(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false)
        }

        fn address(&self) -> Option<Ipv4Addr> {
            let info = self.wifi.sta_netif().get_ip_info().ok()?;
            (!info.ip.is_unspecified()).then_some(info.ip)
        }

        fn set_static_ip(&mut self, config: &StaticIpConfig) -> Result<(), LinkError> {
            if self.static_ip_applied {
                return Ok(());
            }
            let mask = Mask::try_from(Ipv4Addr::from(config.mask))
                .map_err(|_| LinkError::InvalidCredentials)?;
            let conf = NetifConfiguration {
                ip_configuration: Some(IpConfiguration::Client(IpClientConfiguration::Fixed(
                    IpClientSettings {
                        ip: config.ip_addr(),
                        subnet: Subnet {
                            gateway: Ipv4Addr::from(config.gateway),
                            mask,
                        },
                        dns: Some(Ipv4Addr::from(config.dns)),
                        secondary_dns: None,
                    },
                ))),
                ..NetifConfiguration::wifi_default_client()
            };
            let netif = EspNetif::new_with_conf(&conf).map_err(driver_err)?;
            self.wifi.swap_netif_sta(netif).map_err(driver_err)?;
            self.static_ip_applied = true;
            info!("WiFi: static address {}", config.ip_addr());
            Ok(())
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation station
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod platform {
    use super::*;

    use crate::adapters::time::uptime_ms;

    const SIM_DHCP_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);

    pub struct WifiStation {
        active: bool,
        latency_ms: u64,
        associated_at: Option<u64>,
        static_ip: Option<Ipv4Addr>,
    }

    impl WifiStation {
        /// A station that reports association `latency_ms` after
        /// `associate()`.
        pub fn new(latency_ms: u64) -> Self {
            Self {
                active: false,
                latency_ms,
                associated_at: None,
                static_ip: None,
            }
        }
    }

    impl WifiDriver for WifiStation {
        fn activate(&mut self, on: bool) -> Result<(), LinkError> {
            debug!("WiFi(sim): interface {}", if on { "up" } else { "down" });
            self.active = on;
            if !on {
                self.associated_at = None;
            }
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn associate(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
            if !self.active {
                return Err(LinkError::Driver(-1));
            }
            if ssid.is_empty() || password.is_empty() {
                return Err(LinkError::NoCredentials);
            }
            info!("WiFi(sim): associating with '{ssid}'");
            self.associated_at = Some(uptime_ms() + self.latency_ms);
            Ok(())
        }

        fn disassociate(&mut self) -> Result<(), LinkError> {
            self.associated_at = None;
            Ok(())
        }

        fn is_associated(&self) -> bool {
            self.active && self.associated_at.is_some_and(|at| uptime_ms() >= at)
        }

        fn address(&self) -> Option<Ipv4Addr> {
            self.is_associated()
                .then(|| self.static_ip.unwrap_or(SIM_DHCP_ADDRESS))
        }

        fn set_static_ip(&mut self, config: &StaticIpConfig) -> Result<(), LinkError> {
            self.static_ip = Some(config.ip_addr());
            Ok(())
        }
    }

}

pub use platform::WifiStation;
