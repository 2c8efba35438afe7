//! Device configuration
//!
//! Every tunable of the motion-alert device.  Values come from a
//! `key=value` credentials file (baked into the image at build time, or
//! passed on the command line to the host simulator) layered over the
//! defaults below.

use core::net::Ipv4Addr;
use core::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// How the indicator behaves while an alert is flashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashPattern {
    /// Steady on/off flash at `flash_period_ms`.
    Toggle,
    /// Random on/off each period with `flicker_probability`.
    Flicker,
}

/// Optional static addressing for the station interface (octets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIpConfig {
    pub ip: [u8; 4],
    pub mask: [u8; 4],
    pub gateway: [u8; 4],
    pub dns: [u8; 4],
}

impl StaticIpConfig {
    pub fn ip_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ip)
    }
}

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Network ---
    /// WiFi SSID.  Empty means "not provisioned".
    pub ssid: heapless::String<32>,
    /// WiFi passphrase (WPA2, 8-64 bytes).  Required alongside `ssid`.
    pub password: heapless::String<64>,
    /// Base URL of the alert service, e.g. `http://192.168.5.187:5000`.
    pub remote_base_address: heapless::String<96>,
    /// Static addressing; `None` uses DHCP.
    pub static_ip: Option<StaticIpConfig>,
    /// Device name sent in every payload.  Empty derives one from the MAC.
    pub device_id: heapless::String<32>,

    // --- Pins ---
    pub motion_pin: i32,
    pub indicator_pin: i32,

    // --- Alert ---
    /// How long the indicator flashes after motion (ms)
    pub flash_duration_ms: u32,
    /// Quiet period after motion during which new motion is ignored (ms)
    pub cooldown_duration_ms: u32,
    pub flash_pattern: FlashPattern,
    /// Period of the flash timer (ms)
    pub flash_period_ms: u32,
    /// On-probability per flicker step (0.0 - 1.0)
    pub flicker_probability: f32,

    // --- Link ---
    /// Per-cycle address acquisition timeout (seconds)
    pub timeout_s: u32,
    /// Connection cycles per `ensure()`
    pub retries: u8,
    /// First backoff delay (seconds), doubled per failed cycle
    pub backoff_s: u32,
    /// Address poll interval (ms)
    pub poll_interval_ms: u32,

    // --- Service ---
    /// Per-request HTTP timeout (ms)
    pub http_timeout_ms: u32,

    // --- Timing ---
    /// Main loop tick (ms)
    pub tick_interval_ms: u32,
    /// Sleep after a failed bring-up before retrying Init (ms)
    pub init_retry_delay_ms: u32,
    /// Period of the timer service that fires scheduled actions (ms)
    pub timer_resolution_ms: u32,

    // --- Boot blink ---
    pub blink_jitter_min_ms: u32,
    pub blink_jitter_max_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            remote_base_address: fixed("http://192.168.5.187:5000"),
            static_ip: None,
            device_id: fixed("ESP32_Motion_Sensor"),

            motion_pin: pins::MOTION_GPIO,
            indicator_pin: pins::INDICATOR_GPIO,

            flash_duration_ms: 8_000,
            cooldown_duration_ms: 10_000,
            flash_pattern: FlashPattern::Toggle,
            flash_period_ms: 200,
            flicker_probability: 0.3,

            timeout_s: 15,
            retries: 3,
            backoff_s: 2,
            poll_interval_ms: 500,

            http_timeout_ms: 5_000,

            tick_interval_ms: 50,
            init_retry_delay_ms: 5_000,
            timer_resolution_ms: 10,

            blink_jitter_min_ms: 30,
            blink_jitter_max_ms: 200,
        }
    }
}

/// Build a fixed-capacity string from a literal known to fit.
fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConfigError::ValidationFailed(
            "ssid must be 1-32 printable ASCII bytes",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConfigError> {
    if password.len() < 8 || password.len() > 64 {
        return Err(ConfigError::ValidationFailed("password must be 8-64 bytes for WPA2"));
    }
    Ok(())
}

impl DeviceConfig {
    /// Whether both SSID and password have been provisioned.  Open
    /// networks are not supported.
    pub fn has_credentials(&self) -> bool {
        !self.ssid.is_empty() && !self.password.is_empty()
    }

    /// Flash duration actually programmed into the flash-stop timer.
    ///
    /// The flash must end strictly before the cooldown does.  A flash that
    /// is not shorter than the cooldown is cut to one tick before it.
    pub fn effective_flash_ms(&self) -> u32 {
        if self.flash_duration_ms < self.cooldown_duration_ms {
            self.flash_duration_ms
        } else {
            self.cooldown_duration_ms
                .saturating_sub(self.tick_interval_ms.max(1))
        }
    }

    /// Range-check every field.  Missing credentials are not an error
    /// here: the connectivity manager reports them as a link failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ssid.is_empty() {
            validate_ssid(&self.ssid)?;
        }
        if !self.password.is_empty() {
            validate_password(&self.password)?;
        }

        let base = self.remote_base_address.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(
                "remote_base_address must start with http:// or https://",
            ));
        }
        if !(0..=pins::MAX_GPIO).contains(&self.motion_pin) {
            return Err(ConfigError::ValidationFailed("motion_pin out of range"));
        }
        if !(0..=pins::MAX_OUTPUT_GPIO).contains(&self.indicator_pin) {
            return Err(ConfigError::ValidationFailed(
                "indicator_pin must be an output-capable GPIO",
            ));
        }
        if self.motion_pin == self.indicator_pin {
            return Err(ConfigError::ValidationFailed(
                "motion_pin and indicator_pin must differ",
            ));
        }
        if self.cooldown_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed("cooldown_duration_ms must be > 0"));
        }
        if self.flash_period_ms == 0 || self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "flash_period_ms and tick_interval_ms must be > 0",
            ));
        }
        if self.poll_interval_ms == 0 || self.timer_resolution_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms and timer_resolution_ms must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.flicker_probability) {
            return Err(ConfigError::ValidationFailed(
                "flicker_probability must be within 0.0-1.0",
            ));
        }
        if self.blink_jitter_min_ms == 0 || self.blink_jitter_min_ms > self.blink_jitter_max_ms {
            return Err(ConfigError::ValidationFailed(
                "blink jitter window must satisfy 0 < min <= max",
            ));
        }
        if self.flash_duration_ms >= self.cooldown_duration_ms {
            warn!(
                "Config: flash {} ms >= cooldown {} ms, flash clamped to {} ms",
                self.flash_duration_ms,
                self.cooldown_duration_ms,
                self.effective_flash_ms()
            );
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // key=value loader
    // -----------------------------------------------------------------------

    /// Parse `key=value` text over the defaults, then validate.
    pub fn from_kv_str(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_kv_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `key=value` lines onto `self`.
    ///
    /// Blank lines and `#` comments are skipped, keys are case-insensitive,
    /// and surrounding quotes on values are stripped.  Unknown keys are
    /// logged and ignored.
    pub fn apply_kv_str(&mut self, text: &str) -> Result<(), ConfigError> {
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!("Config: ignoring line without '=': {}", line);
                continue;
            };
            let key = key.trim();
            let value = unquote(value.trim());
            self.apply_entry(key, value)?;
        }
        Ok(())
    }

    fn apply_entry(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let key_lower = lowercase::<32>(key);
        match key_lower.as_str() {
            "ssid" | "wifi_ssid" => self.ssid = set_str(value, "ssid")?,
            "password" | "wifi_pass" | "wifi_password" => {
                self.password = set_str(value, "password")?;
            }
            "remote_base_address" | "base_url" => {
                let trimmed = value.trim_end_matches('/');
                self.remote_base_address = set_str(trimmed, "remote_base_address")?;
            }
            "device_id" => self.device_id = set_str(value, "device_id")?,
            "static_ip" => self.static_ip = parse_static_ip(value)?,
            "motion_pin" => self.motion_pin = parse(value, "motion_pin")?,
            "indicator_pin" => self.indicator_pin = parse(value, "indicator_pin")?,
            "flash_duration_ms" => self.flash_duration_ms = parse(value, "flash_duration_ms")?,
            "cooldown_duration_ms" => {
                self.cooldown_duration_ms = parse(value, "cooldown_duration_ms")?;
            }
            "flash_pattern" => {
                self.flash_pattern = match lowercase::<16>(value).as_str() {
                    "toggle" => FlashPattern::Toggle,
                    "flicker" => FlashPattern::Flicker,
                    _ => return Err(ConfigError::InvalidValue("flash_pattern")),
                };
            }
            "flash_period_ms" => self.flash_period_ms = parse(value, "flash_period_ms")?,
            "flicker_probability" => {
                self.flicker_probability = parse(value, "flicker_probability")?;
            }
            "timeout_s" => self.timeout_s = parse(value, "timeout_s")?,
            "retries" => self.retries = parse(value, "retries")?,
            "backoff_s" => self.backoff_s = parse(value, "backoff_s")?,
            "poll_interval_ms" => self.poll_interval_ms = parse(value, "poll_interval_ms")?,
            "http_timeout_ms" => self.http_timeout_ms = parse(value, "http_timeout_ms")?,
            "tick_interval_ms" => self.tick_interval_ms = parse(value, "tick_interval_ms")?,
            "init_retry_delay_ms" => {
                self.init_retry_delay_ms = parse(value, "init_retry_delay_ms")?;
            }
            "timer_resolution_ms" => {
                self.timer_resolution_ms = parse(value, "timer_resolution_ms")?;
            }
            "blink_jitter_min_ms" => {
                self.blink_jitter_min_ms = parse(value, "blink_jitter_min_ms")?;
            }
            "blink_jitter_max_ms" => {
                self.blink_jitter_max_ms = parse(value, "blink_jitter_max_ms")?;
            }
            _ => warn!("Config: unknown key '{}' ignored", key),
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn lowercase<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c.to_ascii_lowercase()).is_err() {
            break;
        }
    }
    out
}

fn set_str<const N: usize>(value: &str, key: &'static str) -> Result<heapless::String<N>, ConfigError> {
    let mut out = heapless::String::new();
    out.push_str(value).map_err(|()| ConfigError::TooLong(key))?;
    Ok(out)
}

fn parse<T: FromStr>(value: &str, key: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue(key))
}

/// `ip,mask,gateway,dns`
fn parse_static_ip(value: &str) -> Result<Option<StaticIpConfig>, ConfigError> {
    if value.is_empty() {
        return Ok(None);
    }
    let mut parts = value.split(',').map(str::trim);
    let mut next = || -> Result<[u8; 4], ConfigError> {
        parts
            .next()
            .ok_or(ConfigError::InvalidValue("static_ip"))?
            .parse::<Ipv4Addr>()
            .map(|addr| addr.octets())
            .map_err(|_| ConfigError::InvalidValue("static_ip"))
    };
    let config = StaticIpConfig {
        ip: next()?,
        mask: next()?,
        gateway: next()?,
        dns: next()?,
    };
    Ok(Some(config))
}
