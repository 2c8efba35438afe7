//! Outbound notifications to the alert service.
//!
//! | Call                 | Request                     | Body               |
//! |----------------------|-----------------------------|--------------------|
//! | `check_liveness`     | `GET  /api/motion_event`    | none               |
//! | `send_motion_event`  | `POST /api/motion_event`    | [`AlertEvent`]     |
//! | `report_error`       | `POST /api/log_error`       | [`ErrorReport`]    |
//!
//! Every call is one synchronous attempt bounded by the HTTP timeout.
//! Nothing here retries; the state machine decides what happens next.

use core::fmt::Write;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::app::ports::{HttpTransport, LinkStatus};
use crate::config::DeviceConfig;
use crate::error::{ConfigError, NotifyError, ServiceFailure};

const MOTION_PATH: &str = "/api/motion_event";
const LOG_ERROR_PATH: &str = "/api/log_error";

const HTTP_OK: u16 = 200;

pub type Url = heapless::String<128>;
pub type Message = heapless::String<128>;

// ───────────────────────────────────────────────────────────────
// Payloads
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MotionDetected,
    /// Liveness check, sent as a bodyless GET.
    Ping,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MotionDetected => "motion_detected",
            Self::Ping => "ping",
        }
    }
}

/// Body of the motion trigger.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent<'a> {
    pub device: &'a str,
    pub event: EventKind,
    pub uptime_ms: u64,
}

/// Body of an error report.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport<'a> {
    pub device: &'a str,
    pub error: &'a str,
    pub uptime_ms: u64,
}

// ───────────────────────────────────────────────────────────────
// Client
// ───────────────────────────────────────────────────────────────

pub struct NotificationClient<T: HttpTransport> {
    transport: T,
    motion_url: Url,
    log_url: Url,
    device_id: heapless::String<32>,
    timeout_ms: u32,
    last_failure: Option<ServiceFailure>,
}

fn join_url(base: &str, path: &str) -> Result<Url, ConfigError> {
    let mut url = Url::new();
    url.push_str(base.trim_end_matches('/'))
        .and_then(|()| url.push_str(path))
        .map_err(|()| ConfigError::TooLong("remote_base_address"))?;
    Ok(url)
}

impl<T: HttpTransport> NotificationClient<T> {
    pub fn new(transport: T, config: &DeviceConfig) -> Result<Self, ConfigError> {
        let base = config.remote_base_address.as_str();
        Ok(Self {
            transport,
            motion_url: join_url(base, MOTION_PATH)?,
            log_url: join_url(base, LOG_ERROR_PATH)?,
            device_id: config.device_id.clone(),
            timeout_ms: config.http_timeout_ms,
            last_failure: None,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn motion_url(&self) -> &str {
        &self.motion_url
    }

    /// Most recent ping or trigger failure.
    pub fn last_failure(&self) -> Option<ServiceFailure> {
        self.last_failure
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Ping the service.  A failure is reported remotely when the link is up.
    pub fn check_liveness(&mut self, link: &impl LinkStatus, now_ms: u64) -> bool {
        let failure = match self.transport.get(&self.motion_url, self.timeout_ms) {
            Ok(HTTP_OK) => {
                info!("API: {} ok, service is ready", EventKind::Ping.as_str());
                self.last_failure = None;
                return true;
            }
            Ok(code) => ServiceFailure::Status(code),
            Err(e) => ServiceFailure::Transport(e),
        };

        let message = ping_message(failure);
        error!("{message}");
        self.last_failure = Some(failure);
        if link.link_up() {
            let _ = self.report_error(link, &message, now_ms);
        }
        false
    }

    /// Post one motion trigger.  A failure is logged and reported.
    pub fn send_motion_event(
        &mut self,
        link: &impl LinkStatus,
        now_ms: u64,
    ) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(&AlertEvent {
            device: &self.device_id,
            event: EventKind::MotionDetected,
            uptime_ms: now_ms,
        })
        .map_err(|_| NotifyError::Encode)?;

        let failure = match self.transport.post_json(&self.motion_url, &body, self.timeout_ms) {
            Ok(HTTP_OK) => {
                info!("API: {} delivered", EventKind::MotionDetected.as_str());
                return Ok(());
            }
            Ok(code) => ServiceFailure::Status(code),
            Err(e) => ServiceFailure::Transport(e),
        };

        let message = post_message(failure);
        error!("{message}");
        self.last_failure = Some(failure);
        let _ = self.report_error(link, &message, now_ms);
        Err(failure.into())
    }

    /// Post an error report.  Skipped when the link is down.
    pub fn report_error(
        &mut self,
        link: &impl LinkStatus,
        message: &str,
        now_ms: u64,
    ) -> Result<(), NotifyError> {
        if !link.link_up() {
            debug!("API: link down, error report dropped: {message}");
            return Err(NotifyError::LinkDown);
        }
        let body = serde_json::to_vec(&ErrorReport {
            device: &self.device_id,
            error: message,
            uptime_ms: now_ms,
        })
        .map_err(|_| NotifyError::Encode)?;

        match self.transport.post_json(&self.log_url, &body, self.timeout_ms) {
            Ok(HTTP_OK) => {
                info!("API: error logged remotely");
                Ok(())
            }
            Ok(code) => {
                warn!("API: error report rejected (HTTP {code})");
                Err(ServiceFailure::Status(code).into())
            }
            Err(e) => {
                warn!("API: error report failed: {e}");
                Err(ServiceFailure::Transport(e).into())
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Report texts
// ───────────────────────────────────────────────────────────────

pub fn ping_message(failure: ServiceFailure) -> Message {
    let mut msg = Message::new();
    // Truncation is acceptable for a diagnostic string.
    let _ = match failure {
        ServiceFailure::Status(code) => {
            write!(msg, "API Ping Failed: Server returned HTTP {code}")
        }
        ServiceFailure::Transport(e) => write!(msg, "API Ping Failed: {e}"),
    };
    msg
}

pub fn post_message(failure: ServiceFailure) -> Message {
    let mut msg = Message::new();
    let _ = match failure {
        ServiceFailure::Status(code) => write!(msg, "API POST Failed: HTTP {code}"),
        ServiceFailure::Transport(e) => write!(msg, "API POST Failed: {e}"),
    };
    msg
}
