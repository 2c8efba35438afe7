//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`AppEvent`] as one tagged
//! line to the logger (ESP-IDF console on the device, `env_logger` on the
//! host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::LinkUp { address } => match address {
                Some(ip) => info!("LINK  | up {ip}"),
                None => info!("LINK  | up (no address)"),
            },
            AppEvent::LinkFailed { attempts } => {
                warn!("LINK  | failed after {attempts} attempts");
            }
            AppEvent::ServiceUnavailable => {
                warn!("LINK  | alert service unavailable");
            }
            AppEvent::MotionDetected => {
                info!("ALERT | motion detected");
            }
            AppEvent::NotificationFailed(e) => {
                warn!("ALERT | notification failed: {e}");
            }
        }
    }
}
