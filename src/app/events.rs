//! Outbound application events.
//!
//! The [`AlertStateMachine`](super::service::AlertStateMachine) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them (log to serial, count in tests).

use core::net::Ipv4Addr;

use crate::error::NotifyError;
use crate::fsm::SystemState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The state machine has started (carries initial state).
    Started(SystemState),

    /// The state machine transitioned between states.
    StateChanged { from: SystemState, to: SystemState },

    /// The wireless link is up.
    LinkUp { address: Option<Ipv4Addr> },

    /// `ensure()` gave up after `attempts` cycles (0 = no credentials).
    LinkFailed { attempts: u8 },

    /// The link is up but the alert service did not answer the ping.
    ServiceUnavailable,

    /// The sensor fired while idle.
    MotionDetected,

    /// The motion trigger could not be delivered.
    NotificationFailed(NotifyError),
}
