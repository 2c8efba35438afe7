//! Unified error types for the motion-alert firmware.
//!
//! One `Error` enum that every subsystem converts into, so the boot path
//! and the control loop handle failures uniformly.  All variants are
//! `Copy`: they are passed through the state machine and the event sink
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The wireless link could not be brought up.
    Link(LinkError),
    /// An outbound notification failed.
    Notify(NotifyError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Link errors (association / address acquisition)
// ---------------------------------------------------------------------------

/// Link-layer failures.  Retried inside the connectivity manager, never
/// reported remotely (there is no link to report over).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No SSID configured.
    NoCredentials,
    /// Credentials rejected by the driver (too long, bad encoding).
    InvalidCredentials,
    /// No address was assigned within the cycle timeout.
    Timeout,
    /// The WiFi driver returned an error code.
    Driver(i32),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidCredentials => write!(f, "WiFi credentials rejected"),
            Self::Timeout => write!(f, "timed out waiting for an address"),
            Self::Driver(code) => write!(f, "driver error {code}"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Transport faults (HTTP layer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the per-call timeout.
    Timeout,
    /// The TCP connection could not be established.
    Connection,
    /// Request or response I/O failed with a platform error code.
    Io(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Connection => write!(f, "connection failed"),
            Self::Io(code) => write!(f, "I/O error (code {code})"),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

/// A failure of the remote service observed while the link was up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFailure {
    /// The service answered with something other than HTTP 200.
    Status(u16),
    /// The request never got an answer.
    Transport(TransportError),
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl From<TransportError> for ServiceFailure {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Tagged result of an outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// Skipped: the link was down.
    LinkDown,
    /// The remote service failed.
    Service(ServiceFailure),
    /// The payload could not be serialized.
    Encode,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "link down"),
            Self::Service(e) => write!(f, "service failure: {e}"),
            Self::Encode => write!(f, "payload encoding failed"),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<ServiceFailure> for NotifyError {
    fn from(e: ServiceFailure) -> Self {
        Self::Service(e)
    }
}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A value could not be parsed.  Carries the key.
    InvalidValue(&'static str),
    /// A value does not fit its fixed-capacity buffer.  Carries the key.
    TooLong(&'static str),
    /// A field failed range validation.  Describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(key) => write!(f, "invalid value for '{key}'"),
            Self::TooLong(key) => write!(f, "value for '{key}' is too long"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
