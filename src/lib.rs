//! Motion-alert firmware library.
//!
//! Exposes the control logic for the binary and for host-side
//! integration tests.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod fsm;
pub mod notify;
pub mod pins;
pub mod scheduler;
pub mod shared;

// Hardware-facing modules; each carries its own simulation fallback.
pub mod adapters;
pub mod drivers;

mod esp_link_shims;
