//! Application core: alert orchestration with zero direct I/O.
//!
//! This module contains the business rules of the motion-alert device:
//! boot bring-up, motion handling and cooldown.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
