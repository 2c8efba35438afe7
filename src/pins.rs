//! Default GPIO assignments for the motion-alert board.
//!
//! These are the factory defaults; both pins can be overridden through
//! [`DeviceConfig`](crate::config::DeviceConfig).

/// HC-SR501 PIR output.  Input, pull-down, active HIGH.
pub const MOTION_GPIO: i32 = 21;

/// Indicator LED.  Output, active HIGH.
pub const INDICATOR_GPIO: i32 = 5;

/// Highest GPIO number on the ESP32 pin matrix.
pub const MAX_GPIO: i32 = 39;

/// GPIO 34..=39 are input-only.
pub const MAX_OUTPUT_GPIO: i32 = 33;
