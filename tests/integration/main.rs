//! Host-side integration tests for the motion-alert core.
//!
//! Everything runs against the recording mocks in `mock_hw`: no radio,
//! no HTTP server, no GPIO.  Time is simulated, and the timer context is
//! driven by calling `SharedCore::service_timers` directly.

mod alert_flow_tests;
mod connectivity_tests;
mod notify_tests;
