//! Output drivers, the PIR input and the timer service.

pub mod hw_timer;
pub mod indicator;
pub mod motion;
