//! Passive-infrared motion input.
//!
//! The sensor output is active-high; the pin is configured pull-down so a
//! disconnected sensor reads as "no motion".

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::MotionSensor;

pub struct PirSensor<P: InputPin> {
    pin: P,
}

impl<P: InputPin> PirSensor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin> MotionSensor for PirSensor<P> {
    fn motion_detected(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(level) => level,
            Err(_) => {
                warn!("PIR: input read failed, treating as idle");
                false
            }
        }
    }
}
