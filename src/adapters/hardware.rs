//! Board pins: the PIR input and the indicator output.
//!
//! This is the only module that touches GPIO.  On non-espidf targets it
//! provides simulated pins with the same `embedded-hal` traits, so the
//! drivers above are identical on both.

#[cfg(target_os = "espidf")]
mod platform {
    use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
    use esp_idf_svc::sys::EspError;

    pub type MotionInput = PinDriver<'static, AnyIOPin, Input>;
    pub type IndicatorOutput = PinDriver<'static, AnyOutputPin, Output>;

    /// PIR input with the internal pull-down enabled.
    pub fn motion_input(gpio: i32) -> Result<MotionInput, EspError> {
        // SAFETY: `gpio` is range-checked by `DeviceConfig::validate` and
        // this is the only driver created for it.
        let pin = unsafe { AnyIOPin::new(gpio) };
        let mut driver = PinDriver::input(pin)?;
        driver.set_pull(Pull::Down)?;
        Ok(driver)
    }

    pub fn indicator_output(gpio: i32) -> Result<IndicatorOutput, EspError> {
        // SAFETY: as above; `validate` also rejects input-only GPIOs.
        let pin = unsafe { AnyOutputPin::new(gpio) };
        let mut driver = PinDriver::output(pin)?;
        driver.set_low()?;
        Ok(driver)
    }
}

#[cfg(not(target_os = "espidf"))]
mod platform {
    use core::convert::Infallible;

    use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
    use log::debug;

    use crate::adapters::time::uptime_ms;

    /// Indicator that logs its transitions.
    #[derive(Debug, Default)]
    pub struct SimIndicatorPin {
        high: bool,
    }

    impl SimIndicatorPin {
        pub fn new() -> Self {
            Self::default()
        }

        fn write(&mut self, high: bool) {
            if high != self.high {
                debug!("LED(sim): {}", if high { "on" } else { "off" });
            }
            self.high = high;
        }
    }

    impl ErrorType for SimIndicatorPin {
        type Error = Infallible;
    }

    impl OutputPin for SimIndicatorPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.write(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.write(true);
            Ok(())
        }
    }

    /// PIR that goes high for `pulse_ms` once every `interval_ms`, starting
    /// `first_ms` after boot.
    #[derive(Debug, Clone, Copy)]
    pub struct SimPirPin {
        first_ms: u64,
        interval_ms: u64,
        pulse_ms: u64,
    }

    impl SimPirPin {
        pub fn new(first_ms: u64, interval_ms: u64, pulse_ms: u64) -> Self {
            Self {
                first_ms,
                interval_ms: interval_ms.max(1),
                pulse_ms,
            }
        }

        fn level_at(&self, now_ms: u64) -> bool {
            now_ms >= self.first_ms && (now_ms - self.first_ms) % self.interval_ms < self.pulse_ms
        }
    }

    impl ErrorType for SimPirPin {
        type Error = Infallible;
    }

    impl InputPin for SimPirPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.level_at(uptime_ms()))
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.level_at(uptime_ms()))
        }
    }

}

pub use platform::*;
