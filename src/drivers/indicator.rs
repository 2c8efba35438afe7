//! Single-LED indicator driver.
//!
//! Drives one binary output with the patterns the alert cycle needs:
//! deterministic blink codes, periodic toggling and probabilistic flicker.
//!
//! ## Dual-target design
//!
//! Generic over [`OutputPin`] and [`RngCore`], so the same driver runs on a
//! GPIO `PinDriver` on the device and on an in-memory pin in tests.  The
//! only state kept between calls is the current level.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;
use rand::{Rng, RngCore};

/// Upper bound on blink repetitions per request.
pub const MAX_BLINK_COUNT: u8 = 8;

const MIN_PULSES: u8 = 2;
const MAX_PULSES: u8 = 6;

/// Worst case steps per repetition: on+off per pulse, then one pause.
const STEPS_PER_REPETITION: usize = MAX_PULSES as usize * 2 + 1;

pub const MAX_BLINK_STEPS: usize = MAX_BLINK_COUNT as usize * STEPS_PER_REPETITION;

/// A blink code: `count` repetitions, each followed by a pause derived
/// from `speed_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub count: u8,
    pub speed_ms: u32,
}

impl BlinkPattern {
    pub const fn new(count: u8, speed_ms: u32) -> Self {
        Self { count, speed_ms }
    }
}

/// One segment of a planned blink: hold `level` for `hold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkStep {
    pub level: bool,
    pub hold_ms: u32,
}

pub type BlinkPlan = heapless::Vec<BlinkStep, MAX_BLINK_STEPS>;

pub struct ActuatorController<P: OutputPin, R: RngCore> {
    pin: P,
    rng: R,
    level: bool,
    flicker_probability: f64,
    jitter_min_ms: u32,
    jitter_max_ms: u32,
}

impl<P: OutputPin, R: RngCore> ActuatorController<P, R> {
    /// Wrap `pin` and drive it low.
    pub fn new(pin: P, rng: R) -> Self {
        let mut this = Self {
            pin,
            rng,
            level: false,
            flicker_probability: 0.3,
            jitter_min_ms: 30,
            jitter_max_ms: 200,
        };
        this.set(false);
        this
    }

    /// Probability that [`flicker`](Self::flicker) lands on.  Clamped to
    /// `[0, 1]`; non-finite values disable flicker.
    #[must_use]
    pub fn with_flicker_probability(mut self, p: f32) -> Self {
        self.flicker_probability = if p.is_finite() {
            f64::from(p).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Window for randomized pulse lengths.  An inverted window is swapped.
    #[must_use]
    pub fn with_jitter_window(mut self, min_ms: u32, max_ms: u32) -> Self {
        self.jitter_min_ms = min_ms.min(max_ms);
        self.jitter_max_ms = min_ms.max(max_ms);
        self
    }

    // ── Output primitives ─────────────────────────────────────

    pub fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            warn!("Indicator: pin write failed (level={on})");
        }
        self.level = on;
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn toggle(&mut self) {
        self.set(!self.level);
    }

    /// Set the output on with the configured probability.  Returns the
    /// level chosen.
    pub fn flicker(&mut self) -> bool {
        let on = self.rng.gen_bool(self.flicker_probability);
        self.set(on);
        on
    }

    pub fn level(&self) -> bool {
        self.level
    }

    pub fn flicker_probability(&self) -> f64 {
        self.flicker_probability
    }

    // ── Blink codes ───────────────────────────────────────────

    /// Expand `pattern` into concrete steps.
    ///
    /// Each repetition is 2–6 on-pulses with jittered on and off lengths,
    /// then a pause of `speed_ms..=2*speed_ms`.  The plan always ends low.
    pub fn plan_blink(&mut self, pattern: BlinkPattern) -> BlinkPlan {
        let mut plan = BlinkPlan::new();
        if pattern.count > MAX_BLINK_COUNT {
            warn!(
                "Indicator: blink count {} capped at {MAX_BLINK_COUNT}",
                pattern.count
            );
        }
        let count = pattern.count.min(MAX_BLINK_COUNT);
        for _ in 0..count {
            let pulses = self.rng.gen_range(MIN_PULSES..=MAX_PULSES);
            for _ in 0..pulses {
                let on = self.jitter();
                let off = self.jitter();
                // Capacity covers the worst case, so pushes cannot fail.
                let _ = plan.push(BlinkStep { level: true, hold_ms: on });
                let _ = plan.push(BlinkStep { level: false, hold_ms: off });
            }
            let pause = self
                .rng
                .gen_range(pattern.speed_ms..=pattern.speed_ms.saturating_mul(2));
            let _ = plan.push(BlinkStep {
                level: false,
                hold_ms: pause,
            });
        }
        plan
    }

    /// Run a blink code synchronously.
    pub fn blink(&mut self, pattern: BlinkPattern, delay: &mut impl DelayNs) {
        self.off();
        for step in self.plan_blink(pattern) {
            self.set(step.level);
            delay.delay_ms(step.hold_ms);
        }
        self.off();
    }

    fn jitter(&mut self) -> u32 {
        self.rng.gen_range(self.jitter_min_ms..=self.jitter_max_ms)
    }
}
