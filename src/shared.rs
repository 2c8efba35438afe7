//! State shared between the main loop and the timer context.
//!
//! ```text
//!   main loop ──┐                         ┌── timer context
//!               ▼                         ▼
//!        ┌──────────────── SharedCore ────────────────┐
//!        │  Mutex<CriticalSectionRawMutex, RefCell<>> │
//!        │   SystemState · ActuatorController · Timers │
//!        └─────────────────────────────────────────────┘
//! ```
//!
//! Every access runs inside a critical section, so a timer firing never
//! observes a half-armed alert, and arming (publish Active plus the three
//! schedulings) is atomic with respect to the timer context.  Nothing in
//! here touches the network or blocks.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info};
use rand::RngCore;

use crate::app::ports::LinkProgress;
use crate::config::{DeviceConfig, FlashPattern};
use crate::drivers::indicator::{ActuatorController, BlinkPattern};
use crate::fsm::SystemState;
use crate::scheduler::{TimerAction, TimerMode, TimerScheduler, TimerSlot};

/// Timer parameters for one alert cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPlan {
    pub flash_ms: u32,
    pub cooldown_ms: u32,
    pub period_ms: u32,
    pub pattern: FlashPattern,
}

impl AlertPlan {
    /// Flash duration is clamped below the cooldown.
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            flash_ms: config.effective_flash_ms(),
            cooldown_ms: config.cooldown_duration_ms,
            period_ms: config.flash_period_ms,
            pattern: config.flash_pattern,
        }
    }
}

struct AlertCore<P: OutputPin, R: RngCore> {
    state: SystemState,
    actuator: ActuatorController<P, R>,
    timers: TimerScheduler,
}

pub struct SharedCore<P: OutputPin, R: RngCore> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<AlertCore<P, R>>>,
}

impl<P: OutputPin, R: RngCore> SharedCore<P, R> {
    /// Starts in `Init` with no timers armed.
    pub fn new(actuator: ActuatorController<P, R>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(AlertCore {
                state: SystemState::Init,
                actuator,
                timers: TimerScheduler::new(),
            })),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut AlertCore<P, R>) -> T) -> T {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn state(&self) -> SystemState {
        self.with(|core| core.state)
    }

    pub fn set_state(&self, state: SystemState) {
        self.with(|core| core.state = state);
    }

    // ── Alert cycle ───────────────────────────────────────────

    /// Publish `Active` and schedule flash-toggle, flash-stop and cooldown
    /// in one critical section.
    pub fn arm_alert(&self, plan: AlertPlan, now_ms: u64) {
        let toggle = match plan.pattern {
            FlashPattern::Toggle => TimerAction::ToggleIndicator,
            FlashPattern::Flicker => TimerAction::FlickerIndicator,
        };
        self.with(|core| {
            core.state = SystemState::Active;
            core.timers
                .schedule(TimerSlot::FlashToggle, plan.period_ms, TimerMode::Periodic, toggle, now_ms);
            core.timers.schedule(
                TimerSlot::FlashStop,
                plan.flash_ms,
                TimerMode::OneShot,
                TimerAction::StopFlash,
                now_ms,
            );
            core.timers.schedule(
                TimerSlot::Cooldown,
                plan.cooldown_ms,
                TimerMode::OneShot,
                TimerAction::EndCooldown,
                now_ms,
            );
        });
        info!(
            "Alert armed at {now_ms} ms: flash {} ms every {} ms, cooldown {} ms",
            plan.flash_ms, plan.period_ms, plan.cooldown_ms
        );
    }

    /// Fire due timers.  Called from the timer context.  Returns the
    /// number of actions executed.
    pub fn service_timers(&self, now_ms: u64) -> usize {
        let (fired, cooled_down) = self.with(|core| {
            let firings = core.timers.tick(now_ms);
            let mut cooled_down = false;
            for firing in &firings {
                match firing.action {
                    TimerAction::ToggleIndicator => core.actuator.toggle(),
                    TimerAction::FlickerIndicator => {
                        core.actuator.flicker();
                    }
                    TimerAction::StopFlash => {
                        core.timers.cancel_slot(TimerSlot::FlashToggle);
                        core.actuator.off();
                    }
                    // Does not cancel flash-toggle; flash-stop always
                    // fires first since its period is shorter.
                    TimerAction::EndCooldown => {
                        core.state = SystemState::Idle;
                        cooled_down = true;
                    }
                }
            }
            (firings.len(), cooled_down)
        });
        if cooled_down {
            debug!("Timer: cooldown expired at {now_ms} ms, state -> Idle");
        }
        fired
    }

    // ── Indicator access ──────────────────────────────────────

    pub fn indicator_level(&self) -> bool {
        self.with(|core| core.actuator.level())
    }

    pub fn indicator_off(&self) {
        self.with(|core| core.actuator.off());
    }

    pub fn toggle_indicator(&self) {
        self.with(|core| core.actuator.toggle());
    }

    /// Blink code on the main loop.  Each output change takes the lock
    /// briefly; the delays run outside it so timers keep firing.
    pub fn blink(&self, pattern: BlinkPattern, delay: &mut impl DelayNs) {
        let plan = self.with(|core| {
            core.actuator.off();
            core.actuator.plan_blink(pattern)
        });
        for step in &plan {
            self.with(|core| core.actuator.set(step.level));
            delay.delay_ms(step.hold_ms);
        }
        self.indicator_off();
    }

    /// One on/off pulse, truncated to `budget_ms`.  Returns the time spent.
    pub fn pulse(&self, on_ms: u32, off_ms: u32, budget_ms: u32, delay: &mut impl DelayNs) -> u32 {
        let on = on_ms.min(budget_ms);
        let off = off_ms.min(budget_ms - on);
        self.with(|core| core.actuator.set(true));
        delay.delay_ms(on);
        self.indicator_off();
        if off > 0 {
            delay.delay_ms(off);
        }
        on + off
    }

    // ── Timer inspection ──────────────────────────────────────

    pub fn timer_live(&self, slot: TimerSlot) -> bool {
        self.with(|core| core.timers.is_slot_live(slot))
    }

    pub fn timer_deadline(&self, slot: TimerSlot) -> Option<u64> {
        self.with(|core| core.timers.deadline(slot))
    }

    pub fn live_timers(&self) -> usize {
        self.with(|core| core.timers.live_count())
    }

    /// `Active` implies a live cooldown timer.
    pub fn invariant_holds(&self) -> bool {
        self.with(|core| {
            core.state != SystemState::Active || core.timers.is_slot_live(TimerSlot::Cooldown)
        })
    }
}

/// Gentle pulse held through a backoff wait.
pub const BACKOFF_PULSE: (u32, u32) = (30, 120);
/// Quick double pulse once the link is up.
pub const CONNECTED_PULSE: (u32, u32) = (50, 50);

/// Connection progress on the indicator: toggle per address poll, a gentle
/// pulse through backoff, a double pulse on success.
impl<P: OutputPin, R: RngCore> LinkProgress for &SharedCore<P, R> {
    fn poll_tick(&mut self) {
        self.toggle_indicator();
    }

    fn backoff(&mut self, retry: u8, delay_ms: u32, delay: &mut impl DelayNs) {
        info!("WiFi: retry {retry} in {delay_ms} ms");
        let (on, off) = BACKOFF_PULSE;
        let mut remaining = delay_ms;
        while remaining > 0 {
            remaining -= self.pulse(on, off, remaining, delay);
        }
    }

    fn settle(&mut self, connected: bool, delay: &mut impl DelayNs) {
        self.indicator_off();
        if connected {
            let (on, off) = CONNECTED_PULSE;
            for _ in 0..2 {
                self.pulse(on, off, on + off, delay);
            }
        }
    }
}
