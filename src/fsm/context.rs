//! Blackboard threaded through every FSM handler.
//!
//! The service fills [`Inputs`] before each tick, handlers read them and
//! write [`Commands`], and the service applies those commands afterwards.
//! Handlers themselves never touch the network, the indicator or a timer.

use crate::config::DeviceConfig;
use crate::drivers::indicator::BlinkPattern;

// ---------------------------------------------------------------------------
// Inputs (written by the service before the tick)
// ---------------------------------------------------------------------------

/// Result of one Init bring-up attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpOutcome {
    /// `ensure()` failed.
    LinkDown,
    /// Link up, but the liveness ping failed.
    ServiceDown,
    /// Link up and the service answered.
    Ready,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Inputs {
    /// Sensor level, sampled only while Idle.
    pub motion: bool,
    /// Set only while in Init.
    pub bring_up: Option<BringUpOutcome>,
}

// ---------------------------------------------------------------------------
// Commands (written by handlers, applied in field order)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Commands {
    /// Blink code to show the bring-up result.
    pub boot_signal: Option<BlinkPattern>,
    /// Force the indicator low.
    pub indicator_off: bool,
    /// Post the motion trigger.
    pub notify_motion: bool,
    /// Publish Active and schedule the three alert timers.
    pub arm_alert: bool,
    /// Block the main loop before the next bring-up attempt.
    pub retry_delay_ms: Option<u32>,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    pub ticks_in_state: u64,
    pub total_ticks: u64,
    pub inputs: Inputs,
    pub commands: Commands,
    pub config: DeviceConfig,
}

impl FsmContext {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            inputs: Inputs::default(),
            commands: Commands::default(),
            config,
        }
    }

    /// Clear inputs and commands left over from the previous tick.
    pub fn reset_tick(&mut self) {
        self.inputs = Inputs::default();
        self.commands = Commands::default();
    }
}
