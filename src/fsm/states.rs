//! State handlers and table builder.
//!
//! ```text
//!          ┌──[link down / service down]──┐
//!          ▼                              │
//!        INIT ────────────────────────────┘
//!          │
//!       [ready]
//!          ▼
//!        IDLE ──[motion]──▶ ACTIVE
//!          ▲                   │
//!          └──[cooldown timer]─┘
//! ```
//!
//! There is no terminal state: Init retries forever, and Active is left
//! only when the timer context publishes Idle.

use super::context::{BringUpOutcome, FsmContext};
use super::{StateDescriptor, SystemState};
use crate::drivers::indicator::BlinkPattern;
use log::{info, warn};

/// One long blink: the link could not be brought up.
pub const LINK_DOWN_SIGNAL: BlinkPattern = BlinkPattern::new(1, 1000);
/// Two blinks: link up, alert service unreachable.
pub const SERVICE_DOWN_SIGNAL: BlinkPattern = BlinkPattern::new(2, 500);
/// Three quick blinks: ready.
pub const READY_SIGNAL: BlinkPattern = BlinkPattern::new(3, 100);

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; SystemState::COUNT] {
    [
        StateDescriptor {
            id: SystemState::Init,
            name: "Init",
            on_enter: Some(init_enter),
            on_exit: Some(init_exit),
            on_update: init_update,
        },
        StateDescriptor {
            id: SystemState::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: SystemState::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: Some(active_exit),
            on_update: active_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  INIT: bring up link and service
// ═══════════════════════════════════════════════════════════════════════════

fn init_enter(_ctx: &mut FsmContext) {
    info!("INIT: bringing up link and alert service");
}

fn init_update(ctx: &mut FsmContext) -> Option<SystemState> {
    let outcome = ctx.inputs.bring_up?;
    match outcome {
        BringUpOutcome::LinkDown => {
            warn!("INIT: link unavailable, retrying");
            ctx.commands.boot_signal = Some(LINK_DOWN_SIGNAL);
            ctx.commands.retry_delay_ms = Some(ctx.config.init_retry_delay_ms);
            None
        }
        BringUpOutcome::ServiceDown => {
            warn!("INIT: alert service unavailable, retrying");
            ctx.commands.boot_signal = Some(SERVICE_DOWN_SIGNAL);
            ctx.commands.retry_delay_ms = Some(ctx.config.init_retry_delay_ms);
            None
        }
        BringUpOutcome::Ready => {
            info!("INIT: setup complete");
            ctx.commands.boot_signal = Some(READY_SIGNAL);
            Some(SystemState::Idle)
        }
    }
}

fn init_exit(ctx: &mut FsmContext) {
    ctx.commands.indicator_off = true;
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE: waiting for motion
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(_ctx: &mut FsmContext) {
    info!("IDLE: watching for motion");
}

fn idle_update(ctx: &mut FsmContext) -> Option<SystemState> {
    if !ctx.inputs.motion {
        return None;
    }
    info!("IDLE: motion detected");
    ctx.commands.notify_motion = true;
    Some(SystemState::Active)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE: flashing, then cooling down
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut FsmContext) {
    ctx.commands.arm_alert = true;
    info!(
        "ACTIVE: flash {} ms, cooldown {} ms",
        ctx.config.effective_flash_ms(),
        ctx.config.cooldown_duration_ms
    );
}

fn active_update(_ctx: &mut FsmContext) -> Option<SystemState> {
    // Sensor is not polled; only the cooldown timer ends this state.
    None
}

fn active_exit(_ctx: &mut FsmContext) {
    info!("ACTIVE: cooldown finished");
}
