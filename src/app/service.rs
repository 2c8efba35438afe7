//! Alert state machine service: the hexagonal core.
//!
//! [`AlertStateMachine`] owns the FSM, the connectivity manager and the
//! notification client, and holds a reference to the [`SharedCore`] it
//! shares with the timer context.  All I/O flows through port traits, so
//! the whole service runs against mocks on the host.
//!
//! ```text
//!  MotionSensor ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                   │    AlertStateMachine     │
//!  Clock + Delay ──▶│  FSM · Link · Notifier   │
//!                   └────────────┬─────────────┘
//!                                │ arm / blink / state
//!                                ▼
//!                           SharedCore ◀── timer context
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;
use rand::RngCore;

use crate::config::DeviceConfig;
use crate::connectivity::ConnectivityManager;
use crate::fsm::context::{BringUpOutcome, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, SystemState};
use crate::notify::NotificationClient;
use crate::shared::{AlertPlan, SharedCore};

use super::events::AppEvent;
use super::ports::{Clock, EventSink, HttpTransport, LinkStatus, MotionSensor, WifiDriver};

// ───────────────────────────────────────────────────────────────
// AlertStateMachine
// ───────────────────────────────────────────────────────────────

pub struct AlertStateMachine<'a, D, T, P, R>
where
    D: WifiDriver,
    T: HttpTransport,
    P: OutputPin,
    R: RngCore,
{
    fsm: Fsm,
    ctx: FsmContext,
    shared: &'a SharedCore<P, R>,
    connectivity: ConnectivityManager<D>,
    notifier: NotificationClient<T>,
    plan: AlertPlan,
    tick_count: u64,
}

impl<'a, D, T, P, R> AlertStateMachine<'a, D, T, P, R>
where
    D: WifiDriver,
    T: HttpTransport,
    P: OutputPin,
    R: RngCore,
{
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(
        config: DeviceConfig,
        shared: &'a SharedCore<P, R>,
        connectivity: ConnectivityManager<D>,
        notifier: NotificationClient<T>,
    ) -> Self {
        let plan = AlertPlan::from_config(&config);
        if plan.flash_ms != config.flash_duration_ms {
            info!(
                "Flash duration {} ms clamped to {} ms (cooldown {} ms)",
                config.flash_duration_ms, plan.flash_ms, plan.cooldown_ms
            );
        }
        Self {
            fsm: Fsm::new(build_state_table(), SystemState::Init),
            ctx: FsmContext::new(config),
            shared,
            connectivity,
            notifier,
            plan,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.shared.set_state(SystemState::Init);
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AlertStateMachine started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one main-loop cycle.
    ///
    /// 1. Follow a state published by the timer context (cooldown expiry).
    /// 2. Gather inputs: bring-up in Init, the sensor in Idle.
    /// 3. FSM tick.
    /// 4. Apply commands: blink, indicator off, notify, arm, retry delay.
    /// 5. Publish the new state.
    pub fn tick(
        &mut self,
        sensor: &mut impl MotionSensor,
        board: &mut (impl Clock + DelayNs),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        self.ctx.reset_tick();

        // 1. Timer context may have ended the cooldown.
        let published = self.shared.state();
        let current = self.fsm.current_state();
        if published != current {
            self.fsm.force_transition(published, &mut self.ctx);
            sink.emit(&AppEvent::StateChanged {
                from: current,
                to: published,
            });
        }

        // 2. Inputs
        let prev_state = self.fsm.current_state();
        match prev_state {
            SystemState::Init => {
                self.ctx.inputs.bring_up = Some(self.bring_up(board, sink));
            }
            SystemState::Idle => {
                self.ctx.inputs.motion = sensor.motion_detected();
            }
            SystemState::Active => {}
        }

        // 3. FSM
        self.fsm.tick(&mut self.ctx);

        // 4. Commands
        self.apply_commands(board, sink);

        // 5. Publish.  Active is published by `arm_alert` together with
        //    its timers.
        let new_state = self.fsm.current_state();
        if new_state != SystemState::Active {
            self.shared.set_state(new_state);
        }
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    fn bring_up(
        &mut self,
        board: &mut (impl Clock + DelayNs),
        sink: &mut impl EventSink,
    ) -> BringUpOutcome {
        let mut progress = self.shared;
        if !self.connectivity.ensure(board, &mut progress) {
            sink.emit(&AppEvent::LinkFailed {
                attempts: self.connectivity.last_attempts(),
            });
            return BringUpOutcome::LinkDown;
        }
        sink.emit(&AppEvent::LinkUp {
            address: self.connectivity.address(),
        });
        if self
            .notifier
            .check_liveness(&self.connectivity, board.now_ms())
        {
            BringUpOutcome::Ready
        } else {
            sink.emit(&AppEvent::ServiceUnavailable);
            BringUpOutcome::ServiceDown
        }
    }

    fn apply_commands(&mut self, board: &mut (impl Clock + DelayNs), sink: &mut impl EventSink) {
        let cmds = self.ctx.commands;

        if let Some(pattern) = cmds.boot_signal {
            self.shared.blink(pattern, board);
        }
        if cmds.indicator_off {
            self.shared.indicator_off();
        }
        if cmds.notify_motion {
            sink.emit(&AppEvent::MotionDetected);
            if let Err(e) = self
                .notifier
                .send_motion_event(&self.connectivity, board.now_ms())
            {
                sink.emit(&AppEvent::NotificationFailed(e));
            }
        }
        if cmds.arm_alert {
            self.shared.arm_alert(self.plan, board.now_ms());
        }
        if let Some(ms) = cmds.retry_delay_ms {
            board.delay_ms(ms);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SystemState {
        self.fsm.current_state()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn plan(&self) -> AlertPlan {
        self.plan
    }

    pub fn link_up(&self) -> bool {
        self.connectivity.link_up()
    }

    pub fn connectivity(&self) -> &ConnectivityManager<D> {
        &self.connectivity
    }

    pub fn notifier(&self) -> &NotificationClient<T> {
        &self.notifier
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.ctx.config
    }
}
