//! Alert state machine engine.
//!
//! A table of plain function pointers, one row per [`SystemState`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  ┌────────┬──────────┬──────────┬───────────────────┐│
//! │  │ State  │ on_enter │ on_exit  │ on_update         ││
//! │  ├────────┼──────────┼──────────┼───────────────────┤│
//! │  │ Init   │ fn(ctx)  │ fn(ctx)  │ fn(ctx)->Option<> ││
//! │  │ Idle   │ fn(ctx)  │ none     │ fn(ctx)->Option<> ││
//! │  │ Active │ fn(ctx)  │ fn(ctx)  │ fn(ctx)->Option<> ││
//! │  └────────┴──────────┴──────────┴───────────────────┘│
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current state.  If it
//! returns `Some(next)`, the engine runs `on_exit` for the current state,
//! then `on_enter` for the next.  Handlers never perform I/O; they read
//! [`context::Inputs`] and write [`context::Commands`] on the shared
//! [`FsmContext`], and the service applies those commands.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Device operating state.
/// Must stay in sync with the state table built in [`states::build_state_table`].
///
/// `Active` always has a live cooldown timer behind it; the timer context
/// is what moves the device back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SystemState {
    Init = 0,
    Idle = 1,
    Active = 2,
}

impl SystemState {
    /// Total number of states; sizes the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `SystemState`.  Asserts in debug builds;
    /// returns `Init` in release, which re-runs bring-up.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Init,
            1 => Self::Idle,
            2 => Self::Active,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Init
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit`: run once per transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick handler.  `Some(next)` requests a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<SystemState>;

/// One row of the state table.  Fixed-size array, no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: SystemState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    table: [StateDescriptor; SystemState::COUNT],
    current: SystemState,
    tick_count: u64,
    /// Tick at which `current` was entered.
    entered_at: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; SystemState::COUNT], initial: SystemState) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, row)| row.id as usize == i),
            "state table rows out of order"
        );
        Self {
            table,
            current: initial,
            tick_count: 0,
            entered_at: 0,
        }
    }

    fn row(&self, state: SystemState) -> &StateDescriptor {
        &self.table[state as usize]
    }

    /// Run `on_enter` for the initial state.  Call once before the first
    /// [`tick`](Self::tick).
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.row(self.current).name);
        if let Some(enter) = self.row(self.current).on_enter {
            enter(ctx);
        }
    }

    /// Run the current state's `on_update` and follow any transition it
    /// requests.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        self.tick_count = self.tick_count.wrapping_add(1);
        ctx.total_ticks = self.tick_count;
        ctx.ticks_in_state = self.ticks_in_current_state();

        if let Some(next) = (self.row(self.current).on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Jump to `next` regardless of what `on_update` would return.  Used to
    /// follow the state the timer context published on cooldown expiry.
    /// A no-op when already in `next`.
    pub fn force_transition(&mut self, next: SystemState, ctx: &mut FsmContext) {
        if next != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> SystemState {
        self.current
    }

    pub fn state_name(&self) -> &'static str {
        self.row(self.current).name
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count.wrapping_sub(self.entered_at)
    }

    fn transition(&mut self, next: SystemState, ctx: &mut FsmContext) {
        info!(
            "FSM transition: {} -> {}",
            self.row(self.current).name,
            self.row(next).name
        );

        if let Some(exit) = self.row(self.current).on_exit {
            exit(ctx);
        }

        self.current = next;
        self.entered_at = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.row(next).on_enter {
            enter(ctx);
        }
    }
}
