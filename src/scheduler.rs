//! Timer scheduler.
//!
//! A fixed table of typed timer slots, one per concern of an alert cycle.
//! Each slot holds an enum-tagged [`TimerAction`] instead of a closure, so
//! the table is `Copy`-cheap, allocation-free, and can be serviced from the
//! timer context inside a critical section.
//!
//! ```text
//!  ┌──────────────┬──────────┬───────────┬───────────────────┐
//!  │ Slot         │ Mode     │ Period    │ Action            │
//!  ├──────────────┼──────────┼───────────┼───────────────────┤
//!  │ FlashToggle  │ Periodic │ 200 ms    │ Toggle / Flicker  │
//!  │ FlashStop    │ OneShot  │ flash     │ StopFlash         │
//!  │ Cooldown     │ OneShot  │ cooldown  │ EndCooldown       │
//!  └──────────────┴──────────┴───────────┴───────────────────┘
//! ```
//!
//! The scheduler never reads a clock.  Callers pass `now_ms` into
//! [`TimerScheduler::schedule`] and [`TimerScheduler::tick`], which makes
//! firing fully deterministic under a simulated clock.

use log::debug;

// ═══════════════════════════════════════════════════════════════
//  Timer types
// ═══════════════════════════════════════════════════════════════

/// Identity of a timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimerSlot {
    FlashToggle = 0,
    FlashStop = 1,
    Cooldown = 2,
}

impl TimerSlot {
    /// Number of slots; sizes the table.
    pub const COUNT: usize = 3;

    pub const ALL: [Self; Self::COUNT] = [Self::FlashToggle, Self::FlashStop, Self::Cooldown];

    pub fn name(self) -> &'static str {
        match self {
            Self::FlashToggle => "flash-toggle",
            Self::FlashStop => "flash-stop",
            Self::Cooldown => "cooldown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Fires once, then retires.
    OneShot,
    /// Re-arms after every firing until cancelled.
    Periodic,
}

/// What a timer does when it fires.  Executed by the owner of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Flip the indicator.
    ToggleIndicator,
    /// Randomly set the indicator on or off.
    FlickerIndicator,
    /// End the flash: cancel the toggle timer and force the indicator off.
    StopFlash,
    /// End the cooldown: return to Idle.
    EndCooldown,
}

/// Handle to a scheduled timer.
///
/// The generation makes handles single-use: once a slot is re-armed, a
/// stale handle no longer matches and cancelling it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub slot: TimerSlot,
    generation: u32,
    pub period_ms: u32,
    pub mode: TimerMode,
    pub action: TimerAction,
}

/// A timer that fired during [`TimerScheduler::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub handle: TimerHandle,
    pub action: TimerAction,
}

/// Firings are returned in slot order, at most one per slot per tick.
pub type Firings = heapless::Vec<Firing, { TimerSlot::COUNT }>;

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    handle: TimerHandle,
    deadline_ms: u64,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct TimerScheduler {
    slots: [Option<TimerEntry>; TimerSlot::COUNT],
    generations: [u32; TimerSlot::COUNT],
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerScheduler {
    pub const fn new() -> Self {
        Self {
            slots: [None; TimerSlot::COUNT],
            generations: [0; TimerSlot::COUNT],
        }
    }

    /// Arm `slot` to fire `action` after `period_ms`.
    ///
    /// Re-scheduling an occupied slot replaces its timer, like re-initialising
    /// a hardware timer.  A periodic timer with period 0 is treated as 1 ms.
    pub fn schedule(
        &mut self,
        slot: TimerSlot,
        period_ms: u32,
        mode: TimerMode,
        action: TimerAction,
        now_ms: u64,
    ) -> TimerHandle {
        let idx = slot as usize;
        let period_ms = match mode {
            TimerMode::Periodic => period_ms.max(1),
            TimerMode::OneShot => period_ms,
        };
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        let handle = TimerHandle {
            slot,
            generation: self.generations[idx],
            period_ms,
            mode,
            action,
        };
        self.slots[idx] = Some(TimerEntry {
            handle,
            deadline_ms: now_ms.saturating_add(u64::from(period_ms)),
        });
        debug!(
            "Timer: armed {} ({:?}, {} ms) -> {:?}",
            slot.name(),
            mode,
            period_ms,
            action
        );
        handle
    }

    /// Cancel the timer behind `handle`.  Returns `false` if it already
    /// retired or the slot was re-armed since.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        self.slots[handle.slot as usize] = None;
        debug!("Timer: cancelled {}", handle.slot.name());
        true
    }

    /// Cancel whatever occupies `slot`.
    pub fn cancel_slot(&mut self, slot: TimerSlot) -> bool {
        self.slots[slot as usize].take().is_some()
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.slots[handle.slot as usize].is_some_and(|e| e.handle == handle)
    }

    pub fn is_slot_live(&self, slot: TimerSlot) -> bool {
        self.slots[slot as usize].is_some()
    }

    /// Handle currently armed in `slot`, if any.
    pub fn handle(&self, slot: TimerSlot) -> Option<TimerHandle> {
        self.slots[slot as usize].map(|e| e.handle)
    }

    /// Absolute deadline of the timer in `slot`.
    pub fn deadline(&self, slot: TimerSlot) -> Option<u64> {
        self.slots[slot as usize].map(|e| e.deadline_ms)
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Fire every timer whose deadline is at or before `now_ms`.
    ///
    /// One-shot timers retire.  Periodic timers re-arm one period after
    /// their previous deadline; periods missed while the timer context was
    /// starved are skipped rather than replayed.
    pub fn tick(&mut self, now_ms: u64) -> Firings {
        let mut fired = Firings::new();
        for slot in &mut self.slots {
            let Some(entry) = slot else {
                continue;
            };
            if entry.deadline_ms > now_ms {
                continue;
            }
            let handle = entry.handle;
            match handle.mode {
                TimerMode::OneShot => *slot = None,
                TimerMode::Periodic => {
                    let period = u64::from(handle.period_ms);
                    while entry.deadline_ms <= now_ms {
                        entry.deadline_ms = entry.deadline_ms.saturating_add(period);
                    }
                }
            }
            // Capacity equals the slot count, so this cannot overflow.
            let _ = fired.push(Firing {
                handle,
                action: handle.action,
            });
        }
        fired
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
