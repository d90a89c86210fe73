//! Countdown timers.
//!
//! Shields, freezes, respawns, base protection and lifetimes are all a
//! [`TimedEffect`]: a remaining-tick counter plus the payload to act on when
//! it runs out. Ticking decrements first, then checks for expiry.

use serde::{Deserialize, Serialize};

/// A countdown carrying an on-expire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEffect<A> {
    remaining: u32,
    on_expire: A,
}

impl<A: Copy> TimedEffect<A> {
    /// Start a countdown of `ticks` ticks.
    #[must_use]
    pub const fn new(ticks: u32, on_expire: A) -> Self {
        Self {
            remaining: ticks,
            on_expire,
        }
    }

    /// Ticks left before expiry.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// The payload delivered on expiry.
    #[must_use]
    pub const fn payload(&self) -> A {
        self.on_expire
    }

    /// Advance one tick. Returns the payload on the tick the counter hits 0.
    pub fn tick(&mut self) -> Option<A> {
        if self.remaining == 0 {
            return Some(self.on_expire);
        }
        self.remaining -= 1;
        (self.remaining == 0).then_some(self.on_expire)
    }

    /// Restart with a new duration, keeping the payload.
    pub fn reset(&mut self, ticks: u32) {
        self.remaining = ticks;
    }
}

/// Advance an optional timer, clearing it and returning the payload on expiry.
pub fn tick_slot<A: Copy>(slot: &mut Option<TimedEffect<A>>) -> Option<A> {
    let fired = slot.as_mut().and_then(TimedEffect::tick);
    if fired.is_some() {
        *slot = None;
    }
    fired
}

/// Whether an optional timer is still counting.
#[must_use]
pub fn is_active<A: Copy>(slot: &Option<TimedEffect<A>>) -> bool {
    slot.as_ref().is_some_and(|t| t.remaining() > 0)
}
