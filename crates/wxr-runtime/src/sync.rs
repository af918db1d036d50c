//! Blocking primitives used by the frame loop and the swapchain lease protocol.
//!
//! Both primitives wake every waiter on cancellation so that destroying a
//! session never leaves an application thread parked in the runtime.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Unsignaled,
    Signaled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signaled,
    TimedOut,
    Cancelled,
}

/// Completion fence for one swapchain image's pending GPU work.
pub struct Fence {
    state: Mutex<FenceState>,
    cond: Condvar,
}

impl Default for Fence {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Fence {
    pub fn new(signaled: bool) -> Self {
        let state = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        }
    }

    pub fn signal(&self) {
        let mut state = self.state.lock();
        if *state == FenceState::Unsignaled {
            *state = FenceState::Signaled;
            self.cond.notify_all();
        }
    }

    /// Re-arm the fence. A cancelled fence stays cancelled.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if *state == FenceState::Signaled {
            *state = FenceState::Unsignaled;
        }
    }

    pub fn cancel(&self) {
        *self.state.lock() = FenceState::Cancelled;
        self.cond.notify_all();
    }

    pub fn is_signaled(&self) -> bool {
        *self.state.lock() == FenceState::Signaled
    }

    /// Wait for the fence. `None` waits forever, `Duration::ZERO` polls.
    pub fn wait(&self, timeout: Option<Duration>) -> WaitOutcome {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.state.lock();
        loop {
            match *state {
                FenceState::Signaled => return WaitOutcome::Signaled,
                FenceState::Cancelled => return WaitOutcome::Cancelled,
                FenceState::Unsignaled => {}
            }
            match (timeout, deadline) {
                (Some(t), _) if t.is_zero() => return WaitOutcome::TimedOut,
                (_, Some(deadline)) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out()
                        && *state == FenceState::Unsignaled
                    {
                        return WaitOutcome::TimedOut;
                    }
                }
                // Infinite, or a timeout too large to represent.
                (_, None) => self.cond.wait(&mut state),
            }
        }
    }
}

/// Why a [`WakeSignal`] was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Destroyed,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The deadline passed.
    Elapsed,
    /// `interrupt` was called after the caller sampled the generation.
    Interrupted,
    Cancelled(CancelReason),
}

struct WakeState {
    generation: u64,
    cancelled: Option<CancelReason>,
}

/// Timed sleep that other threads can cut short.
pub struct WakeSignal {
    state: Mutex<WakeState>,
    cond: Condvar,
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WakeState {
                generation: 0,
                cancelled: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// Sample the interrupt generation before releasing the lock that
    /// guards the decision to sleep.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Sleep until `deadline`, returning early if the signal is interrupted
    /// past `seen_generation` or cancelled.
    pub fn sleep_until(&self, deadline: Instant, seen_generation: u64) -> Wake {
        let mut state = self.state.lock();
        loop {
            if let Some(reason) = state.cancelled {
                return Wake::Cancelled(reason);
            }
            if state.generation != seen_generation {
                return Wake::Interrupted;
            }
            if Instant::now() >= deadline {
                return Wake::Elapsed;
            }
            self.cond.wait_until(&mut state, deadline);
        }
    }

    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Cancel current and future sleeps. The first reason sticks.
    pub fn cancel(&self, reason: CancelReason) {
        let mut state = self.state.lock();
        state.cancelled.get_or_insert(reason);
        self.cond.notify_all();
    }

    pub fn cancelled(&self) -> Option<CancelReason> {
        self.state.lock().cancelled
    }
}
