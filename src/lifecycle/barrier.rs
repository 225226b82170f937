//! Counting barrier shared by every stage during one reset pass.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

type Waiter = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct BarrierState {
    outstanding: usize,
    waiters: Vec<Waiter>,
}

/// Enter/leave counter with notify-on-zero.
///
/// Stages call `enter` (or take a [`BarrierParticipant`]) for each piece of
/// asynchronous reset work and `leave` when it finishes. Waiters registered
/// with `notify` run once the count drops to zero, or immediately if it
/// already is zero.
#[derive(Clone, Default)]
pub struct ResetBarrier {
    state: Arc<Mutex<BarrierState>>,
}

impl ResetBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) {
        self.state().outstanding += 1;
    }

    /// Release one participant. Unbalanced calls are ignored.
    pub fn leave(&self) {
        let waiters = {
            let mut state = self.state();
            if state.outstanding == 0 {
                tracing::warn!("Reset barrier left more times than entered");
                return;
            }
            state.outstanding -= 1;
            if state.outstanding > 0 {
                return;
            }
            mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            waiter();
        }
    }

    /// Run `waiter` once no participants remain.
    pub fn notify<F>(&self, waiter: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.state();
            if state.outstanding > 0 {
                state.waiters.push(Box::new(waiter));
                return;
            }
        }
        waiter();
    }

    /// Number of participants that have not yet left.
    pub fn outstanding(&self) -> usize {
        self.state().outstanding
    }

    /// Enter the barrier, leaving again when the returned guard is dropped.
    pub fn participant(&self) -> BarrierParticipant {
        self.enter();
        BarrierParticipant {
            barrier: self.clone(),
        }
    }

    fn state(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().expect("reset barrier mutex poisoned")
    }
}

impl fmt::Debug for ResetBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetBarrier")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Guard that holds one barrier participant.
/// Leaves the barrier when dropped.
#[derive(Debug)]
pub struct BarrierParticipant {
    barrier: ResetBarrier,
}

impl Drop for BarrierParticipant {
    fn drop(&mut self) {
        self.barrier.leave();
    }
}
