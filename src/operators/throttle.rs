//! Bounded-concurrency scheduler.
//!
//! # States
//! ```text
//! load → Pending (queued) → Running → finished
//!      ↘ Running (free slot)
//! Pending → cancelled (fails with `cancelled`, never forwarded)
//! ```
//!
//! # Design Decisions
//! - `running`, `pending` and `limit` share one mutex, so "slot freed" and
//!   "next task promoted" are decided under the same lock
//! - Promoted tasks are forwarded after the lock is released
//! - Promotion is a loop owned by one caller at a time (`draining`); a task
//!   that completes synchronously while being started only frees its slot,
//!   so stack depth stays constant however many queued tasks fail inline
//! - Reset swaps both collections out before cancelling anything

use std::collections::{HashMap, VecDeque};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::http::{ErrorCode, ThrottleOption};
use crate::lifecycle::{ResetBarrier, Task, TaskId};
use crate::observability::metrics;
use crate::operator::{Link, Operator};

#[derive(Debug)]
struct ThrottleState {
    limit: usize,
    running: HashMap<TaskId, Task>,
    pending: VecDeque<Task>,
    /// Set while some caller is running the promotion loop.
    draining: bool,
}

impl ThrottleState {
    /// Move pending tasks into free slots, returning the ones to start.
    fn promote_ready(&mut self) -> Vec<Task> {
        let mut ready = Vec::new();
        while self.running.len() < self.limit {
            let Some(task) = self.pending.pop_front() else {
                break;
            };
            if task.is_completed() {
                continue;
            }
            self.running.insert(task.id(), task.clone());
            ready.push(task);
        }
        ready
    }

    fn record(&self) {
        metrics::record_throttle_occupancy(self.running.len(), self.pending.len());
    }
}

/// Admits at most `limit` tasks at a time into the rest of the chain.
///
/// Excess tasks queue in arrival order. Requests whose throttle option is
/// [`ThrottleOption::Never`] bypass the queue.
#[derive(Debug)]
pub struct Throttle {
    link: Link,
    this: Weak<Throttle>,
    state: Mutex<ThrottleState>,
}

impl Throttle {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            link: Link::new(),
            this: this.clone(),
            state: Mutex::new(ThrottleState {
                limit,
                running: HashMap::new(),
                pending: VecDeque::new(),
                draining: false,
            }),
        })
    }

    pub fn limit(&self) -> usize {
        self.state().limit
    }

    /// Change the limit, starting queued tasks if slots opened up.
    pub fn set_limit(&self, limit: usize) {
        let owns_drain = {
            let mut state = self.state();
            state.limit = limit;
            !mem::replace(&mut state.draining, true)
        };
        tracing::debug!(limit, "Throttle limit changed");
        if owns_drain {
            self.drain();
        }
    }

    pub fn running_count(&self) -> usize {
        self.state().running.len()
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    fn state(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().expect("throttle mutex poisoned")
    }

    fn enqueue(&self, task: Task) {
        let admitted = {
            let mut state = self.state();
            // A slot freed during a drain belongs to the queue head.
            let admitted = if state.running.len() < state.limit && state.pending.is_empty() {
                state.running.insert(task.id(), task.clone());
                true
            } else {
                state.pending.push_back(task.clone());
                false
            };
            state.record();
            admitted
        };

        if admitted {
            self.start(task);
            return;
        }

        tracing::trace!(task_id = %task.id(), "Task queued");
        let this = self.this.clone();
        let queued = task.clone();
        task.add_cancellation(move || {
            if let Some(throttle) = this.upgrade() {
                throttle.cancel_queued(&queued);
            } else {
                queued.fail(ErrorCode::Cancelled);
            }
        });
        // Cancelled before the hook was armed.
        if task.is_cancelled() {
            self.cancel_queued(&task);
        }
    }

    /// Resolve a task cancelled while waiting for a slot.
    fn cancel_queued(&self, task: &Task) {
        let id = task.id();
        let running = {
            let mut state = self.state();
            state.pending.retain(|queued| queued.id() != id);
            state.record();
            state.running.contains_key(&id)
        };
        // A promoted task is completed by the stages below it.
        if !running {
            tracing::trace!(task_id = %id, "Queued task cancelled");
            task.fail(ErrorCode::Cancelled);
        }
    }

    fn start(&self, task: Task) {
        let this = self.this.clone();
        let id = task.id();
        task.add_completion(move |_| {
            if let Some(throttle) = this.upgrade() {
                throttle.finish(id);
            }
        });

        if task.is_cancelled() {
            task.fail(ErrorCode::Cancelled);
            return;
        }
        self.forward(task);
    }

    /// Start queued tasks until no slot is free or nothing is waiting.
    ///
    /// Only called by the caller that flipped `draining` on; clears it under
    /// the same lock that observes an empty promotion.
    fn drain(&self) {
        loop {
            let ready = {
                let mut state = self.state();
                let ready = state.promote_ready();
                state.record();
                if ready.is_empty() {
                    state.draining = false;
                    return;
                }
                ready
            };
            for task in ready {
                tracing::trace!(task_id = %task.id(), "Task promoted");
                self.start(task);
            }
        }
    }

    fn finish(&self, id: TaskId) {
        let owns_drain = {
            let mut state = self.state();
            if state.running.remove(&id).is_none() {
                return;
            }
            state.record();
            !mem::replace(&mut state.draining, true)
        };
        if owns_drain {
            self.drain();
        }
    }
}

impl Operator for Throttle {
    fn link(&self) -> &Link {
        &self.link
    }

    fn name(&self) -> &'static str {
        "throttle"
    }

    fn load(&self, task: Task) {
        if task.inspect_request(|request| request.throttle()) == ThrottleOption::Never {
            self.forward(task);
            return;
        }
        if task.is_cancelled() {
            task.fail(ErrorCode::Cancelled);
            return;
        }
        self.enqueue(task);
    }

    fn reset(&self, barrier: &ResetBarrier) {
        let (running, pending) = {
            let mut state = self.state();
            let running = mem::take(&mut state.running);
            let pending = mem::take(&mut state.pending);
            state.record();
            (running, pending)
        };
        let cancelled = running.len() + pending.len();
        tracing::debug!(running = running.len(), pending = pending.len(), "Throttle reset");
        metrics::record_reset(self.name(), cancelled);

        self.forward_reset(barrier);

        for task in running.into_values().chain(pending) {
            let participant = barrier.participant();
            task.add_completion(move |_| drop(participant));
            task.cancel();
        }
    }
}
