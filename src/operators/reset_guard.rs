//! Keeps at most one reset in flight through the rest of the chain.

use std::sync::{Arc, Mutex};

use crate::http::ErrorCode;
use crate::lifecycle::{ResetBarrier, Task};
use crate::observability::metrics;
use crate::operator::{Link, Operator};

/// Rejects new work while a reset is running below it, and drops reset calls
/// that arrive while one is already in flight.
#[derive(Debug, Default)]
pub struct ResetGuard {
    link: Link,
    resetting: Arc<Mutex<bool>>,
}

impl ResetGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resetting(&self) -> bool {
        *self.resetting.lock().expect("reset guard mutex poisoned")
    }
}

impl Operator for ResetGuard {
    fn link(&self) -> &Link {
        &self.link
    }

    fn name(&self) -> &'static str {
        "reset_guard"
    }

    fn load(&self, task: Task) {
        if self.is_resetting() {
            tracing::debug!(task_id = %task.id(), "Rejecting task during reset");
            task.fail(ErrorCode::IsResetting);
            return;
        }
        self.forward(task);
    }

    fn reset(&self, barrier: &ResetBarrier) {
        let Some(next) = self.next() else {
            return;
        };
        {
            let mut resetting = self.resetting.lock().expect("reset guard mutex poisoned");
            if *resetting {
                tracing::debug!("Reset already in progress, ignoring");
                return;
            }
            *resetting = true;
        }
        tracing::info!("Reset started");
        metrics::record_reset(self.name(), 0);

        let participant = barrier.participant();
        let downstream = ResetBarrier::new();
        next.reset(&downstream);

        let resetting = Arc::clone(&self.resetting);
        downstream.notify(move || {
            *resetting.lock().expect("reset guard mutex poisoned") = false;
            tracing::info!("Reset finished");
            drop(participant);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResult, HttpResultExt, Request};

    #[test]
    fn reset_without_next_is_ignored() {
        let guard = ResetGuard::new();
        let barrier = ResetBarrier::new();
        guard.reset(&barrier);

        assert_eq!(barrier.outstanding(), 0);
        assert!(!guard.is_resetting());
    }

    #[test]
    fn synchronous_downstream_reset_clears_flag() {
        let guard = ResetGuard::new();
        guard.set_next(Arc::new(ResetGuard::new()));

        let barrier = ResetBarrier::new();
        guard.reset(&barrier);

        assert!(!guard.is_resetting());
        assert_eq!(barrier.outstanding(), 0);

        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        // Inner guard has no next: the task reaches the end and cannot connect.
        guard.send(
            Request::get("/"),
            Box::new(move |result: &HttpResult| *slot.lock().unwrap() = result.error_code()),
        );
        assert_eq!(*seen.lock().unwrap(), Some(ErrorCode::CannotConnect));
    }
}
