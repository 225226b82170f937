//! Terminal stage bridging tasks to a [`Transport`].

use std::fmt;
use std::sync::Arc;

use crate::http::{translate_outcome, ErrorCode};
use crate::lifecycle::Task;
use crate::operator::{Link, Operator};
use crate::transport::{Transport, TransportOutcome};

/// Converts the request to wire form, submits it, and completes the task
/// with the translated outcome.
///
/// Conversion failures complete the task synchronously and never reach the
/// transport.
pub struct TransportOperator {
    link: Link,
    transport: Arc<dyn Transport>,
}

impl TransportOperator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            link: Link::new(),
            transport,
        }
    }
}

impl Operator for TransportOperator {
    fn link(&self) -> &Link {
        &self.link
    }

    fn name(&self) -> &'static str {
        "transport"
    }

    fn load(&self, task: Task) {
        if task.is_cancelled() {
            task.fail(ErrorCode::Cancelled);
            return;
        }

        let request = task.request();
        let wire = match request.to_wire() {
            Ok(wire) => wire,
            Err(error) => {
                tracing::debug!(task_id = %task.id(), code = %error.code, "Request not sendable");
                task.complete(Err(error));
                return;
            }
        };

        tracing::trace!(task_id = %task.id(), url = %wire.url, "Submitting to transport");
        let completing = task.clone();
        let handle = self.transport.send(
            wire,
            Box::new(move |outcome: TransportOutcome| completing.complete(translate_outcome(request, outcome))),
        );

        let cancelled = task.clone();
        let cancel_handle = Arc::clone(&handle);
        task.add_cancellation(move || {
            cancel_handle.cancel();
            cancelled.fail(ErrorCode::Cancelled);
        });
        // Cancelled between the first check and arming the hook.
        if task.is_cancelled() {
            handle.cancel();
            task.fail(ErrorCode::Cancelled);
            return;
        }

        handle.resume();
    }
}

impl fmt::Debug for TransportOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOperator").finish_non_exhaustive()
    }
}
