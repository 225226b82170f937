//! Public entry point for a built chain.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::http::{ErrorCode, HttpError, HttpResult, Request};
use crate::lifecycle::Task;
use crate::operator::Operator;

/// A linked chain of operators, addressed through its head.
///
/// Cheap to clone; clones share the same stages.
#[derive(Clone)]
pub struct Chain {
    head: Arc<dyn Operator>,
}

impl Chain {
    pub fn new(head: Arc<dyn Operator>) -> Self {
        Self { head }
    }

    pub fn head(&self) -> &Arc<dyn Operator> {
        &self.head
    }

    /// Names of the stages from head to terminal.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = vec![self.head.name()];
        let mut node = self.head.next();
        while let Some(current) = node {
            names.push(current.name());
            node = current.next();
        }
        names
    }

    /// Push `request` through the chain.
    ///
    /// Returns immediately; `completion` runs exactly once on whichever thread
    /// settles the task.
    pub fn send<F>(&self, request: Request, completion: F) -> Task
    where
        F: FnOnce(&HttpResult) + Send + 'static,
    {
        self.head.send(request, Box::new(completion))
    }

    /// Reset every stage, running `completion` once the whole pass has drained.
    pub fn reset<F>(&self, completion: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.head.reset_with(Box::new(completion));
    }

    /// Send and await the result.
    ///
    /// Dropping the future cancels the task.
    pub async fn send_async(&self, request: Request) -> HttpResult {
        let (tx, rx) = oneshot::channel();
        let task = self.send(request.clone(), move |result| {
            let _ = tx.send(result.clone());
        });
        let _guard = CancelOnDrop(task);

        rx.await
            .unwrap_or_else(|_| Err(HttpError::new(ErrorCode::Unknown, request)))
    }

    /// Reset and wait for the pass to drain.
    pub async fn reset_async(&self) {
        let (tx, rx) = oneshot::channel();
        self.reset(move || {
            let _ = tx.send(());
        });
        let _ = rx.await;
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Cancels the wrapped task when dropped. A no-op once the task has completed.
struct CancelOnDrop(Task);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
