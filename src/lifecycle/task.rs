//! The lifecycle object for one in-flight request.
//!
//! # States
//! ```text
//! Pending → Cancelled → Completed
//! Pending → Completed
//! ```
//!
//! # Design Decisions
//! - Both flags are monotone; `complete` and `cancel` take effect once
//! - Hooks are taken out of the state and run after the lock is released, so a
//!   hook may freely call back into the task or into a stage's own state
//! - Completion hooks run in registration order, cancellation hooks in reverse
//! - A completion hook added after completion runs immediately with the stored
//!   result, so late joiners (reset drains) never wait on a finished task

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::http::{ErrorCode, HttpError, HttpResult, Request};

/// Global atomic counter for task IDs.
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for a task.
///
/// Distinct from the request id: two tasks may carry clones of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

pub type CompletionHook = Box<dyn FnOnce(&HttpResult) + Send>;
pub type CancellationHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TaskState {
    completion_hooks: Vec<CompletionHook>,
    cancellation_hooks: Vec<CancellationHook>,
    cancelled: bool,
    /// Set exactly once; `Some` means completed.
    result: Option<HttpResult>,
}

struct TaskInner {
    id: TaskId,
    request: Mutex<Request>,
    state: Mutex<TaskState>,
}

/// Shared handle to one in-flight request.
///
/// Clones refer to the same task. Stages hold a clone only while the request
/// is passing through them.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

impl Task {
    /// Create a task whose first completion hook is `completion`.
    pub fn new<F>(request: Request, completion: F) -> Self
    where
        F: FnOnce(&HttpResult) + Send + 'static,
    {
        let task = Self::detached(request);
        task.state().completion_hooks.push(Box::new(completion));
        task
    }

    /// Create a task with no hooks attached.
    pub fn detached(request: Request) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                request: Mutex::new(request),
                state: Mutex::new(TaskState::default()),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// A copy of the current request.
    pub fn request(&self) -> Request {
        self.inner.request.lock().expect("task request mutex poisoned").clone()
    }

    /// Read the current request without copying it.
    pub fn inspect_request<R>(&self, f: impl FnOnce(&Request) -> R) -> R {
        f(&self.inner.request.lock().expect("task request mutex poisoned"))
    }

    /// Replace the request carried by this task.
    pub fn set_request(&self, request: Request) {
        *self.inner.request.lock().expect("task request mutex poisoned") = request;
    }

    /// Modify the request in place.
    pub fn update_request(&self, f: impl FnOnce(&mut Request)) {
        f(&mut self.inner.request.lock().expect("task request mutex poisoned"));
    }

    pub fn is_cancelled(&self) -> bool {
        self.state().cancelled
    }

    pub fn is_completed(&self) -> bool {
        self.state().result.is_some()
    }

    /// Register a hook to run when the task completes.
    ///
    /// If the task has already completed the hook runs immediately, on the
    /// calling thread, with the stored result.
    pub fn add_completion<F>(&self, hook: F)
    where
        F: FnOnce(&HttpResult) + Send + 'static,
    {
        let finished = {
            let mut state = self.state();
            match &state.result {
                Some(result) => Some(result.clone()),
                None => {
                    state.completion_hooks.push(Box::new(hook));
                    return;
                }
            }
        };
        if let Some(result) = finished {
            hook(&result);
        }
    }

    /// Register a hook to run when the task is cancelled.
    ///
    /// Ignored once the task is cancelled or completed.
    pub fn add_cancellation<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state();
        if state.cancelled || state.result.is_some() {
            return;
        }
        state.cancellation_hooks.push(Box::new(hook));
    }

    /// Cancel the task, running cancellation hooks most-recent first.
    ///
    /// Does nothing after the first call or once the task has completed.
    pub fn cancel(&self) {
        let hooks = {
            let mut state = self.state();
            if state.cancelled || state.result.is_some() {
                return;
            }
            state.cancelled = true;
            mem::take(&mut state.cancellation_hooks)
        };

        tracing::trace!(task_id = %self.id(), hooks = hooks.len(), "Cancelling task");
        for hook in hooks.into_iter().rev() {
            hook();
        }
    }

    /// Settle the task, running completion hooks in registration order.
    ///
    /// Only the first call has any effect.
    pub fn complete(&self, result: HttpResult) {
        let hooks = {
            let mut state = self.state();
            if state.result.is_some() {
                return;
            }
            state.result = Some(result.clone());
            state.cancellation_hooks.clear();
            mem::take(&mut state.completion_hooks)
        };

        for hook in hooks {
            hook(&result);
        }
    }

    /// Complete with an error of the given kind for the current request.
    pub fn fail(&self, code: ErrorCode) {
        self.complete(Err(HttpError::new(code, self.request())));
    }

    fn state(&self) -> MutexGuard<'_, TaskState> {
        self.inner.state.lock().expect("task state mutex poisoned")
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("cancelled", &state.cancelled)
            .field("completed", &state.result.is_some())
            .finish()
    }
}
