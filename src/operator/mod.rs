//! Operator chain abstraction.
//!
//! # Data Flow
//! ```text
//! Chain::send(request, completion)
//!     → Task::new → head.load(task)
//!     → stage.load → stage.forward → next.load → ... → TransportOperator
//!
//! Chain::reset(completion)
//!     → ResetBarrier::new → head.reset(&barrier) → ... → barrier.notify(completion)
//! ```
//!
//! # Design Decisions
//! - Each node owns only its `next` reference, assigned once through [`Link`]
//! - `load` and `reset` default to forwarding, so stateless stages override
//!   only what they change
//! - A node with no successor fails tasks with `cannotConnect`

pub mod builder;
pub mod chain;

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::http::{ErrorCode, Request};
use crate::lifecycle::{CompletionHook, ResetBarrier, Task};

pub use builder::{BuildError, OperatorBuilder, RequestTransform, Stage};
pub use chain::Chain;

/// One-shot reference to the next node in a chain.
#[derive(Default)]
pub struct Link {
    next: OnceLock<Arc<dyn Operator>>,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Arc<dyn Operator>> {
        self.next.get()
    }

    /// Assign the next node.
    ///
    /// # Panics
    /// If the link has already been assigned. Chains are immutable once built.
    pub fn set(&self, next: Arc<dyn Operator>) {
        let name = next.name();
        if self.next.set(next).is_err() {
            panic!("operator already linked; refusing to relink to {name}");
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("next", &self.get().map(|next| next.name()))
            .finish()
    }
}

/// A node in the request-processing chain.
pub trait Operator: Send + Sync {
    fn link(&self) -> &Link;

    /// Short stage name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Process a task. Defaults to forwarding it unchanged.
    fn load(&self, task: Task) {
        self.forward(task);
    }

    /// Reset this stage's state. Defaults to forwarding the barrier unchanged.
    ///
    /// Stateful stages enter `barrier` for each piece of asynchronous reset
    /// work before forwarding.
    fn reset(&self, barrier: &ResetBarrier) {
        self.forward_reset(barrier);
    }

    fn next(&self) -> Option<Arc<dyn Operator>> {
        self.link().get().cloned()
    }

    /// # Panics
    /// If this node is already linked.
    fn set_next(&self, next: Arc<dyn Operator>) {
        self.link().set(next);
    }

    /// Hand `task` to the next node, or fail it with `cannotConnect`.
    fn forward(&self, task: Task) {
        match self.link().get() {
            Some(next) => next.load(task),
            None => {
                tracing::debug!(stage = self.name(), task_id = %task.id(), "No next stage");
                task.fail(ErrorCode::CannotConnect);
            }
        }
    }

    fn forward_reset(&self, barrier: &ResetBarrier) {
        if let Some(next) = self.link().get() {
            next.reset(barrier);
        }
    }

    /// Wrap `request` in a task, load it into this node, and return the task.
    fn send(&self, request: Request, completion: CompletionHook) -> Task {
        let task = Task::new(request, completion);
        self.load(task.clone());
        task
    }

    /// Reset from this node down, running `completion` once every stage and
    /// every task drained by the pass has finished.
    fn reset_with(&self, completion: Box<dyn FnOnce() + Send>) {
        let barrier = ResetBarrier::new();
        self.reset(&barrier);
        barrier.notify(completion);
    }
}
