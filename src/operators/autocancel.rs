//! Registry of in-flight tasks, cancelled wholesale on reset.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, Weak};

use crate::lifecycle::{ResetBarrier, Task, TaskId};
use crate::observability::metrics;
use crate::operator::{Link, Operator};

type Registry = Mutex<HashMap<TaskId, Task>>;

/// Tracks every task passing through so a reset can cancel all of them.
#[derive(Debug, Default)]
pub struct Autocancel {
    link: Link,
    tasks: Arc<Registry>,
}

impl Autocancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently tracked.
    pub fn tracked(&self) -> usize {
        self.tasks.lock().expect("autocancel mutex poisoned").len()
    }
}

impl Operator for Autocancel {
    fn link(&self) -> &Link {
        &self.link
    }

    fn name(&self) -> &'static str {
        "autocancel"
    }

    fn load(&self, task: Task) {
        let id = task.id();
        self.tasks
            .lock()
            .expect("autocancel mutex poisoned")
            .insert(id, task.clone());

        let registry: Weak<Registry> = Arc::downgrade(&self.tasks);
        task.add_completion(move |_| {
            if let Some(registry) = registry.upgrade() {
                registry.lock().expect("autocancel mutex poisoned").remove(&id);
            }
        });

        self.forward(task);
    }

    fn reset(&self, barrier: &ResetBarrier) {
        let drained = mem::take(&mut *self.tasks.lock().expect("autocancel mutex poisoned"));
        tracing::debug!(tasks = drained.len(), "Autocancel reset");
        metrics::record_reset(self.name(), drained.len());

        self.forward_reset(barrier);

        for task in drained.into_values() {
            let participant = barrier.participant();
            task.add_completion(move |_| drop(participant));
            task.cancel();
        }
    }
}
