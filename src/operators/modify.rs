//! Caller-supplied request rewrite.

use std::fmt;
use std::sync::Arc;

use crate::http::Request;
use crate::lifecycle::Task;
use crate::operator::{Link, Operator, RequestTransform};

/// Applies a pure transform to each request, then forwards it.
pub struct ModifyRequest {
    link: Link,
    transform: RequestTransform,
}

impl ModifyRequest {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(transform))
    }

    pub fn from_arc(transform: RequestTransform) -> Self {
        Self {
            link: Link::new(),
            transform,
        }
    }
}

impl Operator for ModifyRequest {
    fn link(&self) -> &Link {
        &self.link
    }

    fn name(&self) -> &'static str {
        "modify_request"
    }

    fn load(&self, task: Task) {
        task.set_request((self.transform)(task.request()));
        self.forward(task);
    }
}

impl fmt::Debug for ModifyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifyRequest").field("link", &self.link).finish()
    }
}
