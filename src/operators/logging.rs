//! Request and result logging.

use std::time::Instant;

use crate::http::HttpResult;
use crate::lifecycle::Task;
use crate::observability::metrics;
use crate::operator::{Link, Operator};

/// Logs each outgoing request and its result. Never alters either.
#[derive(Debug, Default)]
pub struct Logging {
    link: Link,
}

impl Logging {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Operator for Logging {
    fn link(&self) -> &Link {
        &self.link
    }

    fn name(&self) -> &'static str {
        "logging"
    }

    fn load(&self, task: Task) {
        let start = Instant::now();
        let task_id = task.id();
        let method = task.inspect_request(|request| {
            tracing::info!(
                task_id = %task_id,
                request_id = %request.id(),
                method = %request.method(),
                host = request.host().unwrap_or("-"),
                path = request.path(),
                "Sending request"
            );
            request.method().to_string()
        });

        task.add_completion(move |result: &HttpResult| {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match result {
                Ok(response) => {
                    tracing::info!(
                        task_id = %task_id,
                        request_id = %response.request().id(),
                        status = response.status().as_u16(),
                        elapsed_ms,
                        "Request completed"
                    );
                    metrics::record_request(&method, "ok", start);
                }
                Err(error) => {
                    tracing::warn!(
                        task_id = %task_id,
                        request_id = %error.request.id(),
                        code = %error.code,
                        status = error.response.as_ref().map(|r| r.status().as_u16()),
                        elapsed_ms,
                        "Request failed"
                    );
                    metrics::record_request(&method, error.code.as_str(), start);
                }
            }
        });

        self.forward(task);
    }
}
