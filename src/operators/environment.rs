//! Fills in host, path prefix, headers and query from an environment.

use crate::http::{Environment, Request};
use crate::lifecycle::Task;
use crate::operator::{Link, Operator};

/// Applies the request's environment override, or the stage default, to
/// every request passing through.
///
/// Only unset parts of the request are filled in: an existing host, header
/// or query item always wins over the environment.
#[derive(Debug, Default)]
pub struct ApplyEnvironment {
    link: Link,
    default: Option<Environment>,
}

impl ApplyEnvironment {
    pub fn new(default: Option<Environment>) -> Self {
        Self {
            link: Link::new(),
            default,
        }
    }

    pub fn default_environment(&self) -> Option<&Environment> {
        self.default.as_ref()
    }
}

impl Operator for ApplyEnvironment {
    fn link(&self) -> &Link {
        &self.link
    }

    fn name(&self) -> &'static str {
        "environment"
    }

    fn load(&self, task: Task) {
        task.update_request(|request| {
            if let Some(environment) = request.environment().or_else(|| self.default.clone()) {
                apply(request, &environment);
            }
        });
        self.forward(task);
    }
}

fn apply(request: &mut Request, environment: &Environment) {
    if request.host().map_or(true, str::is_empty) {
        request.set_host(environment.host());
    }

    let prefixed = prefix_path(request.path(), environment.path_prefix());
    if prefixed != request.path() {
        request.set_path(prefixed);
    }

    for (name, value) in environment.headers() {
        if request.header(name).is_none() {
            request.set_header(name.clone(), value.clone());
        }
    }

    let missing: Vec<_> = environment
        .query()
        .iter()
        .filter(|(name, _)| !request.query().iter().any(|(existing, _)| existing == name))
        .cloned()
        .collect();
    request.add_query(missing);
}

/// Prefix `path` with `prefix` unless it already starts with that segment.
///
/// `prefix` is normalized (`/v1`, or empty for none).
pub(crate) fn prefix_path(path: &str, prefix: &str) -> String {
    if prefix.is_empty() || path == prefix {
        return path.to_string();
    }
    if path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/')) {
        return path.to_string();
    }
    format!("{prefix}{path}")
}
