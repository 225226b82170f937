//! Typed request options.
//!
//! Options let callers attach policy to a single request (throttling,
//! environment override) without the request type knowing about the stages
//! that read them.

use std::collections::BTreeMap;

/// A typed extension slot on a [`Request`](crate::http::Request).
///
/// The implementing type is only used as a key; the stored value is
/// `Self::Value`, and reading an unset option yields [`default_value`](Self::default_value).
pub trait RequestOption: 'static {
    type Value: Clone + Send + Sync + 'static;

    fn default_value() -> Self::Value;
}

/// Whether a request takes part in throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThrottleOption {
    /// Wait for a free slot at every throttle stage.
    #[default]
    Always,
    /// Bypass throttle stages entirely.
    Never,
}

impl RequestOption for ThrottleOption {
    type Value = Self;

    fn default_value() -> Self {
        Self::Always
    }
}

/// Host, path prefix, headers and query parameters shared by a family of requests.
///
/// Used as the default of an `ApplyEnvironment` stage, or attached to a single
/// request as an override.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Environment {
    host: String,
    path_prefix: String,
    headers: BTreeMap<String, String>,
    query: Vec<(String, String)>,
}

impl Environment {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Set the path prefix. A leading `/` is added and trailing slashes are
    /// dropped, so `"v1"`, `"/v1"` and `"/v1/"` are equivalent and `"/"` means
    /// no prefix.
    pub fn with_path_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.path_prefix = normalize_prefix(prefix.as_ref());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
}

impl RequestOption for Environment {
    type Value = Option<Environment>;

    fn default_value() -> Self::Value {
        None
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_prefix_is_normalized() {
        assert_eq!(Environment::new("h").with_path_prefix("v1").path_prefix(), "/v1");
        assert_eq!(Environment::new("h").with_path_prefix("/v1/").path_prefix(), "/v1");
        assert_eq!(Environment::new("h").with_path_prefix("/").path_prefix(), "");
        assert_eq!(Environment::new("h").path_prefix(), "");
    }

    #[test]
    fn option_defaults() {
        assert_eq!(ThrottleOption::default_value(), ThrottleOption::Always);
        assert!(Environment::default_value().is_none());
    }
}
