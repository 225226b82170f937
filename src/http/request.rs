//! The request value carried through an operator chain.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use http::Method;
use url::Url;
use uuid::Uuid;

use crate::http::body::{Body, EmptyBody};
use crate::http::option::{Environment, RequestOption, ThrottleOption};

/// An outgoing HTTP request.
///
/// Cheap to clone; the body and option values are shared. The `id` is assigned
/// once at construction and survives every mutation and clone. Header names
/// are stored lowercased, so lookups and merges ignore ASCII case.
#[derive(Clone)]
pub struct Request {
    id: Uuid,
    method: Method,
    headers: BTreeMap<String, String>,
    body: Arc<dyn Body>,
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Vec<(String, String)>,
    options: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Request {
    pub const DEFAULT_SCHEME: &'static str = "https";

    pub fn new(method: Method) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            headers: BTreeMap::new(),
            body: Arc::new(EmptyBody),
            scheme: Self::DEFAULT_SCHEME.to_string(),
            host: None,
            port: None,
            path: String::new(),
            query: Vec::new(),
            options: HashMap::new(),
        }
    }

    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::GET).with_path(path)
    }

    pub fn post(path: impl AsRef<str>) -> Self {
        Self::new(Method::POST).with_path(path)
    }

    pub fn put(path: impl AsRef<str>) -> Self {
        Self::new(Method::PUT).with_path(path)
    }

    pub fn patch(path: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH).with_path(path)
    }

    pub fn delete(path: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE).with_path(path)
    }

    /// Build a request from an absolute URL, splitting it into its parts.
    pub fn from_url(method: Method, url: &Url) -> Self {
        let mut request = Self::new(method);
        request.scheme = url.scheme().to_string();
        request.host = url.host_str().map(str::to_string);
        request.port = url.port();
        request.set_path(url.path());
        request.query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        request
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    // --- Headers ---

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&header_key(name)).map(String::as_str)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(header_key(&name.into()), value.into());
    }

    /// Merge headers into the request, overwriting existing values.
    pub fn add_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(
            headers
                .into_iter()
                .map(|(k, v)| (header_key(&k.into()), v.into())),
        );
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.add_headers(headers);
        self
    }

    // --- Body ---

    pub fn body(&self) -> &dyn Body {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Body + 'static) {
        self.body = Arc::new(body);
    }

    pub fn with_body(mut self, body: impl Body + 'static) -> Self {
        self.set_body(body);
        self
    }

    // --- URL components ---

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) {
        self.scheme = scheme.into();
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.set_host(host);
        self
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn set_port(&mut self, port: Option<u16>) {
        self.port = port;
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Set the path; a non-empty path always starts with `/`.
    pub fn set_path(&mut self, path: impl AsRef<str>) {
        let path = path.as_ref();
        self.path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
    }

    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.set_path(path);
        self
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn add_query<I, K, V>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(items.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    // --- Options ---

    /// Read an option, falling back to the option type's default.
    pub fn option<O: RequestOption>(&self) -> O::Value {
        self.options
            .get(&TypeId::of::<O>())
            .and_then(|value| value.downcast_ref::<O::Value>())
            .cloned()
            .unwrap_or_else(O::default_value)
    }

    pub fn set_option<O: RequestOption>(&mut self, value: O::Value) {
        self.options.insert(TypeId::of::<O>(), Arc::new(value));
    }

    pub fn throttle(&self) -> ThrottleOption {
        self.option::<ThrottleOption>()
    }

    pub fn set_throttle(&mut self, throttle: ThrottleOption) {
        self.set_option::<ThrottleOption>(throttle);
    }

    pub fn with_throttle(mut self, throttle: ThrottleOption) -> Self {
        self.set_throttle(throttle);
        self
    }

    pub fn environment(&self) -> Option<Environment> {
        self.option::<Environment>()
    }

    pub fn set_environment(&mut self, environment: Option<Environment>) {
        self.set_option::<Environment>(environment);
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.set_environment(Some(environment));
        self
    }
}

/// Canonical map key for a header name.
pub(crate) fn header_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("options", &self.options.len())
            .finish()
    }
}
