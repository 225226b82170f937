//! Responses delivered to completion hooks.

use std::borrow::Cow;
use std::collections::BTreeMap;

use http::StatusCode;

use crate::http::request::Request;

/// A response paired with the request that produced it.
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    status: StatusCode,
    headers: BTreeMap<String, String>,
    data: Option<Vec<u8>>,
}

impl Response {
    pub fn new(
        request: Request,
        status: StatusCode,
        headers: BTreeMap<String, String>,
        data: Option<Vec<u8>>,
    ) -> Self {
        Self {
            request,
            status,
            headers,
            data,
        }
    }

    /// The request as it was when it reached the transport.
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Header lookup, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.data.as_deref().unwrap_or_default())
    }

    /// Canonical reason phrase for the status code.
    pub fn message(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
