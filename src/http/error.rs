//! Error taxonomy for requests flowing through a chain.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::http::request::Request;
use crate::http::response::Response;

/// What went wrong with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The response body was larger than the transport accepts.
    BodyExceedsMaximum,
    /// The chain has no terminal stage.
    CannotConnect,
    Cancelled,
    /// TLS or certificate failure.
    InsecureConnection,
    /// The request could not be turned into a wire request.
    InvalidRequest,
    /// The transport returned no usable response.
    InvalidResponse,
    /// A reset is running through the chain.
    IsResetting,
    NoConnection,
    Unauthorized,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BodyExceedsMaximum => "body_exceeds_maximum",
            ErrorCode::CannotConnect => "cannot_connect",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::InsecureConnection => "insecure_connection",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::InvalidResponse => "invalid_response",
            ErrorCode::IsResetting => "is_resetting",
            ErrorCode::NoConnection => "no_connection",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request.
///
/// Carries the originating request, the response if one was captured before
/// the failure, and the underlying error for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("{code}: {} {}", .request.method(), .request.path())]
pub struct HttpError {
    pub code: ErrorCode,
    pub request: Request,
    pub response: Option<Response>,
    #[source]
    pub underlying: Option<Arc<dyn StdError + Send + Sync>>,
}

impl HttpError {
    pub fn new(code: ErrorCode, request: Request) -> Self {
        Self {
            code,
            request,
            response: None,
            underlying: None,
        }
    }

    pub fn with_response(mut self, response: Option<Response>) -> Self {
        self.response = response;
        self
    }

    pub fn with_underlying(mut self, error: impl StdError + Send + Sync + 'static) -> Self {
        self.underlying = Some(Arc::new(error));
        self
    }
}

/// Outcome of a request.
pub type HttpResult = Result<Response, HttpError>;

/// Uniform access to the request and response on both arms of an [`HttpResult`].
pub trait HttpResultExt {
    fn request(&self) -> &Request;
    fn response(&self) -> Option<&Response>;
    fn error_code(&self) -> Option<ErrorCode>;
}

impl HttpResultExt for HttpResult {
    fn request(&self) -> &Request {
        match self {
            Ok(response) => response.request(),
            Err(error) => &error.request,
        }
    }

    fn response(&self) -> Option<&Response> {
        match self {
            Ok(response) => Some(response),
            Err(error) => error.response.as_ref(),
        }
    }

    fn error_code(&self) -> Option<ErrorCode> {
        self.as_ref().err().map(|error| error.code)
    }
}
