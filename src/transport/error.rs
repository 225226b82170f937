//! Transport-level failures and their mapping onto chain error codes.

use thiserror::Error;

use crate::http::ErrorCode;

/// Failures reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("bad URL: {0}")]
    BadUrl(String),

    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("cannot build request: {0}")]
    InvalidRequest(String),

    #[error("cannot find host {0}")]
    CannotFindHost(String),

    #[error("secure connection failed: {0}")]
    SecureConnectionFailed(String),

    #[error("server certificate rejected: {0}")]
    CertificateRejected(String),

    #[error("response body exceeds maximum of {0} bytes")]
    BodyExceedsMaximum(u64),

    #[error("not connected: {0}")]
    NotConnected(String),

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("bad server response: {0}")]
    BadServerResponse(String),

    #[error("cannot decode response: {0}")]
    CannotDecode(String),

    #[error("timed out")]
    TimedOut,

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// The chain error code this failure is reported as.
    pub fn code(&self) -> ErrorCode {
        match self {
            TransportError::Cancelled => ErrorCode::Cancelled,
            TransportError::BadUrl(_)
            | TransportError::UnsupportedUrl(_)
            | TransportError::InvalidRequest(_)
            | TransportError::CannotFindHost(_) => ErrorCode::InvalidRequest,
            TransportError::SecureConnectionFailed(_) | TransportError::CertificateRejected(_) => {
                ErrorCode::InsecureConnection
            }
            TransportError::BodyExceedsMaximum(_) => ErrorCode::BodyExceedsMaximum,
            TransportError::NotConnected(_) => ErrorCode::NoConnection,
            TransportError::AuthenticationRequired => ErrorCode::Unauthorized,
            TransportError::BadServerResponse(_) | TransportError::CannotDecode(_) => {
                ErrorCode::InvalidResponse
            }
            TransportError::TimedOut | TransportError::Other(_) => ErrorCode::Unknown,
        }
    }
}
