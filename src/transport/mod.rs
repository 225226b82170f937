//! Transport capability.
//!
//! # Data Flow
//! ```text
//! TransportOperator
//!     → Request::to_wire() → WireRequest
//!     → Transport::send(wire, callback) → TransportTask handle
//!     → handle.resume() starts the exchange
//!     → callback(TransportOutcome) on a transport worker
//!     → translate_outcome() → HttpResult → Task::complete
//! ```
//!
//! # Design Decisions
//! - The transport is passed into the terminal stage explicitly; there is no
//!   process-wide default client
//! - A cancelled handle may call back with `Cancelled` or not at all; the
//!   terminal stage completes the task itself either way
//! - `http_client.rs` provides the reqwest-backed implementation

pub mod error;
pub mod http_client;

use std::collections::BTreeMap;
use std::sync::Arc;

use http::Method;
use url::Url;

pub use error::TransportError;
pub use http_client::HttpClientTransport;

/// The request as handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// Response metadata reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

/// Everything a transport reports when an exchange ends.
///
/// Any combination may be present; an error together with metadata means the
/// server answered but the exchange still failed (e.g. body too large).
#[derive(Debug, Clone, Default)]
pub struct TransportOutcome {
    pub data: Option<Vec<u8>>,
    pub response: Option<ResponseHead>,
    pub error: Option<TransportError>,
}

impl TransportOutcome {
    pub fn success(response: ResponseHead, data: Option<Vec<u8>>) -> Self {
        Self {
            data,
            response: Some(response),
            error: None,
        }
    }

    pub fn failure(error: TransportError) -> Self {
        Self {
            data: None,
            response: None,
            error: Some(error),
        }
    }
}

/// Invoked once with the outcome of an exchange.
pub type TransportCallback = Box<dyn FnOnce(TransportOutcome) + Send>;

/// Handle to a single exchange.
pub trait TransportTask: Send + Sync {
    /// Start the exchange. Calling it more than once has no further effect.
    fn resume(&self);

    fn cancel(&self);
}

/// Performs network exchanges on behalf of the terminal stage.
///
/// Implementations must call `completion` exactly once, unless the handle was
/// cancelled first, in which case they may call it with
/// [`TransportError::Cancelled`] or not at all.
pub trait Transport: Send + Sync {
    fn send(&self, request: WireRequest, completion: TransportCallback) -> Arc<dyn TransportTask>;
}
