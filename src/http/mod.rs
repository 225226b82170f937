//! Request and response value types.
//!
//! # Data Flow
//! ```text
//! Caller builds Request (method, headers, body, URL parts, options)
//!     → operators read/replace it through the Task
//!     → convert.rs (Request → WireRequest for the transport)
//!     → transport outcome → convert.rs (→ HttpResult)
//!     → Response / HttpError handed back through the completion hooks
//! ```
//!
//! # Design Decisions
//! - Request identity (`id`) is fixed at construction; clones keep it
//! - Options are a typed map keyed by option type, each with a declared default,
//!   so stages can read policy without knowing who set it
//! - Every error carries the originating request for uniform access

pub mod body;
pub mod convert;
pub mod error;
pub mod option;
pub mod request;
pub mod response;

pub use body::{Body, DataBody, EmptyBody, EncodingError, JsonBody};
pub use convert::translate_outcome;
pub use error::{ErrorCode, HttpError, HttpResult, HttpResultExt};
pub use option::{Environment, RequestOption, ThrottleOption};
pub use request::Request;
pub use response::Response;

pub use ::http::{Method, StatusCode};
