//! Composable request-processing pipeline for outbound HTTP calls.
//!
//! A [`Chain`] is a linked list of [`Operator`]s. Each request becomes a
//! [`Task`] that travels from the head of the chain to a terminal
//! [`TransportOperator`], which hands it to a pluggable [`Transport`]. Stages
//! can rewrite the request, attach completion and cancellation hooks, queue
//! it, or reject it. [`Chain::reset`] cancels in-flight work across every
//! stage and reports once the whole chain has drained.
//!
//! ```text
//! send(request) → ResetGuard → Autocancel → Logging → Throttle
//!     → ApplyEnvironment → TransportOperator → Transport
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod operator;
pub mod operators;
pub mod transport;

pub use config::PipelineConfig;
pub use crate::http::{
    Body, DataBody, EmptyBody, Environment, ErrorCode, HttpError, HttpResult, HttpResultExt,
    JsonBody, Method, Request, Response, ThrottleOption,
};
pub use lifecycle::{ResetBarrier, Task, TaskId};
pub use operator::{BuildError, Chain, Operator, OperatorBuilder, Stage};
pub use operators::{
    ApplyEnvironment, Autocancel, Logging, ModifyRequest, ResetGuard, Throttle, TransportOperator,
};
pub use transport::{HttpClientTransport, Transport, TransportError};
