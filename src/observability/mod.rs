//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Stages produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by EnvFilter)
//!     → Metrics endpoint (Prometheus scrape, binary only)
//! ```
//!
//! # Design Decisions
//! - The library only emits events; installing a subscriber or recorder is
//!   left to the binary
//! - Task id and request id are attached to every per-request event
//! - Metric updates without an installed recorder are no-ops

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::init_metrics;
