//! Concrete chain stages.
//!
//! # Data Flow
//! ```text
//! ResetGuard → Autocancel → Logging → Throttle → ApplyEnvironment
//!     → ModifyRequest → TransportOperator → Transport
//! ```
//! (a typical composition; any order is allowed)
//!
//! # Design Decisions
//! - Stateless stages (environment, modify, logging) never hold a lock
//! - Stateful stages (autocancel, throttle, reset_guard) own one mutex each
//!   and release it before touching a task's hooks
//! - On reset, a stage swaps its state out, forwards the barrier, then cancels
//!   the drained tasks, joining each one into the barrier
//! - The transport stage is the only caller of [`Transport`](crate::transport::Transport)

pub mod autocancel;
pub mod environment;
pub mod logging;
pub mod modify;
pub mod reset_guard;
pub mod throttle;
pub mod transport;

pub use autocancel::Autocancel;
pub use environment::ApplyEnvironment;
pub use logging::Logging;
pub use modify::ModifyRequest;
pub use reset_guard::ResetGuard;
pub use throttle::Throttle;
pub use transport::TransportOperator;
