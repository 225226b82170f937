//! Lifecycle of requests and resets.
//!
//! # Data Flow
//! ```text
//! Send (task.rs):
//!     Request + completion → Task → stages attach hooks → complete(result)
//!
//! Reset (barrier.rs):
//!     Chain::reset → ResetBarrier → each stage enters per drained task
//!     → tasks complete → participants leave → notify fires once
//! ```
//!
//! # Design Decisions
//! - No hook ever runs while a lock is held
//! - A single barrier is shared by the whole reset pass, not one per stage
//! - Barrier participants are RAII guards, so a drained task releases its
//!   slot whichever way it completes

pub mod barrier;
pub mod task;

pub use barrier::{BarrierParticipant, ResetBarrier};
pub use task::{CancellationHook, CompletionHook, Task, TaskId};
