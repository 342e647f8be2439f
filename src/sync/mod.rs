//! The write path: refresh cycles and the writer they drive.
//!
//! - [`SyncCoordinator`]: single-flight refresh state machine
//! - [`BatchWriter`]: cache publish and bounded-concurrency store upserts
//! - [`Scheduler`]: periodic trigger for unconditional refreshes
//!
//! ## Refresh Cycle
//!
//! ```text
//! Idle -> Fetching -> Persisting -> Idle
//!            |            |
//!            +-> Failed <-+-> Idle
//! ```
//!
//! The cache half of a cycle is advisory: a cache write failure is logged and
//! the cycle still succeeds once the store write does.

pub mod coordinator;
pub mod scheduler;
pub mod writer;

pub use coordinator::{SyncCoordinator, SyncError};
pub use scheduler::Scheduler;
pub use writer::{BatchWriter, PersistReport};
