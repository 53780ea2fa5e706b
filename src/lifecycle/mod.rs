//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Config snapshot → Bind every enabled listener → Spawn one task each
//!
//! Shutdown (orchestrator.rs, shutdown.rs):
//!     stop() → Request shutdown of each listener → Drain in parallel
//!            → Force-close after grace period → Release waiters
//!
//! Reload:
//!     New snapshot → Full teardown → Rebuild from scratch
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop()
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bind failure starts nothing
//! - Stop is idempotent
//! - Every drain is bounded by the configured grace period

pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use orchestrator::{Orchestrator, OrchestratorError};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::shutdown_signal;
pub use state::{LifecycleState, StateCell};
