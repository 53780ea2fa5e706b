//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming front door request path
//!     → table.rs (ordered pattern scan)
//!     → Return: Matched(target, forward path) | Redirect | NotFound
//!
//! Table construction (per listener set):
//!     subpath + metrics toggle
//!     → fixed-precedence route list, catch-all last
//!     → frozen, shared read-only by every request
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod table;

pub use table::{Resolution, Route, RouteTable, RouteTarget};
