//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (bind, resolve bound/dial addresses)
//!     → http::server (accept loop)
//!     → connection.rs (per-connection ID and open-connection count)
//! ```
//!
//! # Design Decisions
//! - Every listener is bound before any starts serving, so a bind failure
//!   never leaves a half-started dashboard behind
//! - Each connection is tracked so a drain can report what it force-closed

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
