//! Websocket event broadcasting.
//!
//! # Data Flow
//! ```text
//! Execution engine
//!     → ExecutionListener::on_execution_event
//!     → EventHub (serialize once to JSON)
//!     → broadcast channel
//!     → one task per websocket session → client
//! ```
//!
//! # Design Decisions
//! - A session subscribes during the upgrade, before the handshake
//!   response is sent, so nothing published after a client connects is lost
//! - Slow sessions skip what they missed rather than stall publishers
//! - Closing sessions is a broadcast too; sessions opened later are unaffected

mod hub;

pub use hub::EventHub;
