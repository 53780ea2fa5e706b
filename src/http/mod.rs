//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Bound listener
//!     → server.rs (accept loop, HTTP/1.1 + HTTP/2, graceful drain)
//!     → collaborator router (web UI, REST/API, RPC, metrics)
//!       or front_door.rs (route table → inline hook or proxy.rs hop)
//!     → response streamed back to the client
//! ```

pub mod front_door;
pub mod proxy;
pub mod server;

pub use front_door::{FrontDoorState, FrontDoorTargets};
pub use proxy::Upstream;
pub use server::{ServiceHandle, ServiceKind};
