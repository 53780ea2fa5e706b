//! Dashboard listener orchestration and front door library.

pub mod config;
pub mod events;
pub mod hooks;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::DashboardConfig;
pub use events::EventHub;
pub use hooks::Hooks;
pub use http::ServiceKind;
pub use lifecycle::{LifecycleState, Orchestrator, OrchestratorError};
