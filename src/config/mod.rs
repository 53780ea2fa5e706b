//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.toml
//!     → loader.rs (parse, fill defaults from base port)
//!     → validation.rs (semantic checks)
//!     → DashboardConfig (validated, immutable)
//!     → shared via Arc with the orchestrator
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → new snapshot sent to the orchestrator
//!     → full listener-set teardown and rebuild
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, reload_config, ConfigError};
pub use schema::{
    DashboardConfig, FrontDoorConfig, ListenerAddresses, LogDebugOptions, MetricsConfig,
    ShutdownConfig,
};
pub use watcher::ConfigWatcher;
