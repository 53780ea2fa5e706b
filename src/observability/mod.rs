//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (front door counters and latency histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics listener (Prometheus scrape), when enabled
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::{Metrics, Upkeep, UPKEEP_INTERVAL};
