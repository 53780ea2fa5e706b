//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dashboard
//! listeners. All types derive Serde traits for deserialization from config
//! files, and every field has a default so a minimal (or empty) file works.

use serde::{Deserialize, Serialize};

/// Port the default listener addresses are derived from.
pub const DEFAULT_BASE_PORT: u16 = 1337;

/// Root configuration for the dashboard.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Bind addresses for every listener.
    pub listeners: ListenerAddresses,

    /// URL prefix the dashboard is served under ("" for the root).
    pub subpath: String,

    /// Unified reverse-proxy listener.
    pub front_door: FrontDoorConfig,

    /// Prometheus metrics listener.
    pub metrics: MetricsConfig,

    /// Extra diagnostic logging switches.
    pub log_debug: LogDebugOptions,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::with_base_port(DEFAULT_BASE_PORT)
    }
}

impl DashboardConfig {
    /// Default configuration with every listener address derived from `base`.
    pub fn with_base_port(base: u16) -> Self {
        Self {
            listeners: ListenerAddresses::from_base_port(base),
            subpath: String::new(),
            front_door: FrontDoorConfig::default(),
            metrics: MetricsConfig::default(),
            log_debug: LogDebugOptions::default(),
            shutdown: ShutdownConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Bind addresses, one per listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerAddresses {
    /// Single externally reachable address (e.g., "0.0.0.0:1337").
    pub front_door: String,

    /// REST/API listener.
    pub rest_api: String,

    /// Structured RPC listener.
    pub rpc: String,

    /// Web UI listener.
    pub web_ui: String,

    /// Prometheus metrics listener.
    pub metrics: String,
}

impl ListenerAddresses {
    /// Lay listeners out on consecutive ports starting at `base`.
    ///
    /// The front door is public; everything behind it binds to loopback.
    pub fn from_base_port(base: u16) -> Self {
        let port = |offset: u16| base.saturating_add(offset);
        Self {
            front_door: format!("0.0.0.0:{}", base),
            rest_api: format!("127.0.0.1:{}", port(1)),
            rpc: format!("127.0.0.1:{}", port(2)),
            web_ui: format!("127.0.0.1:{}", port(3)),
            metrics: format!("127.0.0.1:{}", port(4)),
        }
    }
}

impl Default for ListenerAddresses {
    fn default() -> Self {
        Self::from_base_port(DEFAULT_BASE_PORT)
    }
}

/// Front door (single HTTP frontend) configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FrontDoorConfig {
    /// Serve everything behind the single front door address.
    pub enabled: bool,
}

impl Default for FrontDoorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the metrics listener (and the `{subpath}/metrics` route).
    pub enabled: bool,
}

/// Diagnostic logging switches. Observability only, never alters routing.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogDebugOptions {
    /// Log every front door request with its route classification.
    pub front_door_requests: bool,

    /// Also log every request header (requires `front_door_requests`).
    pub front_door_request_headers: bool,
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time each listener gets to drain in-flight requests before its
    /// remaining connections are force-closed.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10,
        }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.grace_period_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_addresses_follow_base_port() {
        let config = DashboardConfig::default();
        assert_eq!(config.listeners.front_door, "0.0.0.0:1337");
        assert_eq!(config.listeners.rest_api, "127.0.0.1:1338");
        assert_eq!(config.listeners.rpc, "127.0.0.1:1339");
        assert_eq!(config.listeners.web_ui, "127.0.0.1:1340");
        assert_eq!(config.listeners.metrics, "127.0.0.1:1341");
        assert!(config.front_door.enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn empty_document_is_default() {
        let config: DashboardConfig = toml::from_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config: DashboardConfig = toml::from_str(
            r#"
            subpath = "/dash"

            [metrics]
            enabled = true

            [listeners]
            web_ui = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.subpath, "/dash");
        assert!(config.metrics.enabled);
        assert_eq!(config.listeners.web_ui, "127.0.0.1:9000");
        assert_eq!(config.listeners.rest_api, "127.0.0.1:1338");
        assert_eq!(config.shutdown.grace_period_secs, 10);
    }
}
