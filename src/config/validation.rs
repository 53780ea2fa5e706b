//! Configuration validation.
//!
//! Serde handles syntax; this module checks the things serde cannot: that
//! addresses carry a usable port, that the subpath is a clean prefix, and
//! that enabled listeners don't collide on the same address.
//! All errors are collected, not just the first.
//!
//! Whether the RPC listener runs depends on the hooks handed to the
//! orchestrator, not on the file, so its address is always checked: a
//! config that validates stays valid whichever hooks it is paired with.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::schema::DashboardConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener `{listener}` has invalid address `{address}`")]
    InvalidAddress { listener: &'static str, address: String },

    #[error("subpath `{0}` must start with `/` and must not end with `/`")]
    InvalidSubpath(String),

    #[error("listeners `{first}` and `{second}` share address `{address}`")]
    AddressConflict {
        first: &'static str,
        second: &'static str,
        address: String,
    },
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &DashboardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.subpath.is_empty()
        && (!config.subpath.starts_with('/') || config.subpath.ends_with('/'))
    {
        errors.push(ValidationError::InvalidSubpath(config.subpath.clone()));
    }

    let addresses = &config.listeners;
    let mut enabled = vec![
        ("web_ui", &addresses.web_ui),
        ("rest_api", &addresses.rest_api),
        ("rpc", &addresses.rpc),
    ];
    if config.front_door.enabled {
        enabled.push(("front_door", &addresses.front_door));
    }
    if config.metrics.enabled {
        enabled.push(("metrics", &addresses.metrics));
    }

    let mut seen: HashMap<&str, &'static str> = HashMap::new();
    for (listener, address) in enabled {
        if !has_port(address) {
            errors.push(ValidationError::InvalidAddress {
                listener,
                address: address.clone(),
            });
            continue;
        }
        // Port 0 asks the OS for a fresh port, so it never collides.
        if address.ends_with(":0") {
            continue;
        }
        if let Some(first) = seen.insert(address.as_str(), listener) {
            errors.push(ValidationError::AddressConflict {
                first,
                second: listener,
                address: address.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
