//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind a service's configured address
//! - Report the actually bound address (port 0 resolves here)
//! - Derive the address other listeners should dial to reach this one

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::http::ServiceKind;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {service} listener on {address}: {source}")]
    Bind {
        service: ServiceKind,
        address: String,
        #[source]
        source: io::Error,
    },
}

impl ListenerError {
    pub fn service(&self) -> ServiceKind {
        match self {
            ListenerError::Bind { service, .. } => *service,
        }
    }
}

/// A bound, not yet serving, TCP listener for one service.
#[derive(Debug)]
pub struct Listener {
    service: ServiceKind,
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind `address` (`host:port`, host names are resolved) for `service`.
    pub async fn bind(service: ServiceKind, address: &str) -> Result<Self, ListenerError> {
        let bind_error = |source: io::Error| ListenerError::Bind {
            service,
            address: address.to_string(),
            source,
        };

        let inner = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::info!(
            service = %service,
            address = %local_addr,
            "Listener bound"
        );

        Ok(Self {
            service,
            inner,
            local_addr,
        })
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address to dial this listener on from the same host.
    ///
    /// A wildcard bind (`0.0.0.0` / `::`) is reachable through loopback.
    pub fn dial_addr(&self) -> SocketAddr {
        dial_addr(self.local_addr)
    }
}

pub(crate) fn dial_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
