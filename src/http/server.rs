//! Per-listener HTTP serving.
//!
//! # Responsibilities
//! - Run one listener's accept loop on its own task
//! - Serve HTTP/1.1 and HTTP/2 (with upgrades) through an Axum router
//! - Drain in-flight connections on shutdown, bounded by a grace period
//! - Force-close whatever is still open once the grace period elapses

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::{conn::auto, graceful::GracefulShutdown},
    service::TowerToHyperService,
};
use tokio::task::{JoinHandle, JoinSet};

use crate::lifecycle::{LifecycleState, Shutdown, ShutdownSignal, StateCell};
use crate::net::{ConnectionTracker, Listener};

/// Pause after a failed accept (e.g. out of file descriptors) before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// The independently addressable listeners a dashboard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    FrontDoor,
    WebUi,
    RestApi,
    Metrics,
    Rpc,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceKind::FrontDoor => "front_door",
            ServiceKind::WebUi => "web_ui",
            ServiceKind::RestApi => "rest_api",
            ServiceKind::Metrics => "metrics",
            ServiceKind::Rpc => "rpc",
        };
        f.write_str(name)
    }
}

/// One running listener.
///
/// Dropping a handle requests shutdown but does not wait for the drain;
/// use [`ServiceHandle::stopped`] for that.
pub struct ServiceHandle {
    service: ServiceKind,
    local_addr: SocketAddr,
    state: Arc<StateCell>,
    shutdown: Shutdown,
    connections: ConnectionTracker,
    task: Option<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Spawn the accept loop for `listener`, serving `router`.
    pub fn spawn(listener: Listener, router: Router, grace_period: Duration) -> Self {
        let service = listener.service();
        let local_addr = listener.local_addr();
        let state = Arc::new(StateCell::new());
        let shutdown = Shutdown::new();
        let connections = ConnectionTracker::new();

        state.set(LifecycleState::Starting);
        let task = tokio::spawn(serve(
            listener,
            router,
            shutdown.subscribe(),
            grace_period,
            state.clone(),
            connections.clone(),
        ));

        Self {
            service,
            local_addr,
            state,
            shutdown,
            connections,
            task: Some(task),
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Open connections, idle keep-alives included.
    pub fn active_connections(&self) -> u64 {
        self.connections.active_count()
    }

    /// Ask the listener to stop accepting and start draining. Returns
    /// immediately.
    pub fn begin_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait for the listener task to finish draining.
    pub async fn stopped(mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(e) = task.await {
            tracing::error!(service = %self.service, error = %e, "Listener task failed");
        }
        self.state.set(LifecycleState::Stopped);
    }

    /// Request shutdown and wait for the drain.
    pub async fn stop(self) {
        self.begin_shutdown();
        self.stopped().await;
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("service", &self.service)
            .field("local_addr", &self.local_addr)
            .field("state", &self.state.get())
            .finish()
    }
}

async fn serve(
    listener: Listener,
    router: Router,
    mut shutdown: ShutdownSignal,
    grace_period: Duration,
    state: Arc<StateCell>,
    tracker: ConnectionTracker,
) {
    let service = listener.service();
    let builder = auto::Builder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    state.set(LifecycleState::Running);
    tracing::info!(
        service = %service,
        address = %listener.local_addr(),
        "HTTP listener serving"
    );

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(service = %service, error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let guard = tracker.track();
                tracing::trace!(
                    service = %service,
                    connection_id = %guard.id(),
                    peer_addr = %peer_addr,
                    "Connection accepted"
                );

                let hyper_service = TowerToHyperService::new(router.clone());
                let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), hyper_service);
                let conn = graceful.watch(conn.into_owned());
                connections.spawn(async move {
                    if let Err(e) = conn.await {
                        tracing::debug!(
                            connection_id = %guard.id(),
                            error = %e,
                            "Connection ended with error"
                        );
                    }
                });

                // Reap finished connection tasks so the set stays small.
                while connections.try_join_next().is_some() {}
            }
            _ = shutdown.recv() => break,
        }
    }

    state.set(LifecycleState::Stopping);
    let local_addr = listener.local_addr();
    drop(listener);

    tracing::info!(
        service = %service,
        address = %local_addr,
        open_connections = tracker.active_count(),
        "HTTP listener draining"
    );

    if tokio::time::timeout(grace_period, graceful.shutdown()).await.is_err() {
        tracing::warn!(
            service = %service,
            grace_period = ?grace_period,
            force_closed = tracker.active_count(),
            "Grace period elapsed, force-closing connections"
        );
        connections.abort_all();
    }
    while connections.join_next().await.is_some() {}

    state.set(LifecycleState::Stopped);
    tracing::info!(service = %service, "HTTP listener stopped");
}
