//! Multi-service orchestration.
//!
//! # Responsibilities
//! - Build the listener set from one configuration snapshot
//! - Start every enabled listener on its own task, or none at all
//! - Block callers until stop is requested
//! - Stop every started listener exactly once, draining in parallel
//! - Rebuild the whole set when the configuration changes

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::DashboardConfig;
use crate::hooks::Hooks;
use crate::http::front_door::{self, FrontDoorState, FrontDoorTargets};
use crate::http::{ServiceHandle, ServiceKind};
use crate::lifecycle::{LifecycleState, Shutdown, StateCell};
use crate::net::{Listener, ListenerError};
use crate::observability::{Metrics, Upkeep, UPKEEP_INTERVAL};

/// Error type for orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A listener could not be bound; nothing was started.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("dashboard cannot start while {0}")]
    InvalidState(LifecycleState),
}

/// The listeners of one configuration snapshot. Optional listeners are
/// `None` when their toggle is off.
struct ServiceSet {
    rpc: Option<ServiceHandle>,
    front_door: Option<ServiceHandle>,
    web_ui: ServiceHandle,
    metrics: Option<ServiceHandle>,
    rest_api: ServiceHandle,
    /// Histogram upkeep; lives exactly as long as the metrics listener.
    metrics_upkeep: Option<Upkeep>,
}

impl ServiceSet {
    fn get(&self, service: ServiceKind) -> Option<&ServiceHandle> {
        match service {
            ServiceKind::Rpc => self.rpc.as_ref(),
            ServiceKind::FrontDoor => self.front_door.as_ref(),
            ServiceKind::WebUi => Some(&self.web_ui),
            ServiceKind::Metrics => self.metrics.as_ref(),
            ServiceKind::RestApi => Some(&self.rest_api),
        }
    }

    /// Shutdown order: RPC, front door, Web UI, metrics, REST/API.
    fn into_handles(self) -> Vec<ServiceHandle> {
        [
            self.rpc,
            self.front_door,
            Some(self.web_ui),
            self.metrics,
            Some(self.rest_api),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Request shutdown of every listener back-to-back, then wait for all
    /// drains together.
    async fn shutdown(mut self) {
        drop(self.metrics_upkeep.take());
        let handles = self.into_handles();
        for handle in &handles {
            tracing::debug!(
                service = %handle.service(),
                open_connections = handle.active_connections(),
                "Requesting listener shutdown"
            );
            handle.begin_shutdown();
        }
        join_all(handles.into_iter().map(ServiceHandle::stopped)).await;
    }
}

/// Owns every dashboard listener and their shared lifecycle.
pub struct Orchestrator {
    config: ArcSwap<DashboardConfig>,
    hooks: Hooks,
    metrics: Metrics,
    services: Mutex<Option<ServiceSet>>,
    state: StateCell,
    shutdown: Shutdown,
}

impl Orchestrator {
    /// Wire the collaborators together. Nothing is bound until
    /// [`Orchestrator::start`].
    pub fn new(config: DashboardConfig, hooks: Hooks) -> Self {
        hooks.engine.rebuild_action_map();
        if let Some(listener) = &hooks.event_listener {
            hooks.engine.subscribe(listener.clone());
        }

        Self {
            config: ArcSwap::from_pointee(config),
            hooks,
            metrics: Metrics::new(),
            services: Mutex::new(None),
            state: StateCell::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<DashboardConfig> {
        self.config.load_full()
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Registry behind the metrics listener.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Bound address of a running listener.
    pub async fn local_addr(&self, service: ServiceKind) -> Option<SocketAddr> {
        let services = self.services.lock().await;
        services.as_ref()?.get(service).map(ServiceHandle::local_addr)
    }

    /// Lifecycle state of a listener; `None` if it is not part of the
    /// current set.
    pub async fn service_state(&self, service: ServiceKind) -> Option<LifecycleState> {
        let services = self.services.lock().await;
        services.as_ref()?.get(service).map(ServiceHandle::state)
    }

    /// Bind and start every enabled listener, then return.
    ///
    /// A bind failure releases whatever was already bound, marks the
    /// dashboard stopped and returns the error; no listener is left running.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        let mut services = self.services.lock().await;
        match self.state.get() {
            LifecycleState::NotStarted => {}
            other => return Err(OrchestratorError::InvalidState(other)),
        }

        self.state.set(LifecycleState::Starting);
        let config = self.config.load_full();
        match self.build(&config).await {
            Ok(set) => {
                *services = Some(set);
                self.state.set(LifecycleState::Running);
                tracing::info!(
                    subpath = %config.subpath,
                    front_door = config.front_door.enabled,
                    metrics = config.metrics.enabled,
                    "Dashboard started"
                );
                Ok(())
            }
            Err(e) => {
                self.state.set(LifecycleState::Stopped);
                self.shutdown.trigger();
                Err(e.into())
            }
        }
    }

    /// Block until [`Orchestrator::stop`] completes.
    pub async fn wait(&self) {
        self.shutdown.wait().await;
    }

    /// Start, then block until stopped.
    pub async fn run(&self) -> Result<(), OrchestratorError> {
        self.start().await?;
        self.wait().await;
        Ok(())
    }

    /// Gracefully stop every started listener.
    ///
    /// Calling this again, or before anything was started, is a no-op.
    pub async fn stop(&self) {
        let mut services = self.services.lock().await;
        if self.state.get() == LifecycleState::Stopped {
            return;
        }

        self.state.set(LifecycleState::Stopping);
        if let Some(set) = services.take() {
            set.shutdown().await;
            self.hooks.websocket.close_sessions();
        }
        self.state.set(LifecycleState::Stopped);
        self.shutdown.trigger();
        tracing::info!("Dashboard stopped");
    }

    /// Replace the configuration and rebuild the listener set from it.
    ///
    /// Before start the new snapshot is simply stored; after stop it is
    /// ignored. A snapshot equal to the current one changes nothing. A bind
    /// failure while rebuilding leaves the dashboard stopped.
    pub async fn reload(&self, config: DashboardConfig) -> Result<(), OrchestratorError> {
        let mut services = self.services.lock().await;
        match self.state.get() {
            LifecycleState::NotStarted => {
                self.config.store(Arc::new(config));
                return Ok(());
            }
            LifecycleState::Running if *self.config.load_full() == config => {
                tracing::debug!("Configuration unchanged, keeping listeners");
                return Ok(());
            }
            LifecycleState::Running => {}
            other => {
                tracing::debug!(state = %other, "Ignoring reload");
                return Ok(());
            }
        }

        tracing::info!("Rebuilding listeners for new configuration");
        self.state.set(LifecycleState::Starting);
        if let Some(set) = services.take() {
            set.shutdown().await;
            self.hooks.websocket.close_sessions();
        }

        let config = Arc::new(config);
        self.config.store(config.clone());
        self.hooks.engine.rebuild_action_map();

        match self.build(&config).await {
            Ok(set) => {
                *services = Some(set);
                self.state.set(LifecycleState::Running);
                tracing::info!("Listeners rebuilt");
                Ok(())
            }
            Err(e) => {
                self.state.set(LifecycleState::Stopped);
                self.shutdown.trigger();
                Err(e.into())
            }
        }
    }

    /// Bind every enabled listener, then spawn them all.
    async fn build(&self, config: &DashboardConfig) -> Result<ServiceSet, ListenerError> {
        let addresses = &config.listeners;

        // Bind everything first; an early return drops (releases) what was
        // already bound.
        let rpc = match &self.hooks.rpc {
            Some(router) => Some((
                Listener::bind(ServiceKind::Rpc, &addresses.rpc).await?,
                router.clone(),
            )),
            None => None,
        };
        let web_ui = Listener::bind(ServiceKind::WebUi, &addresses.web_ui).await?;
        let rest_api = Listener::bind(ServiceKind::RestApi, &addresses.rest_api).await?;
        let metrics = if config.metrics.enabled {
            Some(Listener::bind(ServiceKind::Metrics, &addresses.metrics).await?)
        } else {
            None
        };
        let front_door = if config.front_door.enabled {
            Some(Listener::bind(ServiceKind::FrontDoor, &addresses.front_door).await?)
        } else {
            None
        };

        let grace_period = config.shutdown.grace_period();

        let front_door = front_door.map(|listener| {
            let targets = FrontDoorTargets {
                web_ui: web_ui.dial_addr(),
                rest_api: rest_api.dial_addr(),
                metrics: metrics.as_ref().map(Listener::dial_addr),
            };
            let recorder = config.metrics.enabled.then(|| self.metrics.clone());
            let state = FrontDoorState::new(config, targets, &self.hooks, recorder);
            ServiceHandle::spawn(listener, front_door::router(state), grace_period)
        });

        Ok(ServiceSet {
            rpc: rpc.map(|(listener, router)| ServiceHandle::spawn(listener, router, grace_period)),
            front_door,
            web_ui: ServiceHandle::spawn(web_ui, self.hooks.web_ui.clone(), grace_period),
            metrics: metrics
                .map(|listener| ServiceHandle::spawn(listener, self.metrics.router(), grace_period)),
            rest_api: ServiceHandle::spawn(rest_api, self.hooks.rest_api.clone(), grace_period),
            metrics_upkeep: config
                .metrics
                .enabled
                .then(|| self.metrics.spawn_upkeep(UPKEEP_INTERVAL)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};

    fn test_config() -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.listeners.front_door = "127.0.0.1:0".into();
        config.listeners.web_ui = "127.0.0.1:0".into();
        config.listeners.rest_api = "127.0.0.1:0".into();
        config.listeners.rpc = "127.0.0.1:0".into();
        config.listeners.metrics = "127.0.0.1:0".into();
        config.shutdown.grace_period_secs = 1;
        config
    }

    fn test_hooks() -> Hooks {
        Hooks::new(
            Router::new().route("/", get(|| async { "ui" })),
            Router::new().route("/Ping", get(|| async { "pong" })),
        )
    }

    #[tokio::test]
    async fn optional_listeners_are_absent_when_disabled() {
        let mut config = test_config();
        config.front_door.enabled = false;
        config.metrics.enabled = false;

        let orchestrator = Orchestrator::new(config, test_hooks());
        orchestrator.start().await.unwrap();

        assert!(orchestrator.local_addr(ServiceKind::WebUi).await.is_some());
        assert!(orchestrator.local_addr(ServiceKind::RestApi).await.is_some());
        assert!(orchestrator.local_addr(ServiceKind::FrontDoor).await.is_none());
        assert!(orchestrator.local_addr(ServiceKind::Metrics).await.is_none());
        assert!(orchestrator.local_addr(ServiceKind::Rpc).await.is_none());

        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn rpc_listener_follows_hook() {
        let hooks = test_hooks().with_rpc(Router::new().route("/", get(|| async { "rpc" })));
        let orchestrator = Orchestrator::new(test_config(), hooks);
        orchestrator.start().await.unwrap();

        assert!(orchestrator.local_addr(ServiceKind::Rpc).await.is_some());
        orchestrator.stop().await;
        assert!(orchestrator.local_addr(ServiceKind::Rpc).await.is_none());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let orchestrator = Orchestrator::new(test_config(), test_hooks());
        orchestrator.start().await.unwrap();
        assert_eq!(orchestrator.state(), LifecycleState::Running);

        orchestrator.stop().await;
        orchestrator.stop().await;
        assert_eq!(orchestrator.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let orchestrator = Orchestrator::new(test_config(), test_hooks());
        orchestrator.stop().await;
        assert_eq!(orchestrator.state(), LifecycleState::Stopped);

        // And the dashboard cannot be started afterwards.
        let err = orchestrator.start().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidState(LifecycleState::Stopped)));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let orchestrator = Orchestrator::new(test_config(), test_hooks());
        orchestrator.start().await.unwrap();
        let err = orchestrator.start().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidState(LifecycleState::Running)));
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn reload_before_start_only_stores_config() {
        let orchestrator = Orchestrator::new(test_config(), test_hooks());
        let mut next = test_config();
        next.subpath = "/next".into();

        orchestrator.reload(next).await.unwrap();
        assert_eq!(orchestrator.config().subpath, "/next");
        assert_eq!(orchestrator.state(), LifecycleState::NotStarted);
    }

    #[tokio::test]
    async fn upkeep_follows_metrics_listener() {
        let mut config = test_config();
        config.metrics.enabled = true;
        let orchestrator = Orchestrator::new(config, test_hooks());
        orchestrator.start().await.unwrap();

        {
            let services = orchestrator.services.lock().await;
            let set = services.as_ref().unwrap();
            assert!(set.metrics.is_some());
            assert!(set.metrics_upkeep.as_ref().is_some_and(Upkeep::is_running));
        }

        orchestrator.stop().await;
        assert!(orchestrator.services.lock().await.is_none());
    }

    #[tokio::test]
    async fn no_upkeep_without_metrics_listener() {
        let orchestrator = Orchestrator::new(test_config(), test_hooks());
        orchestrator.start().await.unwrap();
        assert!(orchestrator
            .services
            .lock()
            .await
            .as_ref()
            .is_some_and(|set| set.metrics_upkeep.is_none()));
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn unchanged_reload_keeps_listeners() {
        let orchestrator = Orchestrator::new(test_config(), test_hooks());
        orchestrator.start().await.unwrap();
        let before = orchestrator.local_addr(ServiceKind::WebUi).await;

        // Port 0 would land elsewhere on a rebuild.
        orchestrator.reload(test_config()).await.unwrap();
        assert_eq!(orchestrator.local_addr(ServiceKind::WebUi).await, before);
        assert_eq!(orchestrator.state(), LifecycleState::Running);

        let mut changed = test_config();
        changed.subpath = "/changed".into();
        orchestrator.reload(changed).await.unwrap();
        assert_eq!(orchestrator.config().subpath, "/changed");

        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn subscribes_event_listener_at_creation() {
        let engine = Arc::new(crate::hooks::IdleEngine::default());
        let hooks = test_hooks().with_engine(engine.clone());
        let _orchestrator = Orchestrator::new(test_config(), hooks);
        assert_eq!(engine.listener_count(), 1);
    }
}
