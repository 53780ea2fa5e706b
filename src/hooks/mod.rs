//! Collaborator interfaces.
//!
//! The dashboard core does not render the web UI, answer API calls, run
//! actions or validate OAuth credentials. Those live behind the narrow
//! interfaces in this module and are handed to the orchestrator in a
//! [`Hooks`] bundle.

mod engine;
mod oauth;

use std::sync::Arc;

use axum::{extract::ws::WebSocketUpgrade, response::Response, Router};

use crate::events::EventHub;

pub use engine::{ExecutionEngine, ExecutionEvent, ExecutionListener, IdleEngine};
pub use oauth::{OAuthDisabled, OAuthHook};

/// Owns websocket upgrades and message distribution.
pub trait WebsocketHook: Send + Sync + 'static {
    /// Complete an upgrade request that reached `{subpath}/websocket`.
    fn upgrade(&self, ws: WebSocketUpgrade) -> Response;

    /// Close every open session. Called when the front door goes away.
    fn close_sessions(&self) {}
}

/// Everything the orchestrator consumes from its collaborators.
#[derive(Clone)]
pub struct Hooks {
    /// Web UI listener router. Must be subpath-aware.
    pub web_ui: Router,
    /// REST/API listener router. Sees paths with `{subpath}/api` stripped.
    pub rest_api: Router,
    /// Structured RPC listener router; no RPC listener when absent.
    pub rpc: Option<Router>,
    pub engine: Arc<dyn ExecutionEngine>,
    pub websocket: Arc<dyn WebsocketHook>,
    /// Subscribed to the engine's action lifecycle events at startup.
    pub event_listener: Option<Arc<dyn ExecutionListener>>,
    pub oauth: Arc<dyn OAuthHook>,
}

impl Hooks {
    /// Hooks with an idle engine, a fresh [`EventHub`] and OAuth disabled.
    pub fn new(web_ui: Router, rest_api: Router) -> Self {
        let hub = Arc::new(EventHub::default());
        Self {
            web_ui,
            rest_api,
            rpc: None,
            engine: Arc::new(IdleEngine::default()),
            websocket: hub.clone(),
            event_listener: Some(hub),
            oauth: Arc::new(OAuthDisabled),
        }
    }

    pub fn with_rpc(mut self, rpc: Router) -> Self {
        self.rpc = Some(rpc);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Use `hub` both for websocket sessions and as the engine's event sink.
    pub fn with_event_hub(mut self, hub: Arc<EventHub>) -> Self {
        self.websocket = hub.clone();
        self.event_listener = Some(hub);
        self
    }

    pub fn with_websocket(
        mut self,
        websocket: Arc<dyn WebsocketHook>,
        event_listener: Option<Arc<dyn ExecutionListener>>,
    ) -> Self {
        self.websocket = websocket;
        self.event_listener = event_listener;
        self
    }

    pub fn with_oauth(mut self, oauth: Arc<dyn OAuthHook>) -> Self {
        self.oauth = oauth;
        self
    }
}
