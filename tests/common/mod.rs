//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::Uri,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use dashboard_gateway::hooks::{ExecutionEvent, IdleEngine};
use dashboard_gateway::{DashboardConfig, Hooks, Orchestrator, ServiceKind};

pub const UI_TITLE: &str = "<title>Dashboard</title>";

/// Every listener on an ephemeral loopback port.
pub fn test_config(subpath: &str) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.subpath = subpath.to_string();
    config.listeners.front_door = "127.0.0.1:0".into();
    config.listeners.web_ui = "127.0.0.1:0".into();
    config.listeners.rest_api = "127.0.0.1:0".into();
    config.listeners.rpc = "127.0.0.1:0".into();
    config.listeners.metrics = "127.0.0.1:0".into();
    config.shutdown.grace_period_secs = 5;
    config
}

/// Web UI stand-in: a titled page that echoes the path it was asked for.
pub fn web_ui_router() -> Router {
    Router::new().fallback(|uri: Uri| async move {
        axum::response::Html(format!(
            "<html><head>{}</head><body>ui path={}</body></html>",
            UI_TITLE,
            uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
        ))
    })
}

/// REST/API stand-in backed by `engine`.
pub fn api_router(engine: Arc<IdleEngine>) -> Router {
    Router::new()
        .route(
            "/StartAction",
            post(move |Json(body): Json<Value>| {
                let engine = engine.clone();
                async move {
                    let action_id = body["actionId"].as_str().unwrap_or_default().to_string();
                    let tracking_id = body["uniqueTrackingId"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    engine.publish(&ExecutionEvent::Started {
                        action_id,
                        tracking_id: tracking_id.clone(),
                    });
                    Json(json!({ "executionTrackingId": tracking_id }))
                }
            }),
        )
        .route(
            "/Slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "done"
            }),
        )
        .route(
            "/Hang",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "never"
            }),
        )
        .fallback(|uri: Uri| async move {
            format!(
                "api path={}",
                uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
            )
        })
}

pub struct Dashboard {
    pub orchestrator: Arc<Orchestrator>,
    pub engine: Arc<IdleEngine>,
}

impl Dashboard {
    pub async fn addr(&self, service: ServiceKind) -> String {
        let addr = self
            .orchestrator
            .local_addr(service)
            .await
            .unwrap_or_else(|| panic!("{} is not running", service));
        format!("http://{}", addr)
    }
}

pub fn test_hooks(engine: Arc<IdleEngine>) -> Hooks {
    Hooks::new(web_ui_router(), api_router(engine.clone())).with_engine(engine)
}

/// Build and start a dashboard with the stand-in collaborators.
pub async fn start_dashboard(config: DashboardConfig) -> Dashboard {
    let engine = Arc::new(IdleEngine::default());
    let orchestrator = Arc::new(Orchestrator::new(config, test_hooks(engine.clone())));
    orchestrator.start().await.expect("dashboard failed to start");
    Dashboard {
        orchestrator,
        engine,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
