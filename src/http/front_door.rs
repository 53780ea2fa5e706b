//! Front door: one externally reachable listener in front of the others.
//!
//! Proxying the REST/API, Web UI and metrics listeners through a single
//! address keeps external reverse proxies simple and removes cross-origin
//! requests from the browser's point of view.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → RouteTable::resolve (fixed precedence)
//!     → api/metrics/ui: Upstream::forward (transparent hop)
//!     → ws/oauth: inline collaborator hook
//!     → response streamed back
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    extract::ws::WebSocketUpgrade,
    http::{Request, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{DashboardConfig, LogDebugOptions};
use crate::hooks::{Hooks, OAuthHook, WebsocketHook};
use crate::http::proxy::{proxy_client, Upstream};
use crate::http::ServiceKind;
use crate::observability::Metrics;
use crate::routing::{Resolution, RouteTable, RouteTarget};

/// Dial addresses of the listeners behind the front door.
#[derive(Debug, Clone, Copy)]
pub struct FrontDoorTargets {
    pub web_ui: SocketAddr,
    pub rest_api: SocketAddr,
    /// Present only when the metrics listener exists.
    pub metrics: Option<SocketAddr>,
}

/// Application state injected into the front door handler.
#[derive(Clone)]
pub struct FrontDoorState {
    inner: Arc<FrontDoor>,
}

struct FrontDoor {
    routes: RouteTable,
    rest_api: Upstream,
    web_ui: Upstream,
    metrics_upstream: Option<Upstream>,
    websocket: Arc<dyn WebsocketHook>,
    oauth: Arc<dyn OAuthHook>,
    log_debug: LogDebugOptions,
    metrics: Option<Metrics>,
}

impl FrontDoorState {
    /// `metrics` is the registry request counts go to, if any.
    pub fn new(
        config: &DashboardConfig,
        targets: FrontDoorTargets,
        hooks: &Hooks,
        metrics: Option<Metrics>,
    ) -> Self {
        let client = proxy_client();
        let routes = RouteTable::new(&config.subpath, targets.metrics.is_some());

        tracing::debug!(
            subpath = %routes.subpath(),
            routes = ?routes.routes().iter().map(|r| r.pattern()).collect::<Vec<_>>(),
            "Front door routes built"
        );

        Self {
            inner: Arc::new(FrontDoor {
                routes,
                rest_api: Upstream::new(ServiceKind::RestApi, targets.rest_api, client.clone()),
                web_ui: Upstream::new(ServiceKind::WebUi, targets.web_ui, client.clone()),
                metrics_upstream: targets
                    .metrics
                    .map(|addr| Upstream::new(ServiceKind::Metrics, addr, client)),
                websocket: hooks.websocket.clone(),
                oauth: hooks.oauth.clone(),
                log_debug: config.log_debug.clone(),
                metrics,
            }),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }
}

/// Build the front door's Axum router.
pub fn router(state: FrontDoorState) -> Router {
    Router::new()
        .fallback(front_door_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn front_door_handler(
    State(state): State<FrontDoorState>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let front_door = &state.inner;
    let path = request.uri().path().to_string();

    let (target, forward_path) = match front_door.routes.resolve(&path) {
        Resolution::Matched {
            target,
            forward_path,
        } => (target, forward_path.into_owned()),
        Resolution::Redirect { location } => {
            return Redirect::permanent(&location).into_response();
        }
        Resolution::NotFound => {
            tracing::debug!(path = %path, "No front door route matched");
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        }
    };

    log_debug_request(&front_door.log_debug, target.class(), &request);

    let response = match target {
        RouteTarget::RestApi => {
            front_door
                .rest_api
                .forward(request, Some(&forward_path))
                .await
        }
        RouteTarget::Websocket => upgrade_websocket(front_door.websocket.as_ref(), request).await,
        RouteTarget::OAuthLogin => front_door.oauth.login(request).await,
        RouteTarget::OAuthCallback => front_door.oauth.callback(request).await,
        RouteTarget::Metrics => match &front_door.metrics_upstream {
            Some(upstream) => upstream.forward(request, Some("/metrics")).await,
            // The table only holds a metrics route when the upstream exists.
            None => front_door.web_ui.forward(request, None).await,
        },
        RouteTarget::WebUi => front_door.web_ui.forward(request, None).await,
    };

    if let Some(metrics) = &front_door.metrics {
        metrics.record_request(target.class(), response.status().as_u16(), start_time);
    }

    response
}

async fn upgrade_websocket(hook: &dyn WebsocketHook, request: Request<Body>) -> Response {
    let (mut parts, _body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => hook.upgrade(ws),
        Err(rejection) => rejection.into_response(),
    }
}

fn log_debug_request(options: &LogDebugOptions, route: &'static str, request: &Request<Body>) {
    if !options.front_door_requests {
        return;
    }

    tracing::debug!(
        route,
        method = %request.method(),
        uri = %request.uri(),
        "Front door request"
    );

    if options.front_door_request_headers {
        for (name, value) in request.headers() {
            tracing::debug!(route, header = %name, value = ?value, "Front door request header");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use futures_util::future::{self, BoxFuture, FutureExt};
    use tower::ServiceExt;

    struct StaticOAuth;

    impl OAuthHook for StaticOAuth {
        fn login(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
            future::ready(Redirect::to("https://provider.example/authorize").into_response())
                .boxed()
        }

        fn callback(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
            future::ready("signed in".into_response()).boxed()
        }
    }

    async fn dead_addr() -> SocketAddr {
        tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap()
    }

    async fn front_door(subpath: &str, hooks: &Hooks) -> Router {
        let mut config = DashboardConfig::default();
        config.subpath = subpath.into();
        let dead = dead_addr().await;
        let targets = FrontDoorTargets {
            web_ui: dead,
            rest_api: dead,
            metrics: None,
        };
        router(FrontDoorState::new(&config, targets, hooks, None))
    }

    fn hooks() -> Hooks {
        Hooks::new(Router::new(), Router::new())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn unreachable_backends_are_bad_gateway() {
        let app = front_door("/sub", &hooks()).await;

        let response = app.clone().oneshot(get("/sub/api/Foo")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = app.oneshot(get("/sub/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn bare_subpath_redirects() {
        let app = front_door("/sub", &hooks()).await;
        let response = app.oneshot(get("/sub")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/sub/");
    }

    #[tokio::test]
    async fn outside_subpath_is_not_found() {
        let app = front_door("/sub", &hooks()).await;
        let response = app.oneshot(get("/other")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oauth_is_served_inline() {
        let hooks = hooks().with_oauth(Arc::new(StaticOAuth));
        let app = front_door("/sub", &hooks).await;

        let response = app.clone().oneshot(get("/sub/oauth/login")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://provider.example/authorize"
        );

        let response = app.oneshot(get("/sub/oauth/callback?code=abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn plain_request_to_websocket_is_rejected() {
        let app = front_door("", &hooks()).await;
        let response = app.oneshot(get("/websocket")).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
