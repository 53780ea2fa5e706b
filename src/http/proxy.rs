//! Single-target forwarding.
//!
//! # Responsibilities
//! - Point a request at one backend listener, optionally with a new path
//! - Stream the backend's response back untouched
//! - Map an unreachable backend to 502 Bad Gateway
//!
//! # Design Decisions
//! - Method, headers and body pass through as-is
//! - The query string always survives a path rewrite
//! - No retries and no health feedback: a failed hop is the caller's 502

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::ServiceKind;

/// Pooled HTTP client shared by every upstream of a front door.
pub type ProxyClient = Client<HttpConnector, Body>;

pub fn proxy_client() -> ProxyClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// A backend listener reachable from the front door.
#[derive(Debug, Clone)]
pub struct Upstream {
    service: ServiceKind,
    addr: SocketAddr,
    client: ProxyClient,
}

impl Upstream {
    pub fn new(service: ServiceKind, addr: SocketAddr, client: ProxyClient) -> Self {
        Self {
            service,
            addr,
            client,
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Forward `request`, replacing its path with `path` when given.
    pub async fn forward(&self, mut request: Request<Body>, path: Option<&str>) -> Response {
        let path_and_query = rewrite_path(request.uri(), path);
        let uri = match format!("http://{}{}", self.addr, path_and_query).parse::<Uri>() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(upstream = %self.service, error = %e, "Unforwardable request path");
                return (StatusCode::BAD_REQUEST, "Invalid request path").into_response();
            }
        };

        *request.uri_mut() = uri;
        // Backends are plain HTTP/1.1 listeners on the same host.
        *request.version_mut() = Version::HTTP_11;

        match self.client.request(request).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::warn!(
                    upstream = %self.service,
                    address = %self.addr,
                    error = %e,
                    "Upstream request failed"
                );
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

fn rewrite_path(uri: &Uri, path: Option<&str>) -> String {
    match (path, uri.query()) {
        (Some(path), Some(query)) => format!("{}?{}", path, query),
        (Some(path), None) => path.to_string(),
        (None, _) => uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_keeps_query() {
        let uri: Uri = "/sub/api/Foo?a=1&b=2".parse().unwrap();
        assert_eq!(rewrite_path(&uri, Some("/Foo")), "/Foo?a=1&b=2");
        assert_eq!(rewrite_path(&uri, None), "/sub/api/Foo?a=1&b=2");
    }

    #[test]
    fn rewrite_without_query() {
        let uri: Uri = "/sub/api/Foo".parse().unwrap();
        assert_eq!(rewrite_path(&uri, Some("/Foo")), "/Foo");
    }

    #[tokio::test]
    async fn unreachable_backend_is_bad_gateway() {
        // Bind then drop to get a port nothing listens on.
        let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let upstream = Upstream::new(ServiceKind::RestApi, addr, proxy_client());

        let request = Request::builder().uri("/Foo").body(Body::empty()).unwrap();
        let response = upstream.forward(request, None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
