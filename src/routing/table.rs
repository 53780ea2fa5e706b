//! Front door route table.
//!
//! # Responsibilities
//! - Classify a request path into one route target
//! - Compute the path forwarded to proxied targets
//!
//! # Design Decisions
//! - Built once per listener set, immutable afterward (shared without locks)
//! - Fixed precedence, first match wins: api, websocket, oauth, metrics, ui
//! - Exactly one catch-all (the Web UI), always evaluated last
//! - The metrics route exists only when metrics are enabled, so a disabled
//!   metrics path falls through to the catch-all instead of erroring
//! - Directory roots without their trailing slash (`{subpath}`,
//!   `{subpath}/api`) redirect to the slashed form

use std::borrow::Cow;
use std::fmt;

/// Where a front door request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Proxied to the REST/API listener with `{subpath}/api` stripped.
    RestApi,
    /// Handled inline by the websocket hook.
    Websocket,
    /// Handled inline by the OAuth hook.
    OAuthLogin,
    OAuthCallback,
    /// Proxied to the metrics listener.
    Metrics,
    /// Proxied to the Web UI listener, path unchanged.
    WebUi,
}

impl RouteTarget {
    /// Short classification used to tag requests in logs and metrics.
    pub fn class(self) -> &'static str {
        match self {
            RouteTarget::RestApi => "api",
            RouteTarget::Websocket => "ws",
            RouteTarget::OAuthLogin | RouteTarget::OAuthCallback => "oauth",
            RouteTarget::Metrics => "metrics",
            RouteTarget::WebUi => "ui",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Prefix(String),
}

impl Pattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Exact(exact) => path == exact,
            Pattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(exact) => f.write_str(exact),
            Pattern::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// One entry of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pattern: Pattern,
    target: RouteTarget,
    /// Leading part of the path removed before forwarding.
    strip: Option<String>,
}

impl Route {
    pub fn target(&self) -> RouteTarget {
        self.target
    }

    /// Human-readable pattern, e.g. `/sub/api/*`.
    pub fn pattern(&self) -> String {
        self.pattern.to_string()
    }
}

/// Outcome of looking a path up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A route matched. `forward_path` is what a proxied target receives.
    Matched {
        target: RouteTarget,
        forward_path: Cow<'a, str>,
    },
    /// A directory root was requested without its trailing slash; send the
    /// client to `location`.
    Redirect { location: String },
    /// Outside the subpath.
    NotFound,
}

/// Ordered prefix → target table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    subpath: String,
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build the table for `subpath` ("" or "/prefix").
    pub fn new(subpath: &str, metrics_enabled: bool) -> Self {
        let subpath = subpath.trim_end_matches('/').to_string();
        let at = |suffix: &str| format!("{}{}", subpath, suffix);

        let mut routes = vec![
            Route {
                pattern: Pattern::Prefix(at("/api/")),
                target: RouteTarget::RestApi,
                strip: Some(at("/api")),
            },
            Route {
                pattern: Pattern::Exact(at("/websocket")),
                target: RouteTarget::Websocket,
                strip: None,
            },
            Route {
                pattern: Pattern::Exact(at("/oauth/login")),
                target: RouteTarget::OAuthLogin,
                strip: None,
            },
            Route {
                pattern: Pattern::Exact(at("/oauth/callback")),
                target: RouteTarget::OAuthCallback,
                strip: None,
            },
        ];
        if metrics_enabled {
            routes.push(Route {
                pattern: Pattern::Exact(at("/metrics")),
                target: RouteTarget::Metrics,
                strip: None,
            });
        }
        routes.push(Route {
            pattern: Pattern::Prefix(at("/")),
            target: RouteTarget::WebUi,
            strip: None,
        });

        Self { subpath, routes }
    }

    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    /// Routes in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve<'a>(&self, path: &'a str) -> Resolution<'a> {
        if path.strip_prefix(self.subpath.as_str()) == Some("/api") {
            return Resolution::Redirect {
                location: format!("{}/api/", self.subpath),
            };
        }

        if let Some(route) = self.routes.iter().find(|r| r.pattern.matches(path)) {
            let forward_path = match &route.strip {
                Some(strip) => Cow::Borrowed(&path[strip.len()..]),
                None => Cow::Borrowed(path),
            };
            return Resolution::Matched {
                target: route.target,
                forward_path,
            };
        }

        if !self.subpath.is_empty() && path == self.subpath {
            return Resolution::Redirect {
                location: format!("{}/", self.subpath),
            };
        }

        Resolution::NotFound
    }
}
