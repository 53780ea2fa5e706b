//! OAuth hooks.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::{self, BoxFuture, FutureExt};

/// Login redirect and callback handling, served inline by the front door at
/// `{subpath}/oauth/login` and `{subpath}/oauth/callback`.
pub trait OAuthHook: Send + Sync + 'static {
    fn login(&self, request: Request<Body>) -> BoxFuture<'static, Response>;

    fn callback(&self, request: Request<Body>) -> BoxFuture<'static, Response>;
}

/// No OAuth providers configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OAuthDisabled;

impl OAuthDisabled {
    fn not_configured() -> BoxFuture<'static, Response> {
        future::ready((StatusCode::NOT_FOUND, "OAuth is not configured").into_response()).boxed()
    }
}

impl OAuthHook for OAuthDisabled {
    fn login(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
        Self::not_configured()
    }

    fn callback(&self, _request: Request<Body>) -> BoxFuture<'static, Response> {
        Self::not_configured()
    }
}
