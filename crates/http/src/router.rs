//! Router assembly: module mounting plus the shared middleware stack.

use std::time::Duration;

use axum::{extract::Request, http::HeaderValue, routing::MethodRouter, Router};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

use crate::error::AppError;

/// Prefix every module router is nested under.
pub fn module_prefix(module_name: &str) -> String {
    format!("/api/{module_name}")
}

/// Incrementally assembled application router.
#[derive(Default)]
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, route: MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Nest a module's routes under [`module_prefix`].
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        self.router = self.router.nest(&module_prefix(module_name), module_router);
        self
    }

    /// Unknown paths get the standard error body.
    pub fn with_not_found(mut self) -> Self {
        self.router = self
            .router
            .fallback(|| async { AppError::not_found("no route for this path") });
        self
    }

    /// Request spans and one log line per request and response.
    pub fn with_tracing(mut self) -> Self {
        let trace = TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::INFO));
        self.router = self.router.layer(trace);
        self
    }

    /// Tag every request with an `x-request-id`, keeping one sent by the caller.
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Upper bound on handling one request, paced chat delivery included.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)));
        self
    }

    pub fn build(self) -> Router {
        self.router
    }
}

/// Time-ordered request ids, so log lines sort by arrival.
#[derive(Debug, Clone, Copy)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::now_v7().to_string())
            .ok()
            .map(RequestId::new)
    }
}
