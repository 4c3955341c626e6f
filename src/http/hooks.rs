//! Request lifecycle hooks.
//!
//! # Pipeline Order
//! ```text
//! on_request(raw) → parse → on_request_parsed(ctx) → route + execute
//!     → on_response(resp, ctx)            on success
//!     → on_error(failure, ctx?)           on failure
//! → normalize → emit headers → before_send(status, headers, body) → transmit
//! ```
//!
//! # Design Decisions
//! - Every hook is optional; an unset hook is a no-op
//! - Hooks before normalization share the handler's error boundary
//! - A failing `on_error` or `before_send` hook is a fatal failure

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};

use crate::context::RequestContext;
use crate::error::BoxError;
use crate::http::response::{ResponseBody, RouteResponse};
use crate::http::root::RequestFailure;

pub type HookResult = Result<(), BoxError>;

type OnRequest = Arc<dyn Fn(&Request<Body>) -> HookResult + Send + Sync>;
type OnRequestParsed = Arc<dyn Fn(&RequestContext) -> HookResult + Send + Sync>;
type OnResponse = Arc<dyn Fn(&RouteResponse, &RequestContext) -> HookResult + Send + Sync>;
type OnError = Arc<dyn Fn(&RequestFailure, Option<&RequestContext>) -> HookResult + Send + Sync>;
type BeforeSend =
    Arc<dyn Fn(StatusCode, &HeaderMap, Option<&ResponseBody>) -> HookResult + Send + Sync>;

/// Optional callbacks fired around the request pipeline.
#[derive(Clone, Default)]
pub struct Hooks {
    on_request: Option<OnRequest>,
    on_request_parsed: Option<OnRequestParsed>,
    on_response: Option<OnResponse>,
    on_error: Option<OnError>,
    before_send: Option<BeforeSend>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the raw request before it is parsed.
    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request<Body>) -> HookResult + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(hook));
        self
    }

    /// Called once the context is built.
    pub fn on_request_parsed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext) -> HookResult + Send + Sync + 'static,
    {
        self.on_request_parsed = Some(Arc::new(hook));
        self
    }

    /// Called with a successful handler response.
    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RouteResponse, &RequestContext) -> HookResult + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(hook));
        self
    }

    /// Called with the failure before it is normalized. The context is
    /// absent when parsing itself failed.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestFailure, Option<&RequestContext>) -> HookResult + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Called after headers are emitted, right before transmission.
    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(StatusCode, &HeaderMap, Option<&ResponseBody>) -> HookResult + Send + Sync + 'static,
    {
        self.before_send = Some(Arc::new(hook));
        self
    }

    pub(crate) fn call_on_request(&self, request: &Request<Body>) -> HookResult {
        match &self.on_request {
            Some(hook) => hook(request),
            None => Ok(()),
        }
    }

    pub(crate) fn call_on_request_parsed(&self, ctx: &RequestContext) -> HookResult {
        match &self.on_request_parsed {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }

    pub(crate) fn call_on_response(&self, resp: &RouteResponse, ctx: &RequestContext) -> HookResult {
        match &self.on_response {
            Some(hook) => hook(resp, ctx),
            None => Ok(()),
        }
    }

    pub(crate) fn call_on_error(
        &self,
        failure: &RequestFailure,
        ctx: Option<&RequestContext>,
    ) -> HookResult {
        match &self.on_error {
            Some(hook) => hook(failure, ctx),
            None => Ok(()),
        }
    }

    pub(crate) fn call_before_send(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        body: Option<&ResponseBody>,
    ) -> HookResult {
        match &self.before_send {
            Some(hook) => hook(status, headers, body),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_request", &self.on_request.is_some())
            .field("on_request_parsed", &self.on_request_parsed.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("before_send", &self.before_send.is_some())
            .finish()
    }
}
