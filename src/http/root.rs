//! Root request handler: the pipeline's single error boundary.
//!
//! # Responsibilities
//! - Run hooks, parsing and dispatch in order for one request
//! - Normalize any recoverable failure into the error wire shape
//! - Report non-404 error responses and drain unread bodies
//! - Serialize the normalized response onto the transport
//!
//! # State Machine
//! ```text
//! RECEIVED → PARSING → {PARSE_FAILED → ERROR | PARSED}
//!     → ROUTING → {NO_MATCH → ERROR(404) | MATCHED}
//!     → EXECUTING → {HANDLER_ERROR → ERROR | RESPONDED}
//!     → NORMALIZE_RESPONSE → EMIT_HEADERS → BEFORE_SEND_HOOK → TRANSMIT → DONE
//! ```
//!
//! # Design Decisions
//! - Exactly one catch boundary; everything before normalization is
//!   recoverable (`RequestFailure`), everything after is fatal (`FatalFailure`)
//! - The pipeline never exits the process; the host decides what a
//!   `FatalFailure` means
//! - A body that was never handed to a context is drained on error too

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode};

use crate::context::body::BodyReader;
use crate::context::{ContextOptions, RequestContext};
use crate::error::{BoxError, RespError};
use crate::http::hooks::Hooks;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::{ResponseBody, RouteResponse};
use crate::observability::diagnostics::{render_response_error, should_report};
use crate::observability::metrics;
use crate::routing::Router;

/// Pipeline stage, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    OnRequest,
    Parsing,
    OnRequestParsed,
    Dispatching,
    OnResponse,
    OnError,
    EmittingHeaders,
    BeforeSend,
    Transmitting,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::OnRequest => "on_request",
            Stage::Parsing => "parsing",
            Stage::OnRequestParsed => "on_request_parsed",
            Stage::Dispatching => "dispatching",
            Stage::OnResponse => "on_response",
            Stage::OnError => "on_error",
            Stage::EmittingHeaders => "emitting_headers",
            Stage::BeforeSend => "before_send",
            Stage::Transmitting => "transmitting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable failure, caught at the root and turned into an error response.
#[derive(Debug, thiserror::Error)]
#[error("request failed during {stage}: {error}")]
pub struct RequestFailure {
    stage: Stage,
    #[source]
    error: BoxError,
}

impl RequestFailure {
    pub fn new(stage: Stage, error: impl Into<BoxError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The error as raised by the handler or hook.
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }

    pub fn into_error(self) -> BoxError {
        self.error
    }
}

/// A failure past the catch boundary. No response can be produced for it.
#[derive(Debug, thiserror::Error)]
#[error("unrecoverable failure during {stage}: {source}")]
pub struct FatalFailure {
    stage: Stage,
    source: BoxError,
}

impl FatalFailure {
    pub fn new(stage: Stage, source: impl Into<BoxError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// Turns one raw request into one raw response.
#[derive(Debug, Clone)]
pub struct RootHandler {
    router: Arc<Router>,
    hooks: Hooks,
    options: ContextOptions,
}

impl RootHandler {
    pub fn new(router: Router, hooks: Hooks, options: ContextOptions) -> Self {
        Self {
            router: Arc::new(router),
            hooks,
            options,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Run the full pipeline for one request.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response<Body>, FatalFailure> {
        let started = Instant::now();
        let method = request.method().clone();
        let raw_url = request.uri().to_string();
        let raw_request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut ctx = None;
        let mut unparsed = None;
        let response = match self.run(request, &mut ctx, &mut unparsed).await {
            Ok(response) => response,
            Err(failure) => {
                let ctx = ctx.as_deref();
                let request_id = ctx
                    .and_then(RequestContext::request_id)
                    .or(raw_request_id.as_deref());
                self.recover(failure, ctx, unparsed, &raw_url, request_id).await?
            }
        };

        let response = self.send(response)?;
        metrics::record_request(&method, response.status().as_u16(), started);
        Ok(response)
    }

    /// Everything inside the catch boundary.
    async fn run(
        &self,
        request: Request<Body>,
        slot: &mut Option<Arc<RequestContext>>,
        unparsed: &mut Option<Body>,
    ) -> Result<RouteResponse, RequestFailure> {
        if let Err(e) = self.hooks.call_on_request(&request) {
            *unparsed = Some(request.into_body());
            return Err(RequestFailure::new(Stage::OnRequest, e));
        }

        let ctx = match RequestContext::try_parse(request, &self.options) {
            Ok(ctx) => ctx,
            Err((e, body)) => {
                *unparsed = Some(body);
                return Err(RequestFailure::new(Stage::Parsing, e));
            }
        };
        let ctx = Arc::clone(slot.insert(Arc::new(ctx)));

        self.hooks
            .call_on_request_parsed(&ctx)
            .map_err(|e| RequestFailure::new(Stage::OnRequestParsed, e))?;

        let response = self
            .router
            .dispatch(Arc::clone(&ctx))
            .await
            .map_err(|e| RequestFailure::new(Stage::Dispatching, e))?;

        self.hooks
            .call_on_response(&response, &ctx)
            .map_err(|e| RequestFailure::new(Stage::OnResponse, e))?;

        Ok(response)
    }

    /// Normalize a recoverable failure into its error response.
    async fn recover(
        &self,
        failure: RequestFailure,
        ctx: Option<&RequestContext>,
        unparsed: Option<Body>,
        raw_url: &str,
        request_id: Option<&str>,
    ) -> Result<RouteResponse, FatalFailure> {
        self.hooks
            .call_on_error(&failure, ctx)
            .map_err(|e| FatalFailure::new(Stage::OnError, e))?;

        let stage = failure.stage();
        let error = RespError::from_boxed(failure.into_error());
        let response = error.to_response();

        if should_report(error.status()) {
            let url = ctx.map_or_else(|| raw_url.to_string(), |ctx| ctx.url().to_string());
            tracing::error!(
                request_id = request_id.unwrap_or("-"),
                stage = %stage,
                error = %error_chain(&error),
                "{}",
                render_response_error(&url, &response)
            );
        }

        let drained = match (ctx, unparsed) {
            (Some(ctx), _) => ctx.drain_body().await,
            (None, Some(body)) => {
                BodyReader::new(body, self.options.max_body_size)
                    .drain()
                    .await
            }
            (None, None) => None,
        };
        if let Some(drained) = drained {
            tracing::debug!(bytes = drained, "Drained unread request body");
        }

        Ok(response)
    }

    /// Emit headers, run `before_send`, then transmit.
    fn send(&self, response: RouteResponse) -> Result<Response<Body>, FatalFailure> {
        let RouteResponse {
            status,
            headers,
            body,
        } = response;
        let status = status.unwrap_or(StatusCode::OK);

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let Some(value) = value else { continue };
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FatalFailure::new(Stage::EmittingHeaders, e))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| FatalFailure::new(Stage::EmittingHeaders, e))?;
            header_map.insert(name, value);
        }

        self.hooks
            .call_before_send(status, &header_map, body.as_ref())
            .map_err(|e| FatalFailure::new(Stage::BeforeSend, e))?;

        transmit(status, header_map, body).map_err(|e| FatalFailure::new(Stage::Transmitting, e))
    }
}

fn transmit(
    status: StatusCode,
    mut headers: HeaderMap,
    body: Option<ResponseBody>,
) -> Result<Response<Body>, BoxError> {
    let body = match body {
        Some(ResponseBody::Responder(responder)) => {
            let mut builder = Response::builder().status(status);
            if let Some(builder_headers) = builder.headers_mut() {
                *builder_headers = headers;
            }
            return responder(builder);
        }
        Some(body) => {
            let (body, content_type) = body.into_body()?;
            if let Some(content_type) = content_type {
                if !headers.contains_key(header::CONTENT_TYPE) {
                    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
                }
            }
            body
        }
        None => Body::empty(),
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// `outer: inner: innermost` rendering of an error and its sources.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UrlResolver;
    use crate::routing::Route;
    use axum::body::Bytes;
    use axum::http::Method;
    use futures_util::stream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::task::Poll;

    async fn hello(_ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
        Ok(RouteResponse::text("hello"))
    }

    async fn boom(_ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
        Err("boom".into())
    }

    fn root(routes: Vec<Route>, hooks: Hooks) -> RootHandler {
        RootHandler::new(Router::new(routes), hooks, ContextOptions::default())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_uses_default_content_type() {
        let handler = root(vec![Route::get("/hello", hello)], Hooks::new());
        let response = handler.handle(get("/hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_handler_content_type_wins() {
        let handler = root(
            vec![Route::get("/csv", |_ctx: Arc<RequestContext>| async {
                Ok::<_, BoxError>(RouteResponse::text("a,b").with_header("Content-Type", "text/csv"))
            })],
            Hooks::new(),
        );
        let response = handler.handle(get("/csv")).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found_shape() {
        let handler = root(vec![], Hooks::new());
        let response = handler.handle(get("/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status_code": 404, "code": "not_found", "message": "Not Found"})
        );
    }

    #[tokio::test]
    async fn test_plain_error_becomes_server_error() {
        let handler = root(vec![Route::get("/boom", boom)], Hooks::new());
        let response = handler.handle(get("/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status_code": 500, "code": "server", "message": "boom"})
        );
    }

    #[tokio::test]
    async fn test_resp_error_headers_are_applied() {
        let handler = root(
            vec![Route::get("/auth", |_ctx: Arc<RequestContext>| async {
                Err::<RouteResponse, BoxError>(
                    RespError::unauthorized("no token")
                        .with_header("WWW-Authenticate", "jwt")
                        .into(),
                )
            })],
            Hooks::new(),
        );
        let response = handler.handle(get("/auth")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["www-authenticate"], "jwt");
    }

    #[tokio::test]
    async fn test_none_header_is_suppressed() {
        let handler = root(
            vec![Route::get("/raw", |_ctx: Arc<RequestContext>| async {
                Ok::<_, BoxError>(RouteResponse::text("raw").without_header("Content-Type"))
            })],
            Hooks::new(),
        );
        let response = handler.handle(get("/raw")).await.unwrap();
        // The explicit `None` only drops the handler's own header; the
        // default content type still applies.
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_hooks_run_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| {
            let calls = Arc::clone(&calls);
            move || calls.lock().unwrap().push(name)
        };

        let (a, b, c, d) = (
            record("on_request"),
            record("on_request_parsed"),
            record("on_response"),
            record("before_send"),
        );
        let hooks = Hooks::new()
            .on_request(move |_| {
                a();
                Ok(())
            })
            .on_request_parsed(move |_| {
                b();
                Ok(())
            })
            .on_response(move |_, _| {
                c();
                Ok(())
            })
            .before_send(move |status, _, _| {
                assert_eq!(status, StatusCode::OK);
                d();
                Ok(())
            });

        let handler = root(vec![Route::get("/hello", hello)], hooks);
        handler.handle(get("/hello")).await.unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["on_request", "on_request_parsed", "on_response", "before_send"]
        );
    }

    #[tokio::test]
    async fn test_on_error_sees_stage_and_context() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let hooks = Hooks::new().on_error(move |failure, ctx| {
            *sink.lock().unwrap() = Some((failure.stage(), ctx.map(|c| c.pathname().to_string())));
            Ok(())
        });

        let handler = root(vec![Route::get("/boom", boom)], hooks);
        handler.handle(get("/boom")).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Stage::Dispatching, Some("/boom".to_string())))
        );
    }

    #[tokio::test]
    async fn test_early_hook_failure_is_recoverable() {
        let hooks = Hooks::new().on_request_parsed(|_| Err("hook exploded".into()));
        let handler = root(vec![Route::get("/hello", hello)], hooks);
        let response = handler.handle(get("/hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "hook exploded");
    }

    #[tokio::test]
    async fn test_parse_failure_has_no_context() {
        let seen_ctx = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen_ctx);
        let hooks = Hooks::new().on_error(move |failure, ctx| {
            *sink.lock().unwrap() = Some((failure.stage(), ctx.is_some()));
            Ok(())
        });
        let handler = RootHandler::new(
            Router::new(vec![Route::get("/hello", hello)]),
            hooks,
            ContextOptions {
                url: UrlResolver::Forwarded,
                ..ContextOptions::default()
            },
        );

        let response = handler.handle(get("/hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(*seen_ctx.lock().unwrap(), Some((Stage::Parsing, false)));
        assert_eq!(
            body_json(response).await["message"],
            "x-forwarded-proto header missing"
        );
    }

    #[tokio::test]
    async fn test_before_send_failure_is_fatal() {
        let hooks = Hooks::new().before_send(|_, _, _| Err("apm down".into()));
        let handler = root(vec![Route::get("/hello", hello)], hooks);
        let failure = handler.handle(get("/hello")).await.unwrap_err();
        assert_eq!(failure.stage(), Stage::BeforeSend);
    }

    #[tokio::test]
    async fn test_on_error_failure_is_fatal() {
        let hooks = Hooks::new().on_error(|_, _| Err("reporter down".into()));
        let handler = root(vec![Route::get("/boom", boom)], hooks);
        let failure = handler.handle(get("/boom")).await.unwrap_err();
        assert_eq!(failure.stage(), Stage::OnError);
    }

    #[tokio::test]
    async fn test_invalid_header_is_fatal() {
        let handler = root(
            vec![Route::get("/bad", |_ctx: Arc<RequestContext>| async {
                Ok::<_, BoxError>(RouteResponse::new().with_header("bad header", "x"))
            })],
            Hooks::new(),
        );
        let failure = handler.handle(get("/bad")).await.unwrap_err();
        assert_eq!(failure.stage(), Stage::EmittingHeaders);
    }

    #[tokio::test]
    async fn test_responder_gets_status_and_headers() {
        let handler = root(
            vec![Route::get("/custom", |_ctx: Arc<RequestContext>| async {
                Ok::<_, BoxError>(
                    RouteResponse::new()
                        .with_status(StatusCode::ACCEPTED)
                        .with_header("x-custom", "yes")
                        .with_body(ResponseBody::responder(|builder| {
                            Ok(builder.body(Body::from("custom"))?)
                        })),
                )
            })],
            Hooks::new(),
        );
        let response = handler.handle(get("/custom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-custom"], "yes");
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_responder_failure_is_fatal() {
        let handler = root(
            vec![Route::get("/custom", |_ctx: Arc<RequestContext>| async {
                Ok::<_, BoxError>(RouteResponse::new().with_body(ResponseBody::responder(
                    |_builder| Err("socket closed".into()),
                )))
            })],
            Hooks::new(),
        );
        let failure = handler.handle(get("/custom")).await.unwrap_err();
        assert_eq!(failure.stage(), Stage::Transmitting);
    }

    #[tokio::test]
    async fn test_redirect() {
        let handler = root(
            vec![Route::get("/old", |ctx: Arc<RequestContext>| async move {
                let target = ctx.base_url().join("/new")?;
                Ok::<_, BoxError>(ctx.redirect(&target))
            })],
            Hooks::new(),
        );
        let response = handler.handle(get("/old")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "http://localhost/new");
    }

    /// Request body that flags when it has been read to the end.
    fn tracked_body(done: Arc<AtomicBool>) -> Body {
        let mut chunks =
            vec![Bytes::from_static(b"unread "), Bytes::from_static(b"payload")].into_iter();
        Body::from_stream(stream::poll_fn(move |_| {
            let next = chunks.next();
            if next.is_none() {
                done.store(true, Ordering::SeqCst);
            }
            Poll::Ready(next.map(Ok::<_, std::io::Error>))
        }))
    }

    #[tokio::test]
    async fn test_unread_body_is_drained_on_handler_error() {
        let handler = root(vec![Route::new(Method::POST, "/boom", boom)], Hooks::new());
        let done = Arc::new(AtomicBool::new(false));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/boom")
            .body(tracked_body(Arc::clone(&done)))
            .unwrap();
        let response = handler.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_body_is_drained_when_parsing_fails() {
        let handler = RootHandler::new(
            Router::new(vec![Route::post("/hello", hello)]),
            Hooks::new(),
            ContextOptions {
                url: UrlResolver::Forwarded,
                ..ContextOptions::default()
            },
        );
        let done = Arc::new(AtomicBool::new(false));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/hello")
            .body(tracked_body(Arc::clone(&done)))
            .unwrap();
        let response = handler.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_body_is_drained_when_on_request_fails() {
        let hooks = Hooks::new().on_request(|_| Err(RespError::bad_request("rejected").into()));
        let handler = root(vec![Route::post("/hello", hello)], hooks);
        let done = Arc::new(AtomicBool::new(false));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/hello")
            .body(tracked_body(Arc::clone(&done)))
            .unwrap();
        let response = handler.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_error_chain_renders_sources() {
        let error = RespError::server("outer").with_source("inner");
        assert_eq!(error_chain(&error), "outer: inner");
    }
}
