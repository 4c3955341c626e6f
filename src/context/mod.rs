//! Per-request context.
//!
//! # Data Flow
//! ```text
//! http::Request<Body>
//!     → url.rs (resolve base + target, normalize pathname)
//!     → query.rs (frozen query mapping)
//!     → body.rs (one-shot body reader)
//!     → RequestContext (read-only, shared via Arc with the handler)
//! ```
//!
//! # Design Decisions
//! - Built once per request and never mutated afterwards
//! - Method is uppercased, pathname carries no trailing slash
//! - Header lookup is case-insensitive and refuses repeated headers
//! - The body is readable exactly once; a second read fails loudly

pub mod body;
pub mod query;
pub mod stub;
pub mod url;

pub use body::{BodyError, BodyRead};
pub use query::{Query, QueryValue};
pub use stub::StubRequest;
pub use self::url::{normalize_pathname, resolve_url, ContextError, UrlResolver};

use std::borrow::Cow;

use axum::body::{Body, BodyDataStream};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::RespError;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::RouteResponse;
use body::BodyReader;

/// Default cap for text and JSON body reads (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// How contexts are built from raw requests.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub url: UrlResolver,
    pub max_body_size: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            url: UrlResolver::default(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Normalized, read-only view of one inbound request.
#[derive(Debug)]
pub struct RequestContext {
    base_url: ::url::Url,
    url: ::url::Url,
    pathname: String,
    method: Method,
    query: Query,
    headers: HeaderMap,
    body: BodyReader,
}

impl RequestContext {
    /// Parse a raw transport request.
    pub fn parse(request: Request<Body>, options: &ContextOptions) -> Result<Self, ContextError> {
        Self::try_parse(request, options).map_err(|(e, _)| e)
    }

    /// Like [`parse`](Self::parse), but hands the untouched body back on
    /// failure so the caller can still drain it.
    pub(crate) fn try_parse(
        request: Request<Body>,
        options: &ContextOptions,
    ) -> Result<Self, (ContextError, Body)> {
        let (parts, body) = request.into_parts();
        let base_url = match options.url.base_url(&parts.headers) {
            Ok(base_url) => base_url,
            Err(e) => return Err((e, body)),
        };
        let url = resolve_url(&base_url, &parts.uri.to_string());
        Ok(Self::from_parts(
            base_url,
            url,
            parts.method,
            parts.headers,
            body,
            options.max_body_size,
        ))
    }

    pub(crate) fn from_parts(
        base_url: ::url::Url,
        url: ::url::Url,
        method: Method,
        headers: HeaderMap,
        body: Body,
        max_body_size: usize,
    ) -> Self {
        let pathname = normalize_pathname(url.path());
        let query = url.query().map(Query::parse).unwrap_or_default();
        Self {
            base_url,
            url,
            pathname,
            method: uppercase_method(method),
            query,
            headers,
            body: BodyReader::new(body, max_body_size),
        }
    }

    /// Start a stub context for tests.
    pub fn stub(target: impl Into<String>) -> StubRequest {
        StubRequest::new(target)
    }

    pub fn base_url(&self) -> &::url::Url {
        &self.base_url
    }

    pub fn url(&self) -> &::url::Url {
        &self.url
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Case-insensitive header lookup.
    ///
    /// A header sent more than once is a protocol error for this API and
    /// fails as `BadRequest`. Bytes that are not valid UTF-8 are replaced
    /// with U+FFFD.
    pub fn header(&self, name: &str) -> Result<Option<Cow<'_, str>>, RespError> {
        let mut values = self.headers.get_all(name).iter();
        let Some(value) = values.next() else {
            return Ok(None);
        };
        if values.next().is_some() {
            return Err(RespError::bad_request(format!(
                "invalid [{}] header, multi-value headers not allowed",
                name
            )));
        }
        Ok(Some(String::from_utf8_lossy(value.as_bytes())))
    }

    /// Request id stamped by the request-id layer, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(&X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// Read the whole body as UTF-8 text. One-shot.
    pub async fn read_body_as_text(&self) -> Result<String, BodyError> {
        self.body.read_text().await
    }

    /// Read and deserialize the whole body as JSON. One-shot.
    pub async fn read_body_as_json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        self.body.read_json().await
    }

    /// Take the body as a read-only stream of chunks. One-shot.
    pub fn read_body_as_stream(&self) -> Result<BodyDataStream, BodyError> {
        self.body.read_stream()
    }

    /// Whether any body representation has been taken.
    pub fn is_body_consumed(&self) -> bool {
        self.body.is_consumed()
    }

    /// Drain the body if nobody read it. Returns the drained byte count.
    pub async fn drain_body(&self) -> Option<usize> {
        self.body.drain().await
    }

    /// A 302 redirect to `location`.
    pub fn redirect(&self, location: &::url::Url) -> RouteResponse {
        RouteResponse::new()
            .with_status(StatusCode::FOUND)
            .with_header(header::LOCATION.as_str(), location.as_str())
    }
}

fn uppercase_method(method: Method) -> Method {
    let upper = method.as_str().to_ascii_uppercase();
    if upper == method.as_str() {
        return method;
    }
    Method::from_bytes(upper.as_bytes()).unwrap_or(method)
}
