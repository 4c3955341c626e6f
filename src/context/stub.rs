//! Stub contexts for exercising handlers without a server.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};

use super::url::{localhost, resolve_url};
use super::{RequestContext, DEFAULT_MAX_BODY_SIZE};

/// Builder for a [`RequestContext`] resolved against `http://localhost`.
///
/// ```
/// use micro_pipeline::context::StubRequest;
///
/// let ctx = StubRequest::new("/foo/bar/?baz=1")
///     .header("Content-Length", "10")
///     .build();
/// assert_eq!(ctx.pathname(), "/foo/bar");
/// assert_eq!(ctx.header("content-length").unwrap().as_deref(), Some("10"));
/// ```
#[derive(Debug, Clone)]
pub struct StubRequest {
    target: String,
    method: Method,
    headers: HeaderMap,
    body: String,
}

impl StubRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a header value.
    ///
    /// # Panics
    /// Panics if the name or value is not a valid HTTP header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(name.as_bytes()).expect("invalid stub header name");
        let value = HeaderValue::from_str(value).expect("invalid stub header value");
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> RequestContext {
        let base_url = localhost();
        let url = resolve_url(&base_url, &self.target);
        RequestContext::from_parts(
            base_url,
            url,
            self.method,
            self.headers,
            Body::from(self.body),
            DEFAULT_MAX_BODY_SIZE,
        )
    }
}
