//! Handler responses and their default serialization.
//!
//! # Responsibilities
//! - Describe what a handler answers with (status, headers, body)
//! - Serialize every body variant except responders into an axum `Body`
//! - Pick a default `Content-Type` when the handler did not set one
//!
//! # Design Decisions
//! - Status defaults to 200 when omitted
//! - A header set to `None` is dropped before transmission, so a handler
//!   can suppress a header that would otherwise be emitted
//! - Responders bypass serialization and build the final response themselves

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;

use axum::body::{Body, Bytes};
use axum::http::{response, Response, StatusCode};
use futures_util::{Stream, TryStreamExt};
use serde::Serialize;

use crate::error::BoxError;

/// Streaming response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// A callback that takes over serialization entirely.
///
/// It receives a builder already carrying the status and emitted headers.
pub type Responder =
    Box<dyn FnOnce(response::Builder) -> Result<Response<Body>, BoxError> + Send>;

/// The body a handler responds with.
pub enum ResponseBody {
    Stream(BodyStream),
    Buffer(Bytes),
    Json(serde_json::Value),
    Number(serde_json::Number),
    Text(String),
    Responder(Responder),
}

impl ResponseBody {
    /// Wrap a fallible byte stream.
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        ResponseBody::Stream(Box::pin(stream.map_err(Into::into)))
    }

    /// Serialize any value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(ResponseBody::Json)
    }

    pub fn responder<F>(responder: F) -> Self
    where
        F: FnOnce(response::Builder) -> Result<Response<Body>, BoxError> + Send + 'static,
    {
        ResponseBody::Responder(Box::new(responder))
    }

    /// Short rendering used in error diagnostics.
    pub fn preview(&self) -> String {
        match self {
            ResponseBody::Responder(_) => "<dynamic>".to_string(),
            ResponseBody::Stream(_) => "<stream>".to_string(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => serde_json::Value::String(text.clone()).to_string(),
            ResponseBody::Buffer(_) | ResponseBody::Number(_) => "<unknown>".to_string(),
        }
    }

    fn default_content_type(&self) -> Option<&'static str> {
        match self {
            ResponseBody::Json(_) | ResponseBody::Number(_) => Some("application/json; charset=utf-8"),
            ResponseBody::Buffer(_) | ResponseBody::Stream(_) => Some("application/octet-stream"),
            ResponseBody::Text(_) => Some("text/plain; charset=utf-8"),
            ResponseBody::Responder(_) => None,
        }
    }

    /// Serialize into a transport body along with its default content type.
    ///
    /// Responders cannot be serialized; the caller invokes them instead.
    pub(crate) fn into_body(self) -> Result<(Body, Option<&'static str>), BoxError> {
        let content_type = self.default_content_type();
        let body = match self {
            ResponseBody::Stream(stream) => Body::from_stream(stream),
            ResponseBody::Buffer(bytes) => Body::from(bytes),
            ResponseBody::Json(value) => Body::from(serde_json::to_vec(&value)?),
            ResponseBody::Number(number) => Body::from(number.to_string()),
            ResponseBody::Text(text) => Body::from(text),
            ResponseBody::Responder(_) => return Err("responder bodies are not serializable".into()),
        };
        Ok((body, content_type))
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
            ResponseBody::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            ResponseBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ResponseBody::Number(number) => f.debug_tuple("Number").field(number).finish(),
            ResponseBody::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ResponseBody::Responder(_) => f.write_str("Responder(..)"),
        }
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        ResponseBody::Text(text)
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        ResponseBody::Text(text.to_string())
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        ResponseBody::Buffer(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        ResponseBody::Buffer(Bytes::from(bytes))
    }
}

impl From<serde_json::Value> for ResponseBody {
    fn from(value: serde_json::Value) -> Self {
        ResponseBody::Json(value)
    }
}

impl From<i64> for ResponseBody {
    fn from(number: i64) -> Self {
        ResponseBody::Number(number.into())
    }
}

impl From<u64> for ResponseBody {
    fn from(number: u64) -> Self {
        ResponseBody::Number(number.into())
    }
}

/// What a route handler answers with.
#[derive(Debug, Default)]
pub struct RouteResponse {
    /// Response status; 200 when `None`.
    pub status: Option<StatusCode>,
    /// Header name to value. `None` values are not sent.
    pub headers: BTreeMap<String, Option<String>>,
    pub body: Option<ResponseBody>,
}

impl RouteResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A 200 response with a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new().with_body(ResponseBody::json(value)?))
    }

    /// A 200 response with a text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_body(ResponseBody::Text(text.into()))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), Some(value.into()));
        self
    }

    /// Mark a header as suppressed.
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.headers.insert(name.into(), None);
        self
    }

    pub fn with_body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The status that will be transmitted.
    pub fn status_or_default(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }
}

impl From<ResponseBody> for RouteResponse {
    fn from(body: ResponseBody) -> Self {
        Self::new().with_body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_status_defaults_to_ok() {
        assert_eq!(RouteResponse::new().status_or_default(), StatusCode::OK);
        assert_eq!(
            RouteResponse::new()
                .with_status(StatusCode::CREATED)
                .status_or_default(),
            StatusCode::CREATED
        );
    }

    #[test]
    fn test_preview_per_body_kind() {
        let chunks = stream::iter(vec![Ok::<_, BoxError>(Bytes::from_static(b"a"))]);
        assert_eq!(ResponseBody::stream(chunks).preview(), "<stream>");
        assert_eq!(
            ResponseBody::responder(|b| Ok(b.body(Body::empty())?)).preview(),
            "<dynamic>"
        );
        assert_eq!(
            ResponseBody::Json(serde_json::json!({"a": 1})).preview(),
            r#"{"a":1}"#
        );
        assert_eq!(ResponseBody::from("hi").preview(), r#""hi""#);
        assert_eq!(ResponseBody::from(42i64).preview(), "<unknown>");
        assert_eq!(ResponseBody::from(vec![1u8, 2]).preview(), "<unknown>");
    }

    #[tokio::test]
    async fn test_into_body_serializes_json() {
        let (body, content_type) = ResponseBody::Json(serde_json::json!({"ok": true}))
            .into_body()
            .unwrap();
        assert_eq!(content_type, Some("application/json; charset=utf-8"));
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"ok":true}"#);
    }

    #[test]
    fn test_responder_is_not_serializable() {
        let body = ResponseBody::responder(|b| Ok(b.body(Body::empty())?));
        assert!(body.into_body().is_err());
    }
}
