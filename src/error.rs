//! Response-producing errors.
//!
//! # Responsibilities
//! - Define the closed set of error kinds a handler may raise
//! - Translate any error into the fixed JSON wire shape
//! - Keep the original cause around for logs without leaking it to clients
//!
//! # Wire Shape
//! ```text
//! {"status_code": 404, "code": "not_found", "message": "Not Found"}
//! ```
//!
//! # Design Decisions
//! - One tagged kind instead of a type per status code; every per-kind
//!   property is a single exhaustive match
//! - Errors that are not `RespError`s become `ServerError` at the root
//!   boundary, keeping their message

use std::collections::BTreeMap;
use std::fmt;

use axum::http::StatusCode;
use serde::Serialize;

use crate::http::response::{ResponseBody, RouteResponse};

/// Error type accepted from handlers, hooks and responders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The closed taxonomy of errors that produce a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    ServerError,
}

impl ErrorKind {
    /// HTTP status sent for this kind.
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code placed in the `code` field.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ServerError => "server",
        }
    }

    /// Message used when the error is raised without one.
    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::ServerError => "Server Error",
        }
    }
}

/// Serialized body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub code: &'static str,
    pub message: String,
}

/// An error that knows which response it produces.
#[derive(Debug)]
pub struct RespError {
    kind: ErrorKind,
    message: String,
    source: Option<BoxError>,
    headers: BTreeMap<String, String>,
}

impl RespError {
    /// Create an error of the given kind with its default message.
    pub fn new(kind: ErrorKind) -> Self {
        Self::with_message(kind, kind.default_message())
    }

    /// Create an error of the given kind with a custom message.
    ///
    /// An empty message falls back to the kind's default.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            kind.default_message().to_string()
        } else {
            message
        };
        Self {
            kind,
            message,
            source: None,
            headers: BTreeMap::new(),
        }
    }

    /// Wrap an arbitrary error, reusing its message.
    pub fn wrap(kind: ErrorKind, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::with_message(kind, source.to_string()).with_source(source)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Unauthorized, message)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::ServerError, message)
    }

    /// Attach the original cause. It is logged, never serialized.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a header to the error response.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Normalize any handler error: recognized errors pass through, anything
    /// else becomes a `ServerError` that keeps the original message.
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<RespError>() {
            Ok(resp_error) => *resp_error,
            Err(other) => Self::wrap(ErrorKind::ServerError, other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The wire body for this error.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status().as_u16(),
            code: self.code(),
            message: self.message.clone(),
        }
    }

    /// Build the response this error produces.
    pub fn to_response(&self) -> RouteResponse {
        // A struct of plain fields always serializes.
        let body = serde_json::to_value(self.to_body()).unwrap_or_default();
        let mut response = RouteResponse::new()
            .with_status(self.status())
            .with_body(ResponseBody::Json(body));
        for (name, value) in &self.headers {
            response = response.with_header(name.clone(), value.clone());
        }
        response
    }
}

impl From<ErrorKind> for RespError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for RespError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RespError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
