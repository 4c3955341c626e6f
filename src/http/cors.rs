//! CORS preflight negotiation.
//!
//! # Responsibilities
//! - Recognize preflight requests (`OPTIONS` + `Access-Control-Request-Method`)
//! - Echo allow-listed origins with the requested methods and headers
//!
//! # Design Decisions
//! - Origins compare by exact string equality
//! - A non-allow-listed origin gets a bare 200, not an error
//! - Missing or repeated request headers fail as `BadRequest`

use axum::http::{Method, StatusCode};

use crate::context::RequestContext;
use crate::error::RespError;
use crate::http::response::RouteResponse;

pub const ACCESS_CONTROL_REQUEST_METHOD: &str = "Access-Control-Request-Method";
pub const ACCESS_CONTROL_REQUEST_HEADERS: &str = "Access-Control-Request-Headers";
pub const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ACCESS_CONTROL_ALLOW_METHOD: &str = "Access-Control-Allow-Method";
pub const ACCESS_CONTROL_ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";

/// Answers preflight requests for a fixed origin allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsNegotiator {
    allow_origins: Vec<String>,
}

impl CorsNegotiator {
    pub fn new<I, S>(allow_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_origins: allow_origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allow_origins(&self) -> &[String] {
        &self.allow_origins
    }

    /// Whether the request is a preflight this negotiator should answer.
    pub fn is_preflight(ctx: &RequestContext) -> Result<bool, RespError> {
        if ctx.method() != Method::OPTIONS {
            return Ok(false);
        }
        Ok(ctx
            .header(ACCESS_CONTROL_REQUEST_METHOD)?
            .is_some_and(|value| !value.is_empty()))
    }

    /// Build the preflight response.
    pub fn negotiate(&self, ctx: &RequestContext) -> Result<RouteResponse, RespError> {
        let origin = match ctx.header("origin")? {
            Some(origin) if self.allow_origins.iter().any(|allowed| allowed.as_str() == origin) => {
                origin
            }
            _ => return Ok(RouteResponse::new().with_status(StatusCode::OK)),
        };

        let methods = parse_csl_header(ctx, ACCESS_CONTROL_REQUEST_METHOD)?;
        let headers = parse_csl_header(ctx, ACCESS_CONTROL_REQUEST_HEADERS)?;

        Ok(RouteResponse::new()
            .with_status(StatusCode::OK)
            .with_header(ACCESS_CONTROL_ALLOW_ORIGIN, origin)
            .with_header(ACCESS_CONTROL_ALLOW_METHOD, methods.join(","))
            .with_header(ACCESS_CONTROL_ALLOW_HEADERS, headers.join(", ")))
    }
}

/// Split a comma-separated header, trimming entries and dropping empty ones.
fn parse_csl_header(ctx: &RequestContext, name: &str) -> Result<Vec<String>, RespError> {
    let value = match ctx.header(name) {
        Ok(Some(value)) => value,
        _ => return Err(RespError::bad_request(format!("invalid '{}' header", name))),
    };
    Ok(value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect())
}
