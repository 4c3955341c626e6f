//! Minimal HTTP request pipeline.
//!
//! Parses each request into an immutable [`RequestContext`], routes it by
//! exact method and normalized path, runs the matched handler, and turns
//! every failure into a fixed JSON error shape.

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod query_values;
pub mod routing;
pub mod security;

pub use config::PipelineConfig;
pub use context::{RequestContext, StubRequest};
pub use error::{BoxError, ErrorKind, RespError};
pub use http::{Hooks, HttpServer, ResponseBody, RootHandler, RouteResponse};
pub use lifecycle::Shutdown;
pub use routing::{Route, Router};
