//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, fallback into the pipeline)
//!     → request.rs (add request ID)
//!     → root.rs (hooks, parse, route, normalize errors)
//!         → cors.rs (preflight negotiation, via the router)
//!     → response.rs (serialize body, default content type)
//!     → Send to client
//! ```

pub mod cors;
pub mod hooks;
pub mod request;
pub mod response;
pub mod root;
pub mod server;

pub use cors::CorsNegotiator;
pub use hooks::{HookResult, Hooks};
pub use request::X_REQUEST_ID;
pub use response::{BodyStream, ResponseBody, RouteResponse};
pub use root::{FatalFailure, RequestFailure, RootHandler, Stage};
pub use server::HttpServer;
