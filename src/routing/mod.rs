//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (method, normalized pathname)
//!     → router.rs (pre-route, CORS preflight, route lookup)
//!     → route.rs (method + matcher.rs path check)
//!     → Return: handler result or NotFound
//!
//! Route Registration (at startup):
//!     Route[]
//!     → Normalize paths
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - Exact path equality only, no regex
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod route;
pub mod router;

pub use matcher::PathMatch;
pub use route::{Handler, HandlerFuture, Route};
pub use router::{PreRoute, PreRouteFuture, Router};
