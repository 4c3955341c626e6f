//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline produces:
//!     → logging.rs (structured log events, pretty or JSON)
//!     → diagnostics.rs (multi-line error response reports)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID attached to every error report
//! - Metrics are cheap (atomic increments)
//! - 404s are expected traffic and never reported as errors

pub mod diagnostics;
pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
