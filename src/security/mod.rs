//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Handler:
//!     → jwt.rs (assert `Authorization: jwt <token>` is valid)
//!     → continue with verified claims
//! ```
//!
//! # Design Decisions
//! - Opt-in per handler, not a global middleware
//! - Fail closed: reject on any verification failure
//! - No trust in client input

pub mod jwt;

pub use jwt::{assert_valid_jwt, sign, verify, JwtError, JWT_ALGORITHM};
