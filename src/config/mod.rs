//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PipelineConfig (validated, immutable)
//!     → consumed once at startup by the server
//!
//! Secrets and deployment values:
//!     env.rs (required environment variables)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{load_config_var, ConfigVarError};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CorsConfig, FatalPolicy, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    PipelineConfig, RuntimeConfig, UrlResolution,
};
pub use validation::{validate_config, ValidationError};
