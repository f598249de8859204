//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FilterConfig (validated, immutable)
//!     → classifier lists, reporter, host
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::FilterConfig;
pub use schema::{ListenerConfig, ObservabilityConfig, ReportingConfig, RulesConfig, UpstreamConfig};
pub use validation::{validate_config, ValidationError};
