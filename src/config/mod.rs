//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PipelineConfig (validated, immutable)
//!     → OperatorBuilder::from_config + HttpClientTransport::from_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new chain is built for a new config
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    EnvironmentConfig, ObservabilityConfig, PipelineConfig, StageKind, ThrottleConfig,
    TransportConfig,
};
pub use validation::{validate_config, ValidationError};
