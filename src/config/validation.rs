//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that listed stages have the settings they need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PipelineConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{PipelineConfig, StageKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("throttle stage is listed but throttle.max_concurrent is 0")]
    ZeroThrottleLimit,

    #[error("stage '{0}' is listed more than once")]
    DuplicateStage(StageKind),

    #[error("environment stage is listed but no [environment] section is configured")]
    MissingEnvironment,

    #[error("environment.host must not be empty")]
    EmptyEnvironmentHost,

    #[error("{0} must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error("transport.max_body_bytes must be greater than 0")]
    ZeroBodyLimit,

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for stage in &config.stages {
        if !seen.insert(*stage) {
            errors.push(ValidationError::DuplicateStage(*stage));
        }
    }

    if seen.contains(&StageKind::Throttle) && config.throttle.max_concurrent == 0 {
        errors.push(ValidationError::ZeroThrottleLimit);
    }

    match &config.environment {
        Some(environment) if environment.host.trim().is_empty() => {
            errors.push(ValidationError::EmptyEnvironmentHost);
        }
        None if seen.contains(&StageKind::Environment) => {
            errors.push(ValidationError::MissingEnvironment);
        }
        _ => {}
    }

    if config.transport.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("transport.connect_timeout_secs"));
    }
    if config.transport.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("transport.request_timeout_secs"));
    }
    if config.transport.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
