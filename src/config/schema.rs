//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::Environment;

/// Root configuration for a pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stages from outermost to innermost. The transport stage is always
    /// appended as the terminal stage and is not listed here.
    pub stages: Vec<StageKind>,

    /// Throttle stage settings.
    pub throttle: ThrottleConfig,

    /// Default environment for the environment stage.
    pub environment: Option<EnvironmentConfig>,

    /// Settings for the default HTTP transport.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: vec![
                StageKind::ResetGuard,
                StageKind::Autocancel,
                StageKind::Logging,
                StageKind::Throttle,
            ],
            throttle: ThrottleConfig::default(),
            environment: None,
            transport: TransportConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A configurable stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    ResetGuard,
    Autocancel,
    Logging,
    Throttle,
    Environment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::ResetGuard => "reset_guard",
            StageKind::Autocancel => "autocancel",
            StageKind::Logging => "logging",
            StageKind::Throttle => "throttle",
            StageKind::Environment => "environment",
        };
        f.write_str(name)
    }
}

/// Throttle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Maximum tasks running below the throttle at once.
    pub max_concurrent: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { max_concurrent: 6 }
    }
}

/// Default environment applied by the environment stage.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub host: String,

    /// Path prefix, e.g. "/v1".
    pub path_prefix: String,

    /// Headers added when the request does not set them.
    pub headers: BTreeMap<String, String>,

    /// Query parameters added when the request does not set them.
    pub query: BTreeMap<String, String>,
}

impl EnvironmentConfig {
    pub fn to_environment(&self) -> Environment {
        self.query.iter().fold(
            Environment::new(self.host.clone())
                .with_path_prefix(&self.path_prefix)
                .with_headers(self.headers.clone()),
            |environment, (name, value)| environment.with_query(name.clone(), value.clone()),
        )
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Largest accepted response body.
    pub max_body_bytes: u64,

    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024,
            user_agent: concat!("http-pipeline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level for this crate when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
