//! Fluent chain assembly.
//!
//! The first stage appended is the innermost (terminal) node; each later
//! stage wraps everything appended before it.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{PipelineConfig, StageKind};
use crate::http::{Environment, Request};
use crate::operator::{Chain, Operator};
use crate::operators::{
    ApplyEnvironment, Autocancel, Logging, ModifyRequest, ResetGuard, Throttle, TransportOperator,
};
use crate::transport::Transport;

/// Errors from [`OperatorBuilder::build`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("cannot build a chain with no stages")]
    EmptyChain,
}

/// Request transform used by [`Stage::ModifyRequest`].
pub type RequestTransform = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// Symbolic description of a stage.
#[derive(Clone)]
pub enum Stage {
    Autocancel,
    /// Stage-level default environment.
    Environment(Environment),
    ModifyRequest(RequestTransform),
    Logging,
    ResetGuard,
    /// Concurrency limit.
    Throttle(usize),
    Transport(Arc<dyn Transport>),
}

impl Stage {
    fn instantiate(self) -> Arc<dyn Operator> {
        match self {
            Stage::Autocancel => Arc::new(Autocancel::new()),
            Stage::Environment(environment) => Arc::new(ApplyEnvironment::new(Some(environment))),
            Stage::ModifyRequest(transform) => Arc::new(ModifyRequest::from_arc(transform)),
            Stage::Logging => Arc::new(Logging::new()),
            Stage::ResetGuard => Arc::new(ResetGuard::new()),
            Stage::Throttle(limit) => Throttle::new(limit),
            Stage::Transport(transport) => Arc::new(TransportOperator::new(transport)),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Autocancel => f.write_str("Autocancel"),
            Stage::Environment(environment) => f.debug_tuple("Environment").field(environment).finish(),
            Stage::ModifyRequest(_) => f.write_str("ModifyRequest"),
            Stage::Logging => f.write_str("Logging"),
            Stage::ResetGuard => f.write_str("ResetGuard"),
            Stage::Throttle(limit) => f.debug_tuple("Throttle").field(limit).finish(),
            Stage::Transport(_) => f.write_str("Transport"),
        }
    }
}

/// Assembles a linked [`Chain`] from stages, innermost first.
#[derive(Default)]
pub struct OperatorBuilder {
    operators: Vec<Arc<dyn Operator>>,
}

impl OperatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the stages appended so far in `stage`.
    pub fn append(mut self, stage: Stage) -> Self {
        self.operators.push(stage.instantiate());
        self
    }

    /// Wrap the stages appended so far in a caller-provided operator.
    ///
    /// The operator must not already be linked.
    pub fn append_operator(mut self, operator: Arc<dyn Operator>) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn modify_request<F>(self, transform: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        self.append(Stage::ModifyRequest(Arc::new(transform)))
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Link the stages and return the chain headed by the last one appended.
    pub fn build(self) -> Result<Chain, BuildError> {
        let mut head: Option<Arc<dyn Operator>> = None;
        for operator in self.operators {
            if let Some(inner) = head.take() {
                operator.set_next(inner);
            }
            head = Some(operator);
        }

        let head = head.ok_or(BuildError::EmptyChain)?;
        tracing::debug!(head = head.name(), "Chain built");
        Ok(Chain::new(head))
    }

    /// Build the chain described by `config`, terminating in `transport`.
    ///
    /// `config.stages` lists stages outer to inner.
    pub fn from_config(config: &PipelineConfig, transport: Arc<dyn Transport>) -> Result<Chain, BuildError> {
        let mut builder = Self::new().append(Stage::Transport(transport));

        for kind in config.stages.iter().rev() {
            let stage = match kind {
                StageKind::ResetGuard => Stage::ResetGuard,
                StageKind::Autocancel => Stage::Autocancel,
                StageKind::Logging => Stage::Logging,
                StageKind::Throttle => Stage::Throttle(config.throttle.max_concurrent),
                StageKind::Environment => match &config.environment {
                    Some(environment) => Stage::Environment(environment.to_environment()),
                    None => {
                        tracing::warn!("Environment stage listed without environment config, skipping");
                        continue;
                    }
                },
            };
            builder = builder.append(stage);
        }

        builder.build()
    }
}

impl fmt::Debug for OperatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.operators.iter().map(|operator| operator.name()).collect();
        f.debug_struct("OperatorBuilder").field("operators", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_builder_fails() {
        assert_eq!(OperatorBuilder::new().build().unwrap_err(), BuildError::EmptyChain);
    }

    #[test]
    fn last_appended_is_head() {
        let chain = OperatorBuilder::new()
            .append(Stage::Logging)
            .append(Stage::Throttle(2))
            .append(Stage::ResetGuard)
            .build()
            .unwrap();

        assert_eq!(chain.stage_names(), vec!["reset_guard", "throttle", "logging"]);
    }

    #[test]
    fn config_stages_are_outer_to_inner() {
        let config = PipelineConfig::default();
        let chain = OperatorBuilder::from_config(&config, Arc::new(NullTransport)).unwrap();

        assert_eq!(
            chain.stage_names(),
            vec!["reset_guard", "autocancel", "logging", "throttle", "transport"]
        );
    }

    struct NullTransport;

    impl Transport for NullTransport {
        fn send(
            &self,
            _request: crate::transport::WireRequest,
            _completion: crate::transport::TransportCallback,
        ) -> Arc<dyn crate::transport::TransportTask> {
            unreachable!("no requests are sent in builder tests")
        }
    }
}
