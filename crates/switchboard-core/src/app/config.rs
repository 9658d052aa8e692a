//! Mediator configuration.

use serde::{Deserialize, Serialize};

/// What the fan-out coordinator does when one event handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutPolicy {
    /// Let every handler run to completion and aggregate all failures.
    #[default]
    RunAll,

    /// Raise the shared cancellation signal on the first failure. Handlers
    /// still run to completion (cancellation is cooperative) and every
    /// failure is still reported.
    CancelOnFirstFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_concurrent_handlers must be at least 1")]
    InvalidConcurrency,

    #[error("invalid mediator config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Mediator settings.
///
/// Defaults: run all handlers, no concurrency bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    pub fan_out_policy: FanOutPolicy,

    /// Upper bound on handlers running at once within one publish.
    /// `None` starts them all immediately.
    pub max_concurrent_handlers: Option<usize>,
}

impl MediatorConfig {
    pub fn with_fan_out_policy(mut self, policy: FanOutPolicy) -> Self {
        self.fan_out_policy = policy;
        self
    }

    pub fn with_max_concurrent_handlers(mut self, limit: usize) -> Self {
        self.max_concurrent_handlers = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_handlers == Some(0) {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
