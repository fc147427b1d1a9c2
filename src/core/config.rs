//! Interceptor pipeline configuration
//!
//! The ordered node list, each node's exception policy and free-form
//! parameters. Read once at startup; the chain is built from it and never
//! reconfigured afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// What happens when an interceptor node's own logic fails.
///
/// `Rethrow` aborts the remaining chain and propagates the error to the chain's
/// caller; `LogAndContinue` logs at warn level and invokes the next node as if
/// nothing happened. Validation and permission nodes rethrow; observability
/// nodes log and continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionPolicy {
    #[default]
    Rethrow,
    LogAndContinue,
}

/// One entry of the ordered interceptor specification list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorSpec {
    /// Node-kind identifier resolved against the factory table
    pub kind: String,

    #[serde(default)]
    pub policy: ExceptionPolicy,

    /// Node-specific parameters handed verbatim to the factory
    #[serde(default)]
    pub params: toml::Table,
}

impl InterceptorSpec {
    pub fn new(kind: impl Into<String>, policy: ExceptionPolicy) -> Self {
        Self {
            kind: kind.into(),
            policy,
            params: toml::Table::new(),
        }
    }
}

/// Ordered interceptor pipeline specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, rename = "interceptor")]
    pub interceptors: Vec<InterceptorSpec>,
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Validate the specification for internal consistency
    ///
    /// Each kind may appear at most once; the chain builder relies on kinds as
    /// stable node identities for logging.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, spec) in self.interceptors.iter().enumerate() {
            if self.interceptors[..i].iter().any(|s| s.kind == spec.kind) {
                return Err(ConfigError::DuplicateKind(spec.kind.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pipeline() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [[interceptor]]
            kind = "security"

            [[interceptor]]
            kind = "monitoring"
            policy = "log_and_continue"
            params = { slow_threshold_ms = 500 }
            "#,
        )
        .unwrap();

        assert_eq!(config.interceptors.len(), 2);
        assert_eq!(config.interceptors[0].kind, "security");
        assert_eq!(config.interceptors[0].policy, ExceptionPolicy::Rethrow);
        assert_eq!(
            config.interceptors[1].policy,
            ExceptionPolicy::LogAndContinue
        );
        assert_eq!(
            config.interceptors[1].params["slow_threshold_ms"],
            toml::Value::Integer(500)
        );
    }

    #[test]
    fn test_empty_pipeline_is_valid() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert!(config.interceptors.is_empty());
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
            [[interceptor]]
            kind = "monitoring"

            [[interceptor]]
            kind = "monitoring"
            "#,
        );

        assert!(matches!(result, Err(ConfigError::DuplicateKind(kind)) if kind == "monitoring"));
    }
}
