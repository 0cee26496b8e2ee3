//! ScalerConfig — the untyped configuration bag handed to every trigger.
//!
//! The autoscaler resolves a trigger's declaration into three string maps
//! before constructing a scaler:
//!
//! - `trigger_metadata`: the trigger's own fields (query, threshold, host, ...)
//! - `auth_params`: values pulled from the referenced authentication secret
//! - `resolved_env`: the workload's environment, for `*FromEnv` indirections
//!
//! plus the trigger's ordinal index and its declared metric target type.
//! Each scaler parses this bag into its own typed metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metric::MetricTargetType;

/// Configuration for constructing a single scaler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalerConfig {
    /// Fields declared on the trigger itself.
    pub trigger_metadata: HashMap<String, String>,
    /// Values from the trigger's authentication reference.
    pub auth_params: HashMap<String, String>,
    /// Environment of the scaled workload, already resolved.
    pub resolved_env: HashMap<String, String>,
    /// Position of this trigger among the workload's triggers.
    pub scaler_index: usize,
    /// Declared metric target type (`Value` or `AverageValue`); `None` means default.
    pub metric_type: Option<String>,
}

impl ScalerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set a trigger metadata field.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.trigger_metadata
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Builder method: set an authentication parameter.
    pub fn with_auth(mut self, key: &str, value: &str) -> Self {
        self.auth_params.insert(key.to_string(), value.to_string());
        self
    }

    /// Builder method: set a resolved environment variable.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.resolved_env.insert(key.to_string(), value.to_string());
        self
    }

    /// Builder method: set the trigger's ordinal index.
    pub fn with_index(self, scaler_index: usize) -> Self {
        Self {
            scaler_index,
            ..self
        }
    }

    /// Builder method: set the declared metric target type.
    pub fn with_metric_type(self, metric_type: &str) -> Self {
        Self {
            metric_type: Some(metric_type.to_string()),
            ..self
        }
    }

    /// Non-empty trigger metadata value.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        non_empty(self.trigger_metadata.get(key))
    }

    /// Non-empty authentication parameter.
    pub fn auth(&self, key: &str) -> Option<&str> {
        non_empty(self.auth_params.get(key))
    }

    /// Follow a `*FromEnv` metadata field to its non-empty environment value.
    ///
    /// Returns `Ok(None)` when the metadata field is not set and
    /// `ConfigError::EnvNotSet` when it names a variable with no value.
    pub fn resolve_env(&self, field: &'static str) -> Result<Option<&str>, ConfigError> {
        let Some(var) = self.metadata(field) else {
            return Ok(None);
        };
        match non_empty(self.resolved_env.get(var)) {
            Some(value) => Ok(Some(value)),
            None => Err(ConfigError::EnvNotSet {
                field,
                var: var.to_string(),
            }),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Look `field` up in the auth params first, then in the trigger metadata.
///
/// Empty values count as absent.
pub fn get_from_auth_or_meta<'a>(
    config: &'a ScalerConfig,
    field: &'static str,
) -> Result<&'a str, ConfigError> {
    config
        .auth(field)
        .or_else(|| config.metadata(field))
        .ok_or(ConfigError::Missing(field))
}

/// Resolve the declared metric target type.
///
/// Unset defaults to `AverageValue`. `Utilization` is rejected because it
/// only makes sense for resource metrics.
pub fn resolve_metric_target_type(
    config: &ScalerConfig,
) -> Result<MetricTargetType, ConfigError> {
    match config.metric_type.as_deref() {
        None | Some("") => Ok(MetricTargetType::default()),
        Some("Value") => Ok(MetricTargetType::Value),
        Some("AverageValue") => Ok(MetricTargetType::AverageValue),
        Some("Utilization") => Err(ConfigError::UnsupportedMetricType(
            "Utilization".to_string(),
        )),
        Some(other) => Err(ConfigError::UnknownMetricType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_takes_precedence_over_metadata() {
        let config = ScalerConfig::new()
            .with_metadata("host", "meta-host")
            .with_auth("host", "auth-host");
        assert_eq!(get_from_auth_or_meta(&config, "host").unwrap(), "auth-host");
    }

    #[test]
    fn empty_auth_falls_back_to_metadata() {
        let config = ScalerConfig::new()
            .with_metadata("host", "meta-host")
            .with_auth("host", "");
        assert_eq!(get_from_auth_or_meta(&config, "host").unwrap(), "meta-host");
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let err = get_from_auth_or_meta(&ScalerConfig::new(), "port").unwrap_err();
        assert_eq!(err.to_string(), "no port given");
    }

    #[test]
    fn resolve_env_follows_indirection() {
        let config = ScalerConfig::new()
            .with_metadata("passwordFromEnv", "DB_PASS")
            .with_env("DB_PASS", "s3cret");
        assert_eq!(config.resolve_env("passwordFromEnv").unwrap(), Some("s3cret"));
    }

    #[test]
    fn resolve_env_unset_field_is_none() {
        assert_eq!(ScalerConfig::new().resolve_env("passwordFromEnv").unwrap(), None);
    }

    #[test]
    fn resolve_env_missing_variable_errors() {
        let config = ScalerConfig::new().with_metadata("connectionStringFromEnv", "DSN");
        let err = config.resolve_env("connectionStringFromEnv").unwrap_err();
        assert!(matches!(err, ConfigError::EnvNotSet { ref var, .. } if var == "DSN"));
    }

    #[test]
    fn metric_type_defaults_to_average_value() {
        let t = resolve_metric_target_type(&ScalerConfig::new()).unwrap();
        assert_eq!(t, MetricTargetType::AverageValue);
    }

    #[test]
    fn metric_type_value_accepted() {
        let config = ScalerConfig::new().with_metric_type("Value");
        assert_eq!(resolve_metric_target_type(&config).unwrap(), MetricTargetType::Value);
    }

    #[test]
    fn utilization_rejected() {
        let config = ScalerConfig::new().with_metric_type("Utilization");
        assert!(matches!(
            resolve_metric_target_type(&config),
            Err(ConfigError::UnsupportedMetricType(_))
        ));
    }

    #[test]
    fn unknown_metric_type_rejected() {
        let config = ScalerConfig::new().with_metric_type("Percent");
        assert!(matches!(
            resolve_metric_target_type(&config),
            Err(ConfigError::UnknownMetricType(ref t)) if t == "Percent"
        ));
    }

    #[test]
    fn deserializes_from_camel_case_json() {
        let config: ScalerConfig = serde_json::from_str(
            r#"{
                "triggerMetadata": {"query": "SELECT 1", "queryValue": "5"},
                "authParams": {"connectionString": "u:p@tcp(h:3306)/db"},
                "scalerIndex": 2,
                "metricType": "Value"
            }"#,
        )
        .unwrap();
        assert_eq!(config.metadata("queryValue"), Some("5"));
        assert_eq!(config.auth("connectionString"), Some("u:p@tcp(h:3306)/db"));
        assert!(config.resolved_env.is_empty());
        assert_eq!(config.scaler_index, 2);
        assert_eq!(config.metric_type.as_deref(), Some("Value"));
    }
}
