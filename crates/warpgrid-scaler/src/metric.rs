//! External metric types exchanged with the autoscaler.
//!
//! A scaler declares one or more [`MetricSpec`]s (name + target) at setup
//! and answers [`ExternalMetricValue`] samples on every poll. The autoscaler
//! sizes replicas from `current / target`; that math lives outside this
//! crate.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// How the autoscaler interprets a metric target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MetricTargetType {
    /// Compare the raw metric value against the target.
    Value,
    /// Divide the metric value by the replica count before comparing (default).
    #[default]
    AverageValue,
    /// Percentage of requested resources. Not valid for external metrics.
    Utilization,
}

impl fmt::Display for MetricTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricTargetType::Value => write!(f, "Value"),
            MetricTargetType::AverageValue => write!(f, "AverageValue"),
            MetricTargetType::Utilization => write!(f, "Utilization"),
        }
    }
}

/// Target for a single external metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTarget {
    #[serde(rename = "type")]
    pub target_type: MetricTargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_value: Option<i64>,
}

/// Declaration of one external metric the autoscaler should track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSpec {
    pub metric_name: String,
    pub target: MetricTarget,
}

/// A single timestamped sample of an external metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetricValue {
    pub metric_name: String,
    pub value: i64,
    pub timestamp: SystemTime,
}

impl ExternalMetricValue {
    /// Sample `value` under `metric_name`, stamped with the current time.
    pub fn now(metric_name: impl Into<String>, value: i64) -> Self {
        Self {
            metric_name: metric_name.into(),
            value,
            timestamp: SystemTime::now(),
        }
    }
}

/// Build the target for `threshold` under the given target type.
///
/// `Value` sets `value`; every other type sets `average_value`.
pub fn metric_target(target_type: MetricTargetType, threshold: i64) -> MetricTarget {
    match target_type {
        MetricTargetType::Value => MetricTarget {
            target_type,
            value: Some(threshold),
            average_value: None,
        },
        _ => MetricTarget {
            target_type,
            value: None,
            average_value: Some(threshold),
        },
    }
}

/// Lower-case `s` and replace everything outside `[a-z0-9-]` with `-`.
pub fn normalize_string(s: &str) -> String {
    s.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Prefix a metric name with the trigger's ordinal index (`s0-…`, `s1-…`)
/// so triggers pointed at the same source never collide.
pub fn generate_metric_name_with_index(index: usize, metric_name: &str) -> String {
    format!("s{index}-{metric_name}")
}
