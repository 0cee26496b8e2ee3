//! Error types for scaler construction and evaluation.
//!
//! Configuration and connection errors are fatal to construction; the
//! autoscaler may retry construction later. Query errors are per call and
//! leave the scaler usable.

use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;

use crate::context::Interrupted;

/// Invalid or incomplete trigger configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {0} given")]
    Missing(&'static str),

    #[error("{field} parsing error: {source}")]
    InvalidInteger {
        field: &'static str,
        #[source]
        source: ParseIntError,
    },

    #[error("environment variable {var} (from {field}) is not set")]
    EnvNotSet { field: &'static str, var: String },

    #[error("'{0}' metric type is unsupported for external metrics, allowed values are 'Value' or 'AverageValue'")]
    UnsupportedMetricType(String),

    #[error("unknown metric type: {0}")]
    UnknownMetricType(String),
}

/// The data source could not be reached or failed its liveness probe.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid connection locator: {0}")]
    InvalidLocator(String),

    #[error("error opening connection: {0}")]
    Open(#[source] anyhow::Error),

    #[error("error pinging database: {0}")]
    Probe(#[source] anyhow::Error),

    #[error("connection attempt cancelled")]
    Cancelled,

    #[error("connection attempt timed out")]
    TimedOut,
}

/// A single evaluation failed. The scaler remains usable.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query execution failed: {0}")]
    Execution(#[source] anyhow::Error),

    #[error("unexpected query result: {0}")]
    ResultShape(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("query timed out after {0:?}")]
    TimedOut(Duration),

    #[error("connection is closed")]
    Closed,
}

/// Top-level error returned from scaler construction and teardown.
#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("error parsing scaler metadata: {0}")]
    Config(#[from] ConfigError),

    #[error("error establishing connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("error closing connection: {0}")]
    Close(#[source] anyhow::Error),
}

impl From<Interrupted> for ConnectionError {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => ConnectionError::Cancelled,
            Interrupted::DeadlineExceeded(_) => ConnectionError::TimedOut,
        }
    }
}

impl From<Interrupted> for QueryError {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => QueryError::Cancelled,
            Interrupted::DeadlineExceeded(budget) => QueryError::TimedOut(budget),
        }
    }
}
