//! warpgrid-scaler — the contract between the autoscaler and its triggers.
//!
//! A trigger ("scaler") turns an external data source into a single
//! scaling signal. The autoscaler builds one scaler per configured trigger
//! and polls it on a fixed cadence:
//!
//! ```text
//! ScalerConfig (metadata, auth params, resolved env, index, metric type)
//!   → construct scaler (fails fast on bad config / unreachable source)
//!     → is_active(ctx)          "is there any work at all?"  (scale from/to zero)
//!     → metric_specs()          metric name + target for replica sizing
//!     → metrics(ctx, name)      fresh timestamped sample
//!     → close(ctx)              release the connection on teardown
//! ```
//!
//! This crate holds the pieces every trigger kind shares: the config bag and
//! its lookup helpers, the cancellable [`EvalContext`], the external metric
//! types, the [`Scaler`] trait, and the error taxonomy.

pub mod config;
pub mod context;
pub mod error;
pub mod metric;
pub mod scaler;

pub use config::{ScalerConfig, get_from_auth_or_meta, resolve_metric_target_type};
pub use context::{EvalContext, Interrupted};
pub use error::{ConfigError, ConnectionError, QueryError, ScalerError};
pub use metric::{
    ExternalMetricValue, MetricSpec, MetricTarget, MetricTargetType,
    generate_metric_name_with_index, metric_target, normalize_string,
};
pub use scaler::Scaler;
