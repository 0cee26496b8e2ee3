//! The `Scaler` trait implemented by every trigger kind.

use async_trait::async_trait;

use crate::context::EvalContext;
use crate::error::{QueryError, ScalerError};
use crate::metric::{ExternalMetricValue, MetricSpec};

/// A constructed trigger, polled by the autoscaler on a fixed cadence.
///
/// Implementations must tolerate concurrent calls: the autoscaler may poll
/// activity and metrics for the same trigger at the same time. Every call
/// performs its own fresh evaluation; nothing is cached between calls.
#[async_trait]
pub trait Scaler: Send + Sync {
    /// Whether the source reports any pending work. Drives scale from/to zero.
    async fn is_active(&self, ctx: &EvalContext) -> Result<bool, QueryError>;

    /// Metrics this scaler exposes and their targets. No I/O.
    fn metric_specs(&self) -> Vec<MetricSpec>;

    /// Fresh samples for `metric_name`.
    async fn metrics(
        &self,
        ctx: &EvalContext,
        metric_name: &str,
    ) -> Result<Vec<ExternalMetricValue>, QueryError>;

    /// Release the scaler's connection. Later calls to `close` are no-ops.
    async fn close(&self, ctx: &EvalContext) -> Result<(), ScalerError>;
}
