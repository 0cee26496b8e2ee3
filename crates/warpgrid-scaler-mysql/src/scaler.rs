//! MySqlScaler — the MySQL trigger.
//!
//! Built once per trigger. Construction parses the configuration, then
//! opens and probes the connection; either step failing aborts
//! construction. Afterwards every `is_active` / `metrics` call runs the
//! query afresh against the shared pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{Instrument, Span, debug, error, field, info, info_span, warn};

use warpgrid_scaler::{
    EvalContext, ExternalMetricValue, MetricSpec, MetricTargetType, QueryError, Scaler,
    ScalerConfig, ScalerError, metric_target, resolve_metric_target_type,
};

use crate::activity::is_active_value;
use crate::connection::{Connector, DbHandle, MySqlConnector, establish};
use crate::metadata::{MySqlMetadata, parse_mysql_metadata};
use crate::query;

/// Scales on the integer result of a MySQL query.
#[derive(Debug)]
pub struct MySqlScaler {
    metric_type: MetricTargetType,
    metadata: MySqlMetadata,
    connection: Arc<dyn DbHandle>,
    closed: AtomicBool,
    /// Carries the trigger index and metric name on every log line.
    span: Span,
}

impl MySqlScaler {
    /// Construct a scaler backed by an `sqlx` pool with default sizing.
    pub async fn new(config: &ScalerConfig, ctx: &EvalContext) -> Result<Self, ScalerError> {
        Self::with_connector(config, &MySqlConnector::default(), ctx).await
    }

    /// Construct a scaler whose connection is opened by `connector`.
    ///
    /// No connection is attempted unless the configuration is valid.
    pub async fn with_connector(
        config: &ScalerConfig,
        connector: &dyn Connector,
        ctx: &EvalContext,
    ) -> Result<Self, ScalerError> {
        let span = info_span!(
            "mysql_scaler",
            index = config.scaler_index,
            metric = field::Empty
        );

        let (metric_type, metadata) = {
            let _guard = span.enter();
            let metric_type = resolve_metric_target_type(config).inspect_err(|e| {
                error!(error = %e, "error getting scaler metric type");
            })?;
            let metadata = parse_mysql_metadata(config).inspect_err(|e| {
                error!(error = %e, "error parsing mysql metadata");
            })?;
            (metric_type, metadata)
        };
        span.record("metric", metadata.metric_name.as_str());

        let connection = establish(&metadata, connector, ctx)
            .instrument(span.clone())
            .await?;

        Ok(Self {
            metric_type,
            metadata,
            connection,
            closed: AtomicBool::new(false),
            span,
        })
    }

    pub fn metadata(&self) -> &MySqlMetadata {
        &self.metadata
    }

    pub fn metric_type(&self) -> MetricTargetType {
        self.metric_type
    }

    async fn query_result(&self, ctx: &EvalContext) -> Result<i64, QueryError> {
        if self.closed.load(Ordering::Acquire) {
            warn!(parent: &self.span, "mysql query attempted after connection was closed");
            return Err(QueryError::Closed);
        }
        query::evaluate(self.connection.as_ref(), &self.metadata.query, ctx)
            .instrument(self.span.clone())
            .await
    }
}

#[async_trait]
impl Scaler for MySqlScaler {
    async fn is_active(&self, ctx: &EvalContext) -> Result<bool, QueryError> {
        let value = self.query_result(ctx).await?;
        Ok(is_active_value(value))
    }

    fn metric_specs(&self) -> Vec<MetricSpec> {
        vec![MetricSpec {
            metric_name: self.metadata.metric_name.clone(),
            target: metric_target(self.metric_type, self.metadata.query_value),
        }]
    }

    async fn metrics(
        &self,
        ctx: &EvalContext,
        metric_name: &str,
    ) -> Result<Vec<ExternalMetricValue>, QueryError> {
        let value = self.query_result(ctx).await?;
        Ok(vec![ExternalMetricValue::now(metric_name, value)])
    }

    async fn close(&self, ctx: &EvalContext) -> Result<(), ScalerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!(parent: &self.span, "mysql connection already closed");
            return Ok(());
        }

        match ctx
            .run(self.connection.close())
            .instrument(self.span.clone())
            .await
        {
            Ok(Ok(())) => {
                info!(parent: &self.span, "mysql connection closed");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(parent: &self.span, error = %e, "error closing mysql connection");
                Err(ScalerError::Close(e))
            }
            Err(interrupted) => {
                // Interrupted before the pool finished closing; allow a retry.
                self.closed.store(false, Ordering::Release);
                warn!(
                    parent: &self.span,
                    reason = %interrupted,
                    "closing mysql connection interrupted"
                );
                Err(ScalerError::Close(interrupted.into()))
            }
        }
    }
}
