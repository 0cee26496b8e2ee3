//! Query evaluation — run the trigger query and coerce the result to `i64`.

use tracing::{error, warn};

use warpgrid_scaler::{EvalContext, QueryError};

use crate::connection::{Cell, DbHandle};

/// Execute `query` and return its single integer result.
///
/// The first row must have exactly one column that coerces to `i64`;
/// further rows are ignored. Cancellation or the context deadline drops
/// the in-flight query and leaves `handle` usable.
pub async fn evaluate(
    handle: &dyn DbHandle,
    query: &str,
    ctx: &EvalContext,
) -> Result<i64, QueryError> {
    let row = match ctx.run(handle.query_row(query)).await {
        Ok(Ok(row)) => row,
        Ok(Err(e)) => {
            error!(error = %e, "could not query mysql database");
            return Err(QueryError::Execution(e));
        }
        Err(interrupted) => {
            warn!(reason = %interrupted, "mysql query interrupted");
            return Err(interrupted.into());
        }
    };

    scalar_from_row(row).inspect_err(|e| {
        error!(error = %e, "mysql query returned an unusable result");
    })
}

/// Coerce a result row into one `i64`.
pub fn scalar_from_row(row: Option<Vec<Cell>>) -> Result<i64, QueryError> {
    let cells = row.ok_or_else(|| QueryError::ResultShape("query returned no rows".to_string()))?;
    let [cell] = cells.as_slice() else {
        return Err(QueryError::ResultShape(format!(
            "expected 1 column, got {}",
            cells.len()
        )));
    };
    coerce(cell)
}

fn coerce(cell: &Cell) -> Result<i64, QueryError> {
    match cell {
        Cell::Int(v) => Ok(*v),
        Cell::UInt(v) => i64::try_from(*v)
            .map_err(|_| QueryError::ResultShape(format!("{v} overflows i64"))),
        Cell::Float(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
            Ok(*v as i64)
        }
        Cell::Float(v) => Err(QueryError::ResultShape(format!("{v} is not an integer"))),
        Cell::Text(s) => s
            .parse::<i64>()
            .map_err(|e| QueryError::ResultShape(format!("{s:?} is not an integer: {e}"))),
        Cell::Null => Err(QueryError::ResultShape("value is NULL".to_string())),
    }
}
