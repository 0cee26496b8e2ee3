//! Activity classification.

/// Whether a query result means there is work to do.
///
/// Strictly positive only; zero and negative results are inactive.
pub fn is_active_value(value: i64) -> bool {
    value > 0
}
