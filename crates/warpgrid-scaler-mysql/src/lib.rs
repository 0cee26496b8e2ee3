//! warpgrid-scaler-mysql — scale workloads on the result of a MySQL query.
//!
//! The trigger runs a user-supplied query that returns one integer (a queue
//! depth, a count of pending rows, ...). The autoscaler compares it with
//! the configured `queryValue` to size the workload and scales to zero
//! when the result is not positive.
//!
//! - **metadata**: configuration resolution into [`MySqlMetadata`]
//! - **connection**: locator parsing, `sqlx` pool, liveness probe
//! - **query**: query execution and integer coercion
//! - **activity**: the `> 0` activity predicate
//! - **scaler**: [`MySqlScaler`], the [`warpgrid_scaler::Scaler`] implementation
//!
//! # Trigger metadata
//!
//! | key | source | notes |
//! |-----|--------|-------|
//! | `query` | metadata | required |
//! | `queryValue` | metadata | required, base-10 integer |
//! | `connectionString` | auth | DSN or `mysql://` URL; wins over everything else |
//! | `connectionStringFromEnv` | metadata | env var holding the connection string |
//! | `host`, `port`, `username`, `dbName` | auth or metadata | used when no connection string is set |
//! | `password` / `passwordFromEnv` | auth / metadata | required with the fields above |

pub mod activity;
pub mod connection;
pub mod metadata;
pub mod query;
pub mod scaler;

pub use connection::{Cell, Connector, DbHandle, MySqlConnector, PoolConfig};
pub use metadata::{Locator, MySqlMetadata, StructuredLocator, parse_db_name, parse_mysql_metadata};
pub use scaler::MySqlScaler;
