//! MySqlMetadata — trigger configuration parsing.
//!
//! Resolves a [`ScalerConfig`] into the typed descriptor the scaler runs
//! on. Resolution is pure and completes before any connection is attempted.
//!
//! # Locator precedence
//!
//! ```text
//! auth_params.connectionString            → Explicit (verbatim)
//! else metadata.connectionStringFromEnv   → Explicit (via resolved env)
//! else host/port/username/dbName          → Structured (auth first, then metadata)
//!      + password (auth, else metadata.passwordFromEnv)
//! ```
//!
//! The password check only runs for the structured form; an explicit
//! locator may carry its own credentials.

use std::fmt;

use warpgrid_scaler::{
    ConfigError, ScalerConfig, generate_metric_name_with_index, get_from_auth_or_meta,
    normalize_string,
};

/// Database name used in the metric name when none can be parsed from an
/// explicit locator.
pub const DEFAULT_DB_NAME: &str = "dbname";

const METRIC_PREFIX: &str = "mysql";

/// Host, port, credentials and database for building a DSN.
#[derive(Clone, PartialEq, Eq)]
pub struct StructuredLocator {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub db_name: String,
}

impl StructuredLocator {
    /// Render as a driver DSN: `user:password@tcp(host:port)/dbName`.
    pub fn to_dsn(&self) -> String {
        format!(
            "{}:{}@tcp({}:{})/{}",
            self.username, self.password, self.host, self.port, self.db_name
        )
    }
}

impl fmt::Debug for StructuredLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredLocator")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("db_name", &self.db_name)
            .finish()
    }
}

/// How to reach the database. Exactly one form is active per trigger.
#[derive(Clone, PartialEq, Eq)]
pub enum Locator {
    /// Pre-formed connection string (DSN or `mysql://` URL), used as-is.
    Explicit(String),
    /// Individual fields, formatted into a DSN on connect.
    Structured(StructuredLocator),
}

impl Locator {
    /// The connection string handed to the driver.
    pub fn connection_string(&self) -> String {
        match self {
            Locator::Explicit(s) => s.clone(),
            Locator::Structured(s) => s.to_dsn(),
        }
    }

    /// The connection string with its password masked, for logging.
    pub fn redacted(&self) -> String {
        redact_password(&self.connection_string())
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Explicit(_) => f
                .debug_tuple("Explicit")
                .field(&self.redacted())
                .finish(),
            Locator::Structured(s) => f.debug_tuple("Structured").field(s).finish(),
        }
    }
}

/// Mask the password in `user:password@…` or `scheme://user:password@…`.
fn redact_password(conn: &str) -> String {
    let start = conn.find("://").map_or(0, |i| i + 3);
    let rest = &conn[start..];
    let path_start = rest.rfind('/').unwrap_or(rest.len());
    let Some(at) = rest[..path_start].rfind('@') else {
        return conn.to_string();
    };
    match rest[..at].split_once(':') {
        Some((user, _)) => format!("{}{user}:***{}", &conn[..start], &rest[at..]),
        None => conn.to_string(),
    }
}

/// Parsed MySQL trigger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlMetadata {
    /// Query returning one row with one integer column.
    pub query: String,
    /// Target value for the metric.
    pub query_value: i64,
    /// Connection locator.
    pub locator: Locator,
    /// Database name used for the metric name.
    pub db_name: String,
    /// Metric name, unique per trigger index.
    pub metric_name: String,
}

/// Parse the trigger configuration into [`MySqlMetadata`].
pub fn parse_mysql_metadata(config: &ScalerConfig) -> Result<MySqlMetadata, ConfigError> {
    let query = config
        .metadata("query")
        .ok_or(ConfigError::Missing("query"))?
        .to_string();

    let query_value = config
        .trigger_metadata
        .get("queryValue")
        .ok_or(ConfigError::Missing("queryValue"))?
        .parse::<i64>()
        .map_err(|source| ConfigError::InvalidInteger {
            field: "queryValue",
            source,
        })?;

    let locator = if let Some(conn) = config.auth("connectionString") {
        Locator::Explicit(conn.to_string())
    } else if let Some(conn) = config.resolve_env("connectionStringFromEnv")? {
        Locator::Explicit(conn.to_string())
    } else {
        Locator::Structured(parse_structured_locator(config)?)
    };

    let db_name = match &locator {
        Locator::Explicit(conn) => parse_db_name(conn),
        Locator::Structured(s) => s.db_name.clone(),
    };

    let metric_name = generate_metric_name_with_index(
        config.scaler_index,
        &normalize_string(&format!("{METRIC_PREFIX}-{db_name}")),
    );

    Ok(MySqlMetadata {
        query,
        query_value,
        locator,
        db_name,
        metric_name,
    })
}

fn parse_structured_locator(config: &ScalerConfig) -> Result<StructuredLocator, ConfigError> {
    let host = get_from_auth_or_meta(config, "host")?.to_string();
    let port = get_from_auth_or_meta(config, "port")?
        .parse::<u16>()
        .map_err(|source| ConfigError::InvalidInteger {
            field: "port",
            source,
        })?;
    let username = get_from_auth_or_meta(config, "username")?.to_string();
    let db_name = get_from_auth_or_meta(config, "dbName")?.to_string();

    let password = match config.auth("password") {
        Some(p) => Some(p),
        None => config.resolve_env("passwordFromEnv").ok().flatten(),
    }
    .ok_or(ConfigError::Missing("password"))?
    .to_string();

    Ok(StructuredLocator {
        host,
        port,
        username,
        password,
        db_name,
    })
}

/// Database name from a connection string: its last `/`-separated segment,
/// or [`DEFAULT_DB_NAME`] when there is none.
pub fn parse_db_name(connection_string: &str) -> String {
    match connection_string.rsplit_once('/') {
        Some((_, db)) if !db.is_empty() => db.to_string(),
        _ => DEFAULT_DB_NAME.to_string(),
    }
}
