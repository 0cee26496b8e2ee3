//! Connection management — locator parsing, pool creation, liveness probe.
//!
//! The scaler talks to the database through the [`DbHandle`] trait so
//! tests can substitute a fake; [`MySqlConnector`] provides the real
//! implementation on top of an `sqlx` pool.
//!
//! # Establishment
//!
//! ```text
//! establish(metadata, connector, ctx)
//!   → connector.open(locator)      lazy pool, no I/O guarantee
//!   → handle.ping()                acquire + round-trip
//!       ok   → shared handle, reused by every evaluation
//!       fail → handle.close(), ConnectionError::Probe
//! ```
//!
//! Explicit locators may be `mysql://` / `mariadb://` URLs or driver DSNs:
//!
//! ```text
//! [user[:password]@][net[(addr)]]/dbname[?param=value&...]
//! ```
//!
//! `net` is `tcp` (default `127.0.0.1:3306`) or `unix`. The `tls` and
//! `charset` parameters are honoured; other parameters are ignored.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Connection as _, Row, ValueRef};
use tracing::{debug, error, info, warn};

use warpgrid_scaler::{ConnectionError, EvalContext};

use crate::metadata::{Locator, MySqlMetadata};

/// Default MySQL port when a DSN address omits it.
const DEFAULT_PORT: u16 = 3306;

/// One column value of a result row, as read from the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

/// A live, internally synchronized handle to the database.
///
/// Shared by every evaluation of a scaler; implementations must allow
/// concurrent calls.
#[async_trait]
pub trait DbHandle: Send + Sync + std::fmt::Debug {
    /// Round-trip to confirm the database is reachable.
    async fn ping(&self) -> anyhow::Result<()>;
    /// Run `query` and return the cells of its first row, or `None` if it
    /// returned no rows.
    async fn query_row(&self, query: &str) -> anyhow::Result<Option<Vec<Cell>>>;
    /// Release all pooled connections.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Opens handles for a locator — injected for testability.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a handle. Need not perform I/O; liveness is probed separately.
    async fn open(&self, locator: &Locator) -> Result<Box<dyn DbHandle>, ConnectionError>;
}

/// Sizing for the per-scaler connection pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Maximum open connections (default: 10).
    pub max_connections: u32,
    /// Maximum time to wait for a pooled connection (default: 5s).
    pub acquire_timeout: Duration,
    /// Idle connections older than this are closed (default: 300s).
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Open the handle for `metadata` and probe it.
///
/// This is the only setup I/O a scaler performs. The probe failing closes
/// whatever was opened.
pub async fn establish(
    metadata: &MySqlMetadata,
    connector: &dyn Connector,
    ctx: &EvalContext,
) -> Result<Arc<dyn DbHandle>, ConnectionError> {
    let target = metadata.locator.redacted();
    debug!(%target, "opening mysql connection");

    let handle = match ctx.run(connector.open(&metadata.locator)).await {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => {
            error!(error = %e, %target, "found error when opening connection");
            return Err(e);
        }
        Err(interrupted) => {
            warn!(reason = %interrupted, %target, "connection attempt interrupted");
            return Err(interrupted.into());
        }
    };

    let err = match ctx.run(handle.ping()).await {
        Ok(Ok(())) => {
            info!(%target, "mysql connection established");
            return Ok(Arc::from(handle));
        }
        Ok(Err(e)) => {
            error!(error = %e, %target, "found error when pinging database");
            ConnectionError::Probe(e)
        }
        Err(interrupted) => {
            warn!(reason = %interrupted, %target, "liveness probe interrupted");
            interrupted.into()
        }
    };

    if let Err(e) = handle.close().await {
        warn!(error = %e, %target, "error closing connection after failed probe");
    }
    Err(err)
}

// ── MySqlConnector ───────────────────────────────────────────────────

/// [`Connector`] backed by an `sqlx` MySQL pool.
#[derive(Clone, Debug, Default)]
pub struct MySqlConnector {
    pool: PoolConfig,
}

impl MySqlConnector {
    pub fn new(pool: PoolConfig) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn open(&self, locator: &Locator) -> Result<Box<dyn DbHandle>, ConnectionError> {
        let options = connect_options(locator)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(self.pool.max_connections)
            .acquire_timeout(self.pool.acquire_timeout)
            .idle_timeout(self.pool.idle_timeout)
            .connect_lazy_with(options);
        Ok(Box::new(MySqlDatabase { pool }))
    }
}

/// [`DbHandle`] over an `sqlx` MySQL pool.
#[derive(Debug)]
pub struct MySqlDatabase {
    pool: MySqlPool,
}

#[async_trait]
impl DbHandle for MySqlDatabase {
    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn query_row(&self, query: &str) -> anyhow::Result<Option<Vec<Cell>>> {
        let Some(row) = sqlx::query(query).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let cells = (0..row.len())
            .map(|i| decode_cell(&row, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(cells))
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Read column `index` as the most specific [`Cell`] it decodes to.
fn decode_cell(row: &MySqlRow, index: usize) -> Result<Cell, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Cell::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(Cell::Int(v));
    }
    if let Ok(v) = row.try_get::<u64, _>(index) {
        return Ok(Cell::UInt(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(Cell::Float(v));
    }
    // DECIMAL and text columns arrive as strings on the wire.
    row.try_get_unchecked::<String, _>(index).map(Cell::Text)
}

// ── Locator parsing ──────────────────────────────────────────────────

/// Driver options for a locator.
pub fn connect_options(locator: &Locator) -> Result<MySqlConnectOptions, ConnectionError> {
    match locator {
        Locator::Structured(s) => Ok(MySqlConnectOptions::new()
            .host(&s.host)
            .port(s.port)
            .username(&s.username)
            .password(&s.password)
            .database(&s.db_name)),
        Locator::Explicit(conn) if is_url(conn) => MySqlConnectOptions::from_str(conn)
            .map_err(|e| ConnectionError::InvalidLocator(e.to_string())),
        Locator::Explicit(conn) => parse_dsn(conn)?.to_connect_options(),
    }
}

fn is_url(conn: &str) -> bool {
    conn.starts_with("mysql://") || conn.starts_with("mariadb://")
}

/// A parsed driver DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    pub user: String,
    pub password: Option<String>,
    pub net: String,
    pub addr: String,
    pub db_name: String,
    pub params: Vec<(String, String)>,
}

/// Parse `[user[:password]@][net[(addr)]]/dbname[?params]`.
pub fn parse_dsn(dsn: &str) -> Result<Dsn, ConnectionError> {
    let invalid = |reason: &str| ConnectionError::InvalidLocator(format!("{reason} in DSN"));

    // Credentials end at the last '@' before the final '/', so passwords
    // may contain '@' and parameter values cannot move the split.
    let path_start = dsn.rfind('/').unwrap_or(dsn.len());
    let (creds, rest) = match dsn[..path_start].rfind('@') {
        Some(i) => (Some(&dsn[..i]), &dsn[i + 1..]),
        None => (None, dsn),
    };
    let (user, password) = match creds {
        Some(c) => match c.split_once(':') {
            Some((u, p)) => (u.to_string(), Some(p.to_string())),
            None => (c.to_string(), None),
        },
        None => (String::new(), None),
    };

    let slash = rest.find('/').ok_or_else(|| invalid("missing '/'"))?;
    let (net, addr, path) = match rest.find('(') {
        Some(open) if open < slash => {
            let close = rest[open..]
                .find(')')
                .map(|i| open + i)
                .ok_or_else(|| invalid("unclosed '('"))?;
            let path = rest[close + 1..]
                .strip_prefix('/')
                .ok_or_else(|| invalid("missing '/' after address"))?;
            (&rest[..open], &rest[open + 1..close], path)
        }
        _ => (&rest[..slash], "", &rest[slash + 1..]),
    };

    let net = if net.is_empty() { "tcp" } else { net };
    let addr = match (net, addr) {
        ("tcp", "") => "127.0.0.1:3306",
        ("unix", "") => "/tmp/mysql.sock",
        ("tcp" | "unix", a) => a,
        (other, _) => {
            return Err(ConnectionError::InvalidLocator(format!(
                "unsupported network {other:?} in DSN"
            )));
        }
    };

    let (db_name, query) = path.split_once('?').unwrap_or((path, ""));
    let params = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (k.to_string(), v.to_string())
        })
        .collect();

    Ok(Dsn {
        user,
        password,
        net: net.to_string(),
        addr: addr.to_string(),
        db_name: db_name.to_string(),
        params,
    })
}

impl Dsn {
    /// Driver options for this DSN.
    pub fn to_connect_options(&self) -> Result<MySqlConnectOptions, ConnectionError> {
        let mut opts = MySqlConnectOptions::new();
        if !self.user.is_empty() {
            opts = opts.username(&self.user);
        }
        if let Some(password) = &self.password {
            opts = opts.password(password);
        }
        opts = if self.net == "unix" {
            opts.socket(&self.addr)
        } else {
            let (host, port) = split_host_port(&self.addr)?;
            opts.host(host).port(port)
        };
        if !self.db_name.is_empty() {
            opts = opts.database(&self.db_name);
        }
        for (key, value) in &self.params {
            match key.as_str() {
                "tls" => opts = opts.ssl_mode(tls_mode(value)?),
                "charset" => opts = opts.charset(value),
                _ => debug!(param = %key, "ignoring unsupported DSN parameter"),
            }
        }
        Ok(opts)
    }
}

fn split_host_port(addr: &str) -> Result<(&str, u16), ConnectionError> {
    if let Some(bracketed) = addr.strip_prefix('[') {
        let (host, rest) = bracketed.split_once(']').ok_or_else(|| {
            ConnectionError::InvalidLocator(format!("unclosed '[' in address {addr:?}"))
        })?;
        return match rest.strip_prefix(':') {
            Some(port) => Ok((host, parse_port(port)?)),
            None => Ok((host, DEFAULT_PORT)),
        };
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => Ok((host, parse_port(port)?)),
        None => Ok((addr, DEFAULT_PORT)),
    }
}

fn parse_port(port: &str) -> Result<u16, ConnectionError> {
    port.parse()
        .map_err(|_| ConnectionError::InvalidLocator(format!("invalid port {port:?}")))
}

fn tls_mode(value: &str) -> Result<MySqlSslMode, ConnectionError> {
    match value {
        "true" => Ok(MySqlSslMode::VerifyIdentity),
        "false" => Ok(MySqlSslMode::Disabled),
        "skip-verify" => Ok(MySqlSslMode::Required),
        "preferred" => Ok(MySqlSslMode::Preferred),
        other => Err(ConnectionError::InvalidLocator(format!(
            "unsupported tls mode {other:?}"
        ))),
    }
}
