//! In-memory stand-ins for the MySQL connection, shared by the scaler tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;

use warpgrid_scaler::{ConnectionError, ScalerConfig};
use warpgrid_scaler_mysql::{Cell, Connector, DbHandle, Locator};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output, controlled by `RUST_LOG`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Behaviour and call counters shared between a fake connector and its handles.
#[derive(Debug, Default)]
pub struct FakeState {
    /// Value returned by every successful query.
    pub value: AtomicI64,
    /// Fail the next query.
    pub fail_next: AtomicBool,
    /// Block the next query until the caller gives up on it.
    pub hang_next: AtomicBool,
    pub ping_fails: AtomicBool,
    pub close_fails: AtomicBool,
    pub queries: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeState {
    pub fn returning(value: i64) -> Arc<Self> {
        let state = Self::default();
        state.value.store(value, Ordering::SeqCst);
        Arc::new(state)
    }
}

#[derive(Debug)]
pub struct FakeDb(pub Arc<FakeState>);

#[async_trait]
impl DbHandle for FakeDb {
    async fn ping(&self) -> anyhow::Result<()> {
        if self.0.ping_fails.load(Ordering::SeqCst) {
            anyhow::bail!("dial tcp 10.0.0.1:3306: connect: connection refused");
        }
        Ok(())
    }

    async fn query_row(&self, _query: &str) -> anyhow::Result<Option<Vec<Cell>>> {
        self.0.queries.fetch_add(1, Ordering::SeqCst);
        if self.0.hang_next.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.0.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("Error 1146: Table 'app.q' doesn't exist");
        }
        Ok(Some(vec![Cell::Int(self.0.value.load(Ordering::SeqCst))]))
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        if self.0.close_fails.load(Ordering::SeqCst) {
            anyhow::bail!("sql: database is closed");
        }
        Ok(())
    }
}

/// Connector that hands out [`FakeDb`] handles and records every attempt.
#[derive(Debug)]
pub struct FakeConnector {
    pub state: Arc<FakeState>,
    pub opens: AtomicUsize,
    pub last_locator: Mutex<Option<Locator>>,
}

impl FakeConnector {
    pub fn new(state: Arc<FakeState>) -> Self {
        Self {
            state,
            opens: AtomicUsize::new(0),
            last_locator: Mutex::new(None),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn last_locator(&self) -> Option<Locator> {
        self.last_locator.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, locator: &Locator) -> Result<Box<dyn DbHandle>, ConnectionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_locator.lock().unwrap() = Some(locator.clone());
        Ok(Box::new(FakeDb(Arc::clone(&self.state))))
    }
}

/// The structured configuration from the end-to-end scenario.
pub fn structured_config() -> ScalerConfig {
    ScalerConfig::new()
        .with_metadata("query", "SELECT count(*) FROM q")
        .with_metadata("queryValue", "5")
        .with_metadata("host", "h")
        .with_metadata("port", "3306")
        .with_metadata("username", "u")
        .with_metadata("dbName", "d")
        .with_auth("password", "p")
}
