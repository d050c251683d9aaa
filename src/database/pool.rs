use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use tracing::{debug, info, warn};

use super::connection::{Connection, ConnectionSource, PoolHealth, PoolStats};
use super::error::{DatabaseError, StoreError, StoreErrorKind};
use super::row::{bind_param, row_to_json};
use crate::filter::{CompiledStatement, Row};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

#[derive(Debug, Default)]
struct PoolCounters {
    next_lease: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
    exhausted: AtomicU64,
}

/// Owns the bounded PostgreSQL pool. Constructed explicitly and passed
/// around; there is no process-wide instance.
#[derive(Clone)]
pub struct PoolGateway {
    pool: PgPool,
    max_connections: u32,
    counters: Arc<PoolCounters>,
}

impl PoolGateway {
    /// Build the pool. Connections are opened lazily, so the gateway can come
    /// up before the database does and report itself unhealthy meanwhile.
    pub fn open(config: &PoolConfig) -> Result<Self, DatabaseError> {
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        let statement_timeout_ms = config.statement_timeout.as_millis().to_string();
        let connect_options = PgConnectOptions::from_str(&config.url)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?
            .options([("statement_timeout", statement_timeout_ms.as_str())]);

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .idle_timeout(config.idle_timeout)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(connect_options);

        info!(
            "Opened database pool for {} (min={}, max={}, acquire_timeout={:?}, statement_timeout={:?})",
            redact_url(&config.url),
            config.min_connections,
            config.max_connections,
            config.acquire_timeout,
            config.statement_timeout
        );

        Ok(Self {
            pool,
            max_connections: config.max_connections,
            counters: Arc::new(PoolCounters::default()),
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max_connections: self.max_connections,
            acquired: self.counters.acquired.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            exhausted: self.counters.exhausted.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ConnectionSource for PoolGateway {
    type Conn = PgLease;

    async fn acquire(&self) -> Result<PgLease, DatabaseError> {
        let started = Instant::now();
        match self.pool.acquire().await {
            Ok(conn) => {
                let lease_id = self.counters.next_lease.fetch_add(1, Ordering::Relaxed) + 1;
                self.counters.acquired.fetch_add(1, Ordering::Relaxed);
                debug!(lease_id, waited_ms = started.elapsed().as_millis() as u64, "connection acquired");
                Ok(PgLease {
                    conn: Some(conn),
                    lease_id,
                    in_transaction: false,
                    counters: Arc::clone(&self.counters),
                })
            }
            Err(sqlx::Error::PoolTimedOut) => {
                self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
                let waited = started.elapsed();
                warn!("Connection pool exhausted after {:?}", waited);
                Err(DatabaseError::PoolExhausted { waited })
            }
            Err(sqlx::Error::PoolClosed) => Err(DatabaseError::PoolClosed),
            Err(e) => Err(DatabaseError::Store(e.into())),
        }
    }

    async fn health_check(&self) -> PoolHealth {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => PoolHealth { healthy: true, stats: self.stats(), error: None },
            Err(e) => PoolHealth { healthy: false, stats: self.stats(), error: Some(e.to_string()) },
        }
    }

    async fn shutdown(&self) {
        info!("Closing database pool ({} connections open)", self.pool.size());
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Exclusive lease on one pooled connection. Dropping the lease returns the
/// connection, unless a transaction is still open: then the connection is
/// detached and closed so the server rolls the transaction back.
pub struct PgLease {
    conn: Option<PoolConnection<Postgres>>,
    lease_id: u64,
    in_transaction: bool,
    counters: Arc<PoolCounters>,
}

impl PgLease {
    fn conn(&mut self) -> Result<&mut PoolConnection<Postgres>, StoreError> {
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::new(StoreErrorKind::ConnectionLost, "lease already released"))
    }

    async fn execute_raw(&mut self, sql: &'static str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        sqlx::query(sql).execute(&mut **conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Connection for PgLease {
    fn lease_id(&self) -> u64 {
        self.lease_id
    }

    async fn fetch_all(&mut self, statement: &CompiledStatement) -> Result<Vec<Row>, StoreError> {
        let conn = self.conn()?;
        let mut q = sqlx::query(&statement.sql);
        for (i, p) in statement.params.iter().enumerate() {
            q = bind_param(q, p, statement.param_type(i));
        }
        let rows = q.fetch_all(&mut **conn).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        self.execute_raw("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.execute_raw("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.execute_raw("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }
}

impl Drop for PgLease {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.in_transaction {
                warn!(lease_id = self.lease_id, "lease dropped inside a transaction, closing connection");
                drop(conn.detach());
            }
        }
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        debug!(lease_id = self.lease_id, "connection released");
    }
}

fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
