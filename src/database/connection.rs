//! The contract between the executor and whatever hands out connections.
//!
//! `PoolGateway` is the PostgreSQL implementation; tests plug in their own.

use async_trait::async_trait;
use serde::Serialize;

use super::error::{DatabaseError, StoreError};
use crate::filter::{CompiledStatement, Row};

/// A connection leased exclusively to one in-flight operation.
#[async_trait]
pub trait Connection: Send {
    /// Unique per lease, for logs and tests
    fn lease_id(&self) -> u64;

    async fn fetch_all(&mut self, statement: &CompiledStatement) -> Result<Vec<Row>, StoreError>;

    async fn begin(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ConnectionSource: Send + Sync + 'static {
    type Conn: Connection + 'static;

    /// Errors are surfaced as-is; this layer never retries.
    async fn acquire(&self) -> Result<Self::Conn, DatabaseError>;

    async fn release(&self, conn: Self::Conn) {
        drop(conn);
    }

    async fn health_check(&self) -> PoolHealth;

    /// Stop handing out connections and wait for outstanding leases.
    async fn shutdown(&self);
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
    pub acquired: u64,
    pub released: u64,
    pub exhausted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    pub healthy: bool,
    pub stats: PoolStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Rows returned by a statement together with their count
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    pub rows: Vec<Row>,
    pub count: usize,
}

impl RowSet {
    pub fn new(rows: Vec<Row>) -> Self {
        let count = rows.len();
        Self { rows, count }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
