#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use carelink_api::access::AccessPolicy;
use carelink_api::database::{
    Connection, ConnectionSource, DatabaseError, DynamicRepository, PoolHealth, PoolStats, ResilientExecutor,
    RetryPolicy, StoreError, StoreErrorKind,
};
use carelink_api::filter::{CompiledStatement, Row};
use carelink_api::services::TableService;

/// Everything the fake store saw, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Acquire(u64),
    Query { lease: u64, sql: String, params: Vec<Value> },
    Begin(u64),
    Commit(u64),
    Rollback(u64),
    Closed { lease: u64, in_transaction: bool },
}

/// Scripted outcome of the next `fetch_all`
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(Vec<Row>),
    Fail(StoreError),
    /// Never completes; used to exercise cancellation
    Hang,
}

#[derive(Default)]
struct State {
    next_lease: u64,
    replies: VecDeque<Reply>,
    acquire_errors: VecDeque<DatabaseError>,
    events: Vec<Event>,
    unhealthy: bool,
    closed: bool,
}

/// In-memory connection source. Hands out numbered leases and records every
/// call so tests can assert on the exact statements sent.
#[derive(Default)]
pub struct MemorySource {
    state: Arc<Mutex<State>>,
}

impl MemorySource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn reply(&self, reply: Reply) -> &Self {
        self.lock().replies.push_back(reply);
        self
    }

    pub fn reply_rows(&self, rows: Vec<Row>) -> &Self {
        self.reply(Reply::Rows(rows))
    }

    pub fn fail_with(&self, kind: StoreErrorKind) -> &Self {
        self.reply(Reply::Fail(StoreError::new(kind, format!("scripted {}", kind.code()))))
    }

    pub fn fail_acquire(&self, err: DatabaseError) -> &Self {
        self.lock().acquire_errors.push_back(err);
        self
    }

    pub fn set_unhealthy(&self) {
        self.lock().unhealthy = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// SQL text of every query, in order
    pub fn queries(&self) -> Vec<String> {
        self.statements().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Query { sql, params, .. } => Some((sql.clone(), params.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn leases(&self) -> Vec<u64> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Acquire(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

pub struct MemoryConn {
    state: Arc<Mutex<State>>,
    lease_id: u64,
    in_transaction: bool,
}

impl MemoryConn {
    fn record(&self, event: Event) {
        self.state.lock().unwrap().events.push(event);
    }
}

impl Drop for MemoryConn {
    fn drop(&mut self) {
        let event = Event::Closed { lease: self.lease_id, in_transaction: self.in_transaction };
        if let Ok(mut state) = self.state.lock() {
            state.events.push(event);
        }
    }
}

#[async_trait]
impl Connection for MemoryConn {
    fn lease_id(&self) -> u64 {
        self.lease_id
    }

    async fn fetch_all(&mut self, statement: &CompiledStatement) -> Result<Vec<Row>, StoreError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.events.push(Event::Query {
                lease: self.lease_id,
                sql: statement.sql.clone(),
                params: statement.params.clone(),
            });
            state.replies.pop_front().unwrap_or(Reply::Rows(vec![]))
        };
        match reply {
            Reply::Rows(rows) => Ok(rows),
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        self.record(Event::Begin(self.lease_id));
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.record(Event::Commit(self.lease_id));
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.record(Event::Rollback(self.lease_id));
        self.in_transaction = false;
        Ok(())
    }
}

#[async_trait]
impl ConnectionSource for MemorySource {
    type Conn = MemoryConn;

    async fn acquire(&self) -> Result<MemoryConn, DatabaseError> {
        let mut state = self.lock();
        if state.closed {
            return Err(DatabaseError::PoolClosed);
        }
        if let Some(err) = state.acquire_errors.pop_front() {
            return Err(err);
        }
        state.next_lease += 1;
        let lease_id = state.next_lease;
        state.events.push(Event::Acquire(lease_id));
        Ok(MemoryConn { state: Arc::clone(&self.state), lease_id, in_transaction: false })
    }

    async fn health_check(&self) -> PoolHealth {
        let state = self.lock();
        PoolHealth {
            healthy: !state.unhealthy,
            stats: PoolStats { max_connections: 4, acquired: state.next_lease, ..PoolStats::default() },
            error: state.unhealthy.then(|| "scripted outage".to_string()),
        }
    }

    async fn shutdown(&self) {
        self.lock().closed = true;
    }
}

/// Retry policy with millisecond backoff so retry tests stay fast
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    }
}

pub fn executor(source: &Arc<MemorySource>, max_attempts: u32) -> ResilientExecutor<MemorySource> {
    ResilientExecutor::new(Arc::clone(source), fast_policy(max_attempts))
}

pub fn table_service(source: &Arc<MemorySource>) -> TableService<MemorySource> {
    let repository = DynamicRepository::new(executor(source, 3)).with_max_limit(Some(1000));
    TableService::new(AccessPolicy::default().with_audit_logging(true), repository)
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}
