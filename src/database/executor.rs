//! Retry boundary around the connection source.
//!
//! Every attempt acquires its own connection inside the loop, so a connection
//! that failed is never reused. Transaction bodies are re-run from scratch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::connection::{Connection, ConnectionSource, RowSet};
use super::error::{DatabaseError, StoreError};
use crate::filter::CompiledStatement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    last_error: Option<StoreError>,
}

pub struct ResilientExecutor<S: ConnectionSource> {
    source: Arc<S>,
    policy: RetryPolicy,
    slow_query_threshold: Option<Duration>,
}

impl<S: ConnectionSource> Clone for ResilientExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            policy: self.policy,
            slow_query_threshold: self.slow_query_threshold,
        }
    }
}

impl<S: ConnectionSource> ResilientExecutor<S> {
    pub fn new(source: Arc<S>, policy: RetryPolicy) -> Self {
        Self { source, policy, slow_query_threshold: None }
    }

    pub fn with_slow_query_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Run one statement outside a transaction.
    pub async fn execute_statement(
        &self,
        statement: &CompiledStatement,
        max_attempts: u32,
    ) -> Result<RowSet, DatabaseError> {
        let max_attempts = max_attempts.max(1);
        let mut state = RetryState::default();

        loop {
            state.attempt += 1;
            let mut conn = self.source.acquire().await?;
            let lease_id = conn.lease_id();
            let started = Instant::now();

            let result = conn.fetch_all(statement).await;
            self.source.release(conn).await;
            self.note_duration(&statement.sql, started.elapsed());

            match result {
                Ok(rows) => {
                    debug!(lease_id, attempt = state.attempt, rows = rows.len(), "statement completed");
                    return Ok(RowSet::new(rows));
                }
                Err(err) => {
                    let delay = self.next_delay(&mut state, err, max_attempts)?;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Run `work` inside BEGIN/COMMIT on a freshly acquired connection,
    /// retrying the whole body on transient failures. A failed body is rolled
    /// back before its error is classified.
    pub async fn execute_transaction<T, F>(&self, max_attempts: u32, mut work: F) -> Result<T, DatabaseError>
    where
        T: Send,
        F: for<'c> FnMut(&'c mut S::Conn) -> BoxFuture<'c, Result<T, DatabaseError>> + Send,
    {
        let max_attempts = max_attempts.max(1);
        let mut state = RetryState::default();

        loop {
            state.attempt += 1;
            let mut conn = self.source.acquire().await?;
            let lease_id = conn.lease_id();
            let started = Instant::now();

            let outcome = run_transaction(&mut conn, &mut work).await;
            self.source.release(conn).await;
            self.note_duration("transaction", started.elapsed());

            match outcome {
                Ok(value) => {
                    debug!(lease_id, attempt = state.attempt, "transaction committed");
                    return Ok(value);
                }
                Err(DatabaseError::Store(err)) => {
                    let delay = self.next_delay(&mut state, err, max_attempts)?;
                    tokio::time::sleep(delay).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Decide whether a failed attempt gets another try, and how long to wait.
    fn next_delay(&self, state: &mut RetryState, err: StoreError, max_attempts: u32) -> Result<Duration, DatabaseError> {
        if !err.is_transient() {
            return Err(DatabaseError::Store(err));
        }
        if state.attempt >= max_attempts {
            if let Some(previous) = state.last_error.take() {
                debug!("Previous attempt failed with {}", previous.kind.code());
            }
            warn!("Giving up after {} attempts: {} ({})", state.attempt, err, err.kind.code());
            return Err(DatabaseError::RetriesExhausted { attempts: state.attempt, last: err });
        }

        let delay = self.policy.backoff(state.attempt);
        warn!(
            "Transient store error on attempt {}/{}: {} ({}); retrying in {:?}",
            state.attempt,
            max_attempts,
            err,
            err.kind.code(),
            delay
        );
        state.last_error = Some(err);
        Ok(delay)
    }

    fn note_duration(&self, what: &str, elapsed: Duration) {
        if let Some(threshold) = self.slow_query_threshold {
            if elapsed > threshold {
                warn!("Slow query ({:?} > {:?}): {}", elapsed, threshold, what);
            }
        }
    }
}

async fn run_transaction<C, T, F>(conn: &mut C, work: &mut F) -> Result<T, DatabaseError>
where
    C: Connection,
    F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T, DatabaseError>>,
{
    conn.begin().await?;
    match work(conn).await {
        Ok(value) => {
            conn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.rollback().await {
                warn!(lease_id = conn.lease_id(), "Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}
