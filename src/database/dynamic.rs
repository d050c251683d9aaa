//! Dynamic repository over the registered portal tables.
//!
//! Compiles requests against the schema registry, applies the caller's
//! access decision, and runs the result through the resilient executor.
//! Reads use single statements; mutations run inside a transaction.

use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use super::connection::{Connection, ConnectionSource, RowSet};
use super::error::{DatabaseError, StoreError, StoreErrorKind};
use super::executor::ResilientExecutor;
use crate::access::{AccessDecision, AccessError};
use crate::filter::{CompiledStatement, Filter, FilterCondition, QueryRequest, Row};
use crate::schema::{registry, SchemaRegistry};
use crate::types::Operation;

pub struct DynamicRepository<S: ConnectionSource> {
    executor: ResilientExecutor<S>,
    registry: &'static SchemaRegistry,
    max_limit: Option<u32>,
    max_attempts: u32,
}

impl<S: ConnectionSource> Clone for DynamicRepository<S> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            registry: self.registry,
            max_limit: self.max_limit,
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: ConnectionSource> DynamicRepository<S> {
    pub fn new(executor: ResilientExecutor<S>) -> Self {
        let max_attempts = executor.policy().max_attempts;
        Self { executor, registry: registry(), max_limit: None, max_attempts }
    }

    /// Cap applied to caller-supplied limits
    pub fn with_max_limit(mut self, max_limit: Option<u32>) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn executor(&self) -> &ResilientExecutor<S> {
        &self.executor
    }

    pub async fn read(&self, request: &QueryRequest, decision: &AccessDecision) -> Result<RowSet, AccessError> {
        ensure_allowed(&request.table, Operation::Select, decision)?;
        let filters = decision.apply(&request.filters);
        let statement = self.filter(&request.table)?.to_select_sql(
            &request.select,
            &filters,
            &request.order,
            &request.pagination,
        )?;
        debug!(sql = %statement.sql, params = statement.params.len(), "compiled read");
        Ok(self.executor.execute_statement(&statement, self.max_attempts).await?)
    }

    pub async fn count(&self, request: &QueryRequest, decision: &AccessDecision) -> Result<i64, AccessError> {
        ensure_allowed(&request.table, Operation::Select, decision)?;
        let filters = decision.apply(&request.filters);
        let statement = self.filter(&request.table)?.to_count_sql(&filters)?;
        let result = self.executor.execute_statement(&statement, self.max_attempts).await?;
        result
            .rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                let err = StoreError::new(StoreErrorKind::Database, "count query returned no count");
                AccessError::Database(DatabaseError::Store(err))
            })
    }

    /// Insert a batch and return the inserted rows. An empty batch is a
    /// successful no-op and never reaches the store.
    pub async fn insert(&self, table: &str, rows: &[Row], decision: &AccessDecision) -> Result<RowSet, AccessError> {
        ensure_allowed(table, Operation::Insert, decision)?;
        let filter = self.filter(table)?;
        if rows.is_empty() {
            return Ok(RowSet::empty());
        }
        let statement = filter.to_insert_sql(rows)?;
        self.mutate(statement).await
    }

    pub async fn update(
        &self,
        table: &str,
        patch: &Row,
        filters: &[FilterCondition],
        decision: &AccessDecision,
    ) -> Result<RowSet, AccessError> {
        ensure_allowed(table, Operation::Update, decision)?;
        let filters = decision.apply(filters);
        let statement = self.filter(table)?.to_update_sql(patch, &filters)?;
        self.mutate(statement).await
    }

    pub async fn delete(
        &self,
        table: &str,
        filters: &[FilterCondition],
        decision: &AccessDecision,
    ) -> Result<RowSet, AccessError> {
        ensure_allowed(table, Operation::Delete, decision)?;
        let filters = decision.apply(filters);
        let statement = self.filter(table)?.to_delete_sql(&filters)?;
        self.mutate(statement).await
    }

    fn filter(&self, table: &str) -> Result<Filter<'static>, AccessError> {
        Ok(Filter::with_registry(self.registry, table)?.max_limit(self.max_limit))
    }

    async fn mutate(&self, statement: CompiledStatement) -> Result<RowSet, AccessError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "compiled mutation");
        let rows = self
            .executor
            .execute_transaction(self.max_attempts, move |conn| {
                let statement = statement.clone();
                async move { conn.fetch_all(&statement).await.map_err(DatabaseError::from) }.boxed()
            })
            .await?;
        Ok(RowSet::new(rows))
    }
}

fn ensure_allowed(table: &str, operation: Operation, decision: &AccessDecision) -> Result<(), AccessError> {
    if decision.allowed {
        Ok(())
    } else {
        Err(AccessError::AccessDenied { table: table.to_string(), operation: operation.as_str() })
    }
}
