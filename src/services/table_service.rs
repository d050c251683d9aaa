use crate::access::{AccessError, AccessPolicy};
use crate::database::{ConnectionSource, DynamicRepository, RowSet};
use crate::filter::{FilterCondition, QueryRequest, Row};
use crate::types::{Caller, Operation};

/// Binds the access policy to the dynamic repository. Every call evaluates
/// the policy again for the given caller before anything is compiled.
pub struct TableService<S: ConnectionSource> {
    policy: AccessPolicy,
    repository: DynamicRepository<S>,
}

impl<S: ConnectionSource> Clone for TableService<S> {
    fn clone(&self) -> Self {
        Self { policy: self.policy, repository: self.repository.clone() }
    }
}

impl<S: ConnectionSource> TableService<S> {
    pub fn new(policy: AccessPolicy, repository: DynamicRepository<S>) -> Self {
        Self { policy, repository }
    }

    pub fn repository(&self) -> &DynamicRepository<S> {
        &self.repository
    }

    pub async fn read(&self, caller: &Caller, request: &QueryRequest) -> Result<RowSet, AccessError> {
        let decision = self.policy.evaluate(&request.table, Operation::Select.access_mode(), caller);
        self.repository.read(request, &decision).await
    }

    pub async fn count(&self, caller: &Caller, request: &QueryRequest) -> Result<i64, AccessError> {
        let decision = self.policy.evaluate(&request.table, Operation::Select.access_mode(), caller);
        self.repository.count(request, &decision).await
    }

    pub async fn insert(&self, caller: &Caller, table: &str, rows: &[Row]) -> Result<RowSet, AccessError> {
        let decision = self.policy.evaluate(table, Operation::Insert.access_mode(), caller);
        self.repository.insert(table, rows, &decision).await
    }

    pub async fn update(
        &self,
        caller: &Caller,
        table: &str,
        patch: &Row,
        filters: &[FilterCondition],
    ) -> Result<RowSet, AccessError> {
        let decision = self.policy.evaluate(table, Operation::Update.access_mode(), caller);
        self.repository.update(table, patch, filters, &decision).await
    }

    pub async fn delete(&self, caller: &Caller, table: &str, filters: &[FilterCondition]) -> Result<RowSet, AccessError> {
        let decision = self.policy.evaluate(table, Operation::Delete.access_mode(), caller);
        self.repository.delete(table, filters, &decision).await
    }
}
