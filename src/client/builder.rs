use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::error::ClientError;
use super::transport::{Transport, WireCall};
use crate::api::{DeleteBody, InsertBody, UpdateBody, WireQuery};
use crate::filter::{FilterCondition, FilterOp, FilterValue, OrderSpec, QueryRequest, Row, Scalar, SortDirection};

/// A filter argument. `None` means "no filter" and makes the builder call a no-op.
pub trait IntoFilterValue {
    fn into_filter_value(self) -> Option<Scalar>;
}

macro_rules! scalar_filter_value {
    ($($t:ty),*) => {
        $(impl IntoFilterValue for $t {
            fn into_filter_value(self) -> Option<Scalar> {
                Some(Scalar::from(self))
            }
        })*
    };
}

scalar_filter_value!(&str, String, i64, i32, f64, bool, Uuid, Scalar);

impl IntoFilterValue for &String {
    fn into_filter_value(self) -> Option<Scalar> {
        Some(Scalar::Text(self.clone()))
    }
}

impl IntoFilterValue for u32 {
    fn into_filter_value(self) -> Option<Scalar> {
        Some(Scalar::Int(self.into()))
    }
}

impl<T: IntoFilterValue> IntoFilterValue for Option<T> {
    fn into_filter_value(self) -> Option<Scalar> {
        self.and_then(IntoFilterValue::into_filter_value)
    }
}

/// An `in` argument. `None` is a no-op; an empty list is sent as-is.
pub trait IntoFilterList {
    fn into_filter_list(self) -> Option<Vec<Scalar>>;
}

impl<T: Into<Scalar>> IntoFilterList for Vec<T> {
    fn into_filter_list(self) -> Option<Vec<Scalar>> {
        Some(self.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar> + Clone> IntoFilterList for &[T] {
    fn into_filter_list(self) -> Option<Vec<Scalar>> {
        Some(self.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>, const N: usize> IntoFilterList for [T; N] {
    fn into_filter_list(self) -> Option<Vec<Scalar>> {
        Some(self.into_iter().map(Into::into).collect())
    }
}

impl<L: IntoFilterList> IntoFilterList for Option<L> {
    fn into_filter_list(self) -> Option<Vec<Scalar>> {
        self.and_then(IntoFilterList::into_filter_list)
    }
}

/// Entry point: `Client::new(transport).from("therapy_sessions")`
pub struct Client<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self { transport: Arc::clone(&self.transport) }
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self { transport: Arc::new(transport) }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from(&self, table: &str) -> QueryBuilder<T> {
        QueryBuilder { transport: Arc::clone(&self.transport), request: QueryRequest::new(table) }
    }
}

/// Fluent, by-value query builder. Terminal calls consume it and send one
/// finalized request.
#[must_use = "a query builder does nothing until a terminal method is awaited"]
pub struct QueryBuilder<T: Transport> {
    transport: Arc<T>,
    request: QueryRequest,
}

impl<T: Transport> QueryBuilder<T> {
    /// Comma-joined column list, or `*`
    pub fn select(mut self, columns: &str) -> Self {
        self.request.select = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "*")
            .map(str::to_string)
            .collect();
        self
    }

    pub fn eq(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.scalar(column, FilterOp::Eq, value)
    }

    pub fn neq(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.scalar(column, FilterOp::Neq, value)
    }

    pub fn gt(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.scalar(column, FilterOp::Gt, value)
    }

    pub fn gte(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.scalar(column, FilterOp::Gte, value)
    }

    pub fn lt(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.scalar(column, FilterOp::Lt, value)
    }

    pub fn lte(self, column: &str, value: impl IntoFilterValue) -> Self {
        self.scalar(column, FilterOp::Lte, value)
    }

    /// Case-insensitive substring match
    pub fn like(self, column: &str, pattern: impl IntoFilterValue) -> Self {
        self.scalar(column, FilterOp::Like, pattern)
    }

    pub fn in_(mut self, column: &str, values: impl IntoFilterList) -> Self {
        if let Some(values) = values.into_filter_list() {
            self.request
                .filters
                .push(FilterCondition::new(column, FilterOp::In, FilterValue::Many(values)));
        }
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { SortDirection::Asc } else { SortDirection::Desc };
        self.request.order.push(OrderSpec { column: column.to_string(), direction });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.request.pagination.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.request.pagination.offset = Some(offset);
        self
    }

    /// The request accumulated so far
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub fn into_request(self) -> QueryRequest {
        self.request
    }

    pub async fn execute(self) -> Result<Vec<Row>, ClientError> {
        let call = WireCall::Find { table: self.request.table.clone(), query: WireQuery::from_request(&self.request) };
        let data = self.transport.send(call).await?;
        rows_from(data)
    }

    /// Exactly one row: forces `limit = 1` and fails with `NotFound` when
    /// nothing matches.
    pub async fn single(self) -> Result<Row, ClientError> {
        self.limit(1).execute().await?.into_iter().next().ok_or(ClientError::NotFound)
    }

    pub async fn count(self) -> Result<i64, ClientError> {
        let call = WireCall::Count { table: self.request.table.clone(), query: WireQuery::from_request(&self.request) };
        let data = self.transport.send(call).await?;
        data.as_i64().ok_or_else(|| ClientError::Decode(format!("expected a count, got {}", data)))
    }

    pub async fn insert(self, rows: Vec<Row>) -> Result<Vec<Row>, ClientError> {
        let call = WireCall::Insert { table: self.request.table, body: InsertBody { rows } };
        rows_from(self.transport.send(call).await?)
    }

    /// Update rows matching the accumulated filters
    pub async fn update(self, patch: Row) -> Result<Vec<Row>, ClientError> {
        let call = WireCall::Update {
            table: self.request.table,
            body: UpdateBody { patch, filters: self.request.filters },
        };
        rows_from(self.transport.send(call).await?)
    }

    /// Delete rows matching the accumulated filters
    pub async fn delete(self) -> Result<Vec<Row>, ClientError> {
        let call = WireCall::Delete {
            table: self.request.table,
            body: DeleteBody { filters: self.request.filters },
        };
        rows_from(self.transport.send(call).await?)
    }

    fn scalar(mut self, column: &str, op: FilterOp, value: impl IntoFilterValue) -> Self {
        if let Some(value) = value.into_filter_value() {
            self.request.filters.push(FilterCondition::new(column, op, FilterValue::One(value)));
        }
        self
    }
}

fn rows_from(data: Value) -> Result<Vec<Row>, ClientError> {
    Ok(serde_json::from_value(data)?)
}
