use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::FilterError;
use crate::schema::ColumnType;

/// Row shape shared by reads and writes: column name to JSON value
pub type Row = Map<String, Value>;

/// A single filter value. `null` is deliberately not representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::Number((*i).into()),
            Scalar::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    /// Text rendering used for pattern matching
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self { Scalar::Text(s.to_string()) }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self { Scalar::Text(s) }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self { Scalar::Int(i) }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self { Scalar::Int(i.into()) }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self { Scalar::Float(f) }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self { Scalar::Bool(b) }
}

impl From<uuid::Uuid> for Scalar {
    fn from(id: uuid::Uuid) -> Self { Scalar::Text(id.to_string()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(Scalar),
    Many(Vec<Scalar>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self { column: column.into(), op, value }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(column, FilterOp::Eq, FilterValue::One(value.into()))
    }

    /// `in` needs a non-empty list, every other operator a single scalar.
    pub fn validate(&self) -> Result<(), FilterError> {
        match (self.op, &self.value) {
            (FilterOp::In, FilterValue::Many(values)) if values.is_empty() => Err(FilterError::InvalidFilter(
                format!("'in' on '{}' requires at least one value", self.column),
            )),
            (FilterOp::In, FilterValue::Many(_)) => Ok(()),
            (FilterOp::In, FilterValue::One(_)) => Err(FilterError::InvalidFilter(
                format!("'in' on '{}' requires an array value", self.column),
            )),
            (op, FilterValue::Many(_)) => Err(FilterError::InvalidFilter(
                format!("'{}' on '{}' requires a scalar value", op.as_str(), self.column),
            )),
            (_, FilterValue::One(_)) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Unrecognized directions fall back to ascending.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc }
    }

    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A fully described read request. Built once, then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    /// Empty means `*`
    pub select: Vec<String>,
    pub filters: Vec<FilterCondition>,
    pub order: Vec<OrderSpec>,
    pub pagination: Pagination,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: vec![],
            filters: vec![],
            order: vec![],
            pagination: Pagination::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<Value>,
    /// Declared type each parameter binds against, parallel to `params`.
    /// Empty for hand-written statements.
    pub param_types: Vec<ColumnType>,
}

impl CompiledStatement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self { sql: sql.into(), params, param_types: vec![] }
    }

    pub fn typed(sql: impl Into<String>, params: Vec<Value>, param_types: Vec<ColumnType>) -> Self {
        debug_assert_eq!(params.len(), param_types.len());
        Self { sql: sql.into(), params, param_types }
    }

    pub fn param_type(&self, index: usize) -> Option<ColumnType> {
        self.param_types.get(index).copied()
    }

    /// Number of `$n` placeholders in the SQL text
    pub fn placeholder_count(&self) -> usize {
        let bytes = self.sql.as_bytes();
        bytes
            .iter()
            .enumerate()
            .filter(|(i, b)| **b == b'$' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
            .count()
    }

    /// Placeholder numbers in order of appearance
    pub fn placeholder_indexes(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut rest = self.sql.as_str();
        while let Some(pos) = rest.find('$') {
            rest = &rest[pos + 1..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            if let Ok(n) = digits.parse() {
                out.push(n);
            }
        }
        out
    }
}
