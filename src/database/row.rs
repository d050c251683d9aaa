use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Column, Row as _, TypeInfo};
use uuid::Uuid;

use super::error::{StoreError, StoreErrorKind};
use crate::filter::Row;
use crate::schema::ColumnType;

/// Convert database row to JSON
pub fn row_to_json(row: &PgRow) -> Result<Row, StoreError> {
    let mut record_data = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = extract_column_value(row, i, column.type_info().name())
            .map_err(|e| StoreError::new(StoreErrorKind::Database, format!("column '{}': {}", column.name(), e)))?;
        record_data.insert(column.name().to_string(), value);
    }
    Ok(record_data)
}

fn extract_column_value(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "UUID" => row.try_get::<Option<Uuid>, _>(index)?.map(|u| Value::String(u.to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<Option<String>, _>(index)?.map(Value::String),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(|n| Value::Number(n.into())),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(|n| Value::Number(n.into())),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(|n| Value::Number(n.into())),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(|f| float(f.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(float),
        "NUMERIC" => row
            .try_get::<Option<sqlx::types::BigDecimal>, _>(index)?
            .map(|d| d.to_string().parse::<f64>().map(float).unwrap_or_else(|_| Value::String(d.to_string()))),
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        "JSONB" | "JSON" => row.try_get::<Option<Value>, _>(index)?,
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(|t| Value::String(t.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|t| Value::String(t.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|d| Value::String(d.to_string())),
        other => {
            tracing::warn!("Unhandled PostgreSQL type: {}, falling back to string", other);
            row.try_get::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(Value::String)
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn float(f: f64) -> Value {
    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Bind one positional parameter. Placeholders carry their own casts, so
/// strings bind as text and the server converts them. JSON columns always
/// bind as `jsonb`, whatever the shape of the value; a JSON `null` binds as
/// SQL `NULL`.
pub fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
    ty: Option<ColumnType>,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match (v, ty) {
        (Value::Null, _) => {
            let none: Option<String> = None;
            q.bind(none)
        }
        (_, Some(ColumnType::Json)) | (Value::Array(_) | Value::Object(_), _) => q.bind(sqlx::types::Json(v)),
        (Value::Bool(b), _) => q.bind(*b),
        (Value::Number(n), _) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        (Value::String(s), _) => q.bind(s.as_str()),
    }
}
