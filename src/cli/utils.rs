use std::io::Read;

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::client::{QueryBuilder, Transport};
use crate::filter::{FilterCondition, FilterOp, FilterOrder, FilterValue, Row, Scalar, SortDirection};

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "success": true, "message": message });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output rows as a JSON envelope or one compact line per row
pub fn output_rows(output_format: OutputFormat, rows: &[Row]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({ "success": true, "data": rows, "count": rows.len() });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No rows");
            }
            for row in rows {
                println!("{}", serde_json::to_string(row)?);
            }
            eprintln!("({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
        }
    }
    Ok(())
}

/// Parse `column:op:value`. For `in`, the value is a comma-separated list.
/// Values that look like JSON numbers or booleans are sent typed.
pub fn parse_where(spec: &str) -> anyhow::Result<FilterCondition> {
    let mut parts = spec.splitn(3, ':');
    let (Some(column), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("filter '{}' must look like column:op:value", spec);
    };
    let op: FilterOp = serde_json::from_value(Value::String(op.trim().to_lowercase()))
        .map_err(|_| anyhow!("unknown operator '{}' in '{}'", op, spec))?;

    let value = if op == FilterOp::In {
        FilterValue::Many(value.split(',').filter(|v| !v.trim().is_empty()).map(parse_scalar).collect())
    } else {
        FilterValue::One(parse_scalar(value))
    };
    Ok(FilterCondition::new(column.trim(), op, value))
}

pub fn parse_scalar(raw: &str) -> Scalar {
    let trimmed = raw.trim();
    match serde_json::from_str::<Scalar>(trimmed) {
        Ok(scalar) if !matches!(scalar, Scalar::Text(_)) => scalar,
        _ => Scalar::Text(trimmed.to_string()),
    }
}

/// Replay parsed filters and order onto a builder
pub fn apply_query<T: Transport>(
    mut builder: QueryBuilder<T>,
    filters: Vec<FilterCondition>,
    order: Option<&str>,
) -> QueryBuilder<T> {
    for condition in filters {
        let column = condition.column.as_str();
        builder = match (condition.op, condition.value) {
            (FilterOp::In, FilterValue::Many(values)) => builder.in_(column, values),
            (FilterOp::Eq, FilterValue::One(v)) => builder.eq(column, v),
            (FilterOp::Neq, FilterValue::One(v)) => builder.neq(column, v),
            (FilterOp::Gt, FilterValue::One(v)) => builder.gt(column, v),
            (FilterOp::Gte, FilterValue::One(v)) => builder.gte(column, v),
            (FilterOp::Lt, FilterValue::One(v)) => builder.lt(column, v),
            (FilterOp::Lte, FilterValue::One(v)) => builder.lte(column, v),
            (FilterOp::Like, FilterValue::One(v)) => builder.like(column, v),
            // parse_where never produces the remaining shapes
            _ => builder,
        };
    }
    for spec in order.map(FilterOrder::parse).unwrap_or_default() {
        builder = builder.order(&spec.column, spec.direction == SortDirection::Asc);
    }
    builder
}

/// Read a JSON object or array of objects from stdin
pub fn read_rows_from_stdin() -> anyhow::Result<Vec<Row>> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input).context("failed to read stdin")?;
    let value: Value = serde_json::from_str(&input).context("stdin is not valid JSON")?;
    match value {
        Value::Object(row) => Ok(vec![row]),
        Value::Array(_) => serde_json::from_value(value).context("expected an array of objects"),
        _ => bail!("expected a JSON object or an array of objects on stdin"),
    }
}
