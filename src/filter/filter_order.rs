use super::error::FilterError;
use super::types::{OrderSpec, SortDirection};
use crate::schema::{quote_ident, TableDef};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses the wire form `col:dir,col2:dir`. A bare column or an
    /// unrecognized direction sorts ascending; `col dir` is accepted too.
    pub fn parse(spec: &str) -> Vec<OrderSpec> {
        let mut out = Vec::new();
        for part in spec.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let (column, direction) = match trimmed.split_once(':') {
                Some((col, dir)) => (col.trim(), SortDirection::parse(dir)),
                None => {
                    let mut it = trimmed.split_whitespace();
                    let col = it.next().unwrap_or_default();
                    (col, SortDirection::parse(it.next().unwrap_or("asc")))
                }
            };
            if column.is_empty() { continue; }
            out.push(OrderSpec { column: column.to_string(), direction });
        }
        out
    }

    /// Inverse of [`FilterOrder::parse`]
    pub fn format(order: &[OrderSpec]) -> String {
        order
            .iter()
            .map(|o| format!("{}:{}", o.column, o.direction.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn generate(table: &TableDef, order: &[OrderSpec]) -> Result<String, FilterError> {
        if order.is_empty() { return Ok(String::new()); }
        let mut parts = Vec::with_capacity(order.len());
        for spec in order {
            let column = table.column(&spec.column).ok_or_else(|| FilterError::UnknownColumn {
                table: table.name.to_string(),
                column: spec.column.clone(),
            })?;
            parts.push(format!("{} {}", quote_ident(column.name), spec.direction.to_sql()));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}
