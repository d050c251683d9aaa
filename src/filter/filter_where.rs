use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterCondition, FilterOp, FilterValue, Scalar};
use crate::schema::{quote_ident, ColumnDef, ColumnType, TableDef};

/// A compiled WHERE body (without the keyword) and its typed parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Value>,
    pub types: Vec<ColumnType>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Compiles filter conditions into a parameterized, AND-joined WHERE clause.
pub struct FilterWhere<'t> {
    table: &'t TableDef,
    param_values: Vec<Value>,
    param_types: Vec<ColumnType>,
    param_index: usize,
}

impl<'t> FilterWhere<'t> {
    pub fn new(table: &'t TableDef, starting_param_index: usize) -> Self {
        Self {
            table,
            param_values: vec![],
            param_types: vec![],
            param_index: starting_param_index,
        }
    }

    /// Placeholders start at `starting_param_index + 1`. No filters yields an empty clause.
    pub fn generate(
        table: &'t TableDef,
        filters: &[FilterCondition],
        starting_param_index: usize,
    ) -> Result<WhereClause, FilterError> {
        let mut filter_where = Self::new(table, starting_param_index);
        filter_where.build(filters)
    }

    fn build(&mut self, filters: &[FilterCondition]) -> Result<WhereClause, FilterError> {
        let mut sql_conditions = Vec::with_capacity(filters.len());
        for condition in filters {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        Ok(WhereClause {
            sql: sql_conditions.join(" AND "),
            params: std::mem::take(&mut self.param_values),
            types: std::mem::take(&mut self.param_types),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterCondition) -> Result<String, FilterError> {
        condition.validate()?;
        let column = self.column(&condition.column)?;
        let quoted_column = quote_ident(column.name);

        match (&condition.value, condition.op) {
            (FilterValue::Many(values), FilterOp::In) => {
                let params: Vec<String> = values.iter().map(|v| self.param(v.to_json(), column.ty)).collect();
                Ok(format!("{} IN ({})", quoted_column, params.join(", ")))
            }
            (FilterValue::One(value), FilterOp::Like) => {
                // Substring match: wildcards in the caller's value are literal
                let pattern = Value::String(format!("%{}%", escape_like(&value.to_text())));
                let placeholder = self.param(pattern, ColumnType::Text);
                if column.ty == ColumnType::Text {
                    Ok(format!("{} ILIKE {} ESCAPE '\\'", quoted_column, placeholder))
                } else {
                    Ok(format!("{}::text ILIKE {} ESCAPE '\\'", quoted_column, placeholder))
                }
            }
            (FilterValue::One(value), op) => {
                let placeholder = self.scalar_param(value, column.ty);
                Ok(format!("{} {} {}", quoted_column, comparison_sql(op), placeholder))
            }
            // validate() rules out the remaining shapes
            (FilterValue::Many(_), op) => Err(FilterError::InvalidFilter(format!(
                "'{}' on '{}' requires a scalar value",
                op.as_str(),
                condition.column
            ))),
        }
    }

    fn column(&self, name: &str) -> Result<&'t ColumnDef, FilterError> {
        self.table.column(name).ok_or_else(|| FilterError::UnknownColumn {
            table: self.table.name.to_string(),
            column: name.to_string(),
        })
    }

    fn scalar_param(&mut self, value: &Scalar, ty: ColumnType) -> String {
        self.param(value.to_json(), ty)
    }

    fn param(&mut self, value: Value, ty: ColumnType) -> String {
        self.param_values.push(value);
        self.param_types.push(ty);
        self.param_index += 1;
        format!("${}::{}", self.param_index, ty.pg_cast())
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn comparison_sql(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Neq => "!=",
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
        FilterOp::Like => "ILIKE",
        FilterOp::In => "IN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::CompiledStatement;
    use crate::schema::registry;
    use serde_json::json;

    fn sessions() -> &'static TableDef {
        registry().table("therapy_sessions").unwrap()
    }

    #[test]
    fn empty_filters_compile_to_empty_clause() {
        let clause = FilterWhere::generate(sessions(), &[], 0).unwrap();
        assert!(clause.is_empty());
        assert!(clause.params.is_empty());
    }

    #[test]
    fn maps_every_comparison_operator() {
        let cases = [
            (FilterOp::Eq, "="),
            (FilterOp::Neq, "!="),
            (FilterOp::Gt, ">"),
            (FilterOp::Gte, ">="),
            (FilterOp::Lt, "<"),
            (FilterOp::Lte, "<="),
        ];
        for (op, sql) in cases {
            let f = FilterCondition::new("duration_minutes", op, FilterValue::One(Scalar::Int(50)));
            let clause = FilterWhere::generate(sessions(), &[f], 0).unwrap();
            assert_eq!(clause.sql, format!("\"duration_minutes\" {} $1::integer", sql));
            assert_eq!(clause.params, vec![json!(50)]);
            assert_eq!(clause.types, vec![ColumnType::Integer]);
        }
    }

    #[test]
    fn like_wraps_value_and_is_case_insensitive() {
        let f = FilterCondition::new("notes", FilterOp::Like, FilterValue::One("anxiety".into()));
        let clause = FilterWhere::generate(sessions(), &[f], 0).unwrap();
        assert_eq!(clause.sql, "\"notes\" ILIKE $1::text ESCAPE '\\'");
        assert_eq!(clause.params, vec![json!("%anxiety%")]);
    }

    #[test]
    fn like_treats_wildcards_in_the_value_literally() {
        let f = FilterCondition::new("notes", FilterOp::Like, FilterValue::One("50%_off\\".into()));
        let clause = FilterWhere::generate(sessions(), &[f], 0).unwrap();
        assert_eq!(clause.params, vec![json!("%50\\%\\_off\\\\%")]);
    }

    #[test]
    fn like_on_non_text_column_casts_column() {
        let f = FilterCondition::new("client_id", FilterOp::Like, FilterValue::One("abc".into()));
        let clause = FilterWhere::generate(sessions(), &[f], 0).unwrap();
        assert_eq!(clause.sql, "\"client_id\"::text ILIKE $1::text ESCAPE '\\'");
        assert_eq!(clause.types, vec![ColumnType::Text]);
    }

    #[test]
    fn in_emits_one_placeholder_per_element() {
        let f = FilterCondition::new(
            "therapist_id",
            FilterOp::In,
            FilterValue::Many(vec!["t1".into(), "t2".into(), "t3".into()]),
        );
        let clause = FilterWhere::generate(sessions(), &[f], 0).unwrap();
        assert_eq!(clause.sql, "\"therapist_id\" IN ($1::uuid, $2::uuid, $3::uuid)");
        assert_eq!(clause.params.len(), 3);
    }

    #[test]
    fn params_follow_filter_order_and_join_with_and() {
        let filters = vec![
            FilterCondition::eq("status", "scheduled"),
            FilterCondition::new("therapist_id", FilterOp::In, FilterValue::Many(vec!["t1".into(), "t2".into()])),
            FilterCondition::new("duration_minutes", FilterOp::Lt, FilterValue::One(Scalar::Int(90))),
        ];
        let clause = FilterWhere::generate(sessions(), &filters, 0).unwrap();
        assert_eq!(
            clause.sql,
            "\"status\" = $1::text AND \"therapist_id\" IN ($2::uuid, $3::uuid) AND \"duration_minutes\" < $4::integer"
        );
        assert!(!clause.sql.contains(" OR "));
        assert_eq!(clause.params, vec![json!("scheduled"), json!("t1"), json!("t2"), json!(90)]);

        let stmt = CompiledStatement::typed(clause.sql, clause.params, clause.types);
        assert_eq!(stmt.placeholder_count(), stmt.params.len());
        assert_eq!(stmt.param_type(1), Some(ColumnType::Uuid));
    }

    #[test]
    fn starting_index_offsets_placeholders() {
        let clause = FilterWhere::generate(sessions(), &[FilterCondition::eq("status", "done")], 3).unwrap();
        assert_eq!(clause.sql, "\"status\" = $4::text");
    }

    #[test]
    fn json_columns_carry_their_type() {
        let moods = registry().table("mood_entries").unwrap();
        let filters = vec![
            FilterCondition::eq("tags", "calm"),
            FilterCondition::new("tags", FilterOp::In, FilterValue::Many(vec![Scalar::Int(5), Scalar::Bool(true)])),
        ];
        let clause = FilterWhere::generate(moods, &filters, 0).unwrap();
        assert_eq!(clause.sql, "\"tags\" = $1::jsonb AND \"tags\" IN ($2::jsonb, $3::jsonb)");
        assert_eq!(clause.types, vec![ColumnType::Json; 3]);
        assert_eq!(clause.params, vec![json!("calm"), json!(5), json!(true)]);
    }

    #[test]
    fn unknown_column_never_reaches_sql() {
        let f = FilterCondition::eq("status\" OR 1=1 --", "x");
        let err = FilterWhere::generate(sessions(), &[f], 0).unwrap_err();
        assert!(matches!(err, FilterError::UnknownColumn { .. }));
    }

    #[test]
    fn invalid_shapes_are_rejected() {
        let f = FilterCondition::new("therapist_id", FilterOp::In, FilterValue::Many(vec![]));
        assert!(matches!(
            FilterWhere::generate(sessions(), &[f], 0),
            Err(FilterError::InvalidFilter(_))
        ));
    }
}
