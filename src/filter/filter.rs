use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{CompiledStatement, FilterCondition, OrderSpec, Pagination, Row};
use crate::schema::{quote_ident, registry, ColumnDef, SchemaRegistry, TableDef};

/// Statement assembler for one registered table.
pub struct Filter<'r> {
    table: &'r TableDef,
    max_limit: Option<u32>,
}

impl Filter<'static> {
    /// Resolve `table_name` against the portal registry
    pub fn new(table_name: &str) -> Result<Self, FilterError> {
        Filter::with_registry(registry(), table_name)
    }
}

impl<'r> Filter<'r> {
    pub fn with_registry(registry: &'r SchemaRegistry, table_name: &str) -> Result<Self, FilterError> {
        let table = registry
            .table(table_name)
            .ok_or_else(|| FilterError::UnknownTable(table_name.to_string()))?;
        Ok(Self { table, max_limit: None })
    }

    pub fn max_limit(mut self, max_limit: Option<u32>) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn table(&self) -> &'r TableDef {
        self.table
    }

    pub fn to_select_sql(
        &self,
        select: &[String],
        filters: &[FilterCondition],
        order: &[OrderSpec],
        pagination: &Pagination,
    ) -> Result<CompiledStatement, FilterError> {
        let select_clause = self.build_select_clause(select)?;
        let where_clause = FilterWhere::generate(self.table, filters, 0)?;
        let order_clause = FilterOrder::generate(self.table, order)?;
        let limit_clause = self.build_limit_clause(pagination);

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM {}", quote_ident(self.table.name)),
            where_sql(&where_clause.sql),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(CompiledStatement::typed(query, where_clause.params, where_clause.types))
    }

    pub fn to_count_sql(&self, filters: &[FilterCondition]) -> Result<CompiledStatement, FilterError> {
        let where_clause = FilterWhere::generate(self.table, filters, 0)?;
        let mut query = format!("SELECT COUNT(*) AS count FROM {}", quote_ident(self.table.name));
        if !where_clause.is_empty() {
            query.push(' ');
            query.push_str(&where_sql(&where_clause.sql));
        }
        Ok(CompiledStatement::typed(query, where_clause.params, where_clause.types))
    }

    /// Multi-row insert. The column list comes from the first row; every
    /// other row must carry exactly the same keys.
    pub fn to_insert_sql(&self, rows: &[Row]) -> Result<CompiledStatement, FilterError> {
        let first = rows
            .first()
            .ok_or_else(|| FilterError::InvalidFilter("insert requires at least one row".to_string()))?;
        if first.is_empty() {
            return Err(FilterError::InvalidFilter("insert rows must have at least one column".to_string()));
        }

        for (i, row) in rows.iter().enumerate().skip(1) {
            if row.len() != first.len() || !first.keys().all(|k| row.contains_key(k)) {
                return Err(FilterError::HeterogeneousBatch { row: i });
            }
        }

        let mut keys: Vec<&String> = first.keys().collect();
        keys.sort();
        let columns: Vec<&ColumnDef> = keys
            .into_iter()
            .map(|k| self.column(k))
            .collect::<Result<_, _>>()?;

        let mut params = Vec::with_capacity(rows.len() * columns.len());
        let mut types = Vec::with_capacity(params.capacity());
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let mut placeholders = Vec::with_capacity(columns.len());
            for column in &columns {
                params.push(row.get(column.name).cloned().unwrap_or(Value::Null));
                types.push(column.ty);
                placeholders.push(format!("${}::{}", params.len(), column.ty.pg_cast()));
            }
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        let column_list = columns.iter().map(|c| quote_ident(c.name)).collect::<Vec<_>>().join(", ");
        let query = format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING *",
            quote_ident(self.table.name),
            column_list,
            tuples.join(", ")
        );
        Ok(CompiledStatement::typed(query, params, types))
    }

    pub fn to_update_sql(&self, patch: &Row, filters: &[FilterCondition]) -> Result<CompiledStatement, FilterError> {
        if patch.is_empty() {
            return Err(FilterError::EmptyPatch(self.table.name.to_string()));
        }
        self.require_predicate(filters, "update")?;

        let mut params = Vec::with_capacity(patch.len() + filters.len());
        let mut types = Vec::with_capacity(params.capacity());
        let mut set_clauses = Vec::with_capacity(patch.len() + 1);
        for (key, value) in patch {
            let column = self.column(key)?;
            params.push(value.clone());
            types.push(column.ty);
            set_clauses.push(format!("{} = ${}::{}", quote_ident(column.name), params.len(), column.ty.pg_cast()));
        }
        if self.table.column("updated_at").is_some() && !patch.contains_key("updated_at") {
            set_clauses.push("\"updated_at\" = NOW()".to_string());
        }

        let where_clause = FilterWhere::generate(self.table, filters, params.len())?;
        params.extend(where_clause.params);
        types.extend(where_clause.types);

        let query = format!(
            "UPDATE {} SET {} {} RETURNING *",
            quote_ident(self.table.name),
            set_clauses.join(", "),
            where_sql(&where_clause.sql)
        );
        Ok(CompiledStatement::typed(query, params, types))
    }

    pub fn to_delete_sql(&self, filters: &[FilterCondition]) -> Result<CompiledStatement, FilterError> {
        self.require_predicate(filters, "delete")?;
        let where_clause = FilterWhere::generate(self.table, filters, 0)?;
        let query = format!(
            "DELETE FROM {} {} RETURNING *",
            quote_ident(self.table.name),
            where_sql(&where_clause.sql)
        );
        Ok(CompiledStatement::typed(query, where_clause.params, where_clause.types))
    }

    fn require_predicate(&self, filters: &[FilterCondition], operation: &'static str) -> Result<(), FilterError> {
        if filters.is_empty() {
            return Err(FilterError::MissingPredicate { table: self.table.name.to_string(), operation });
        }
        Ok(())
    }

    fn column(&self, name: &str) -> Result<&'r ColumnDef, FilterError> {
        self.table.column(name).ok_or_else(|| FilterError::UnknownColumn {
            table: self.table.name.to_string(),
            column: name.to_string(),
        })
    }

    fn build_select_clause(&self, columns: &[String]) -> Result<String, FilterError> {
        if columns.is_empty() || columns.iter().any(|c| c == "*") {
            return Ok("*".to_string());
        }
        let quoted = columns
            .iter()
            .map(|c| self.column(c).map(|col| quote_ident(col.name)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(quoted.join(", "))
    }

    fn build_limit_clause(&self, pagination: &Pagination) -> String {
        let limit = pagination.limit.map(|limit| match self.max_limit {
            Some(max) if limit > max => {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                max
            }
            _ => limit,
        });
        match (limit, pagination.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

fn where_sql(clause: &str) -> String {
    if clause.is_empty() { String::new() } else { format!("WHERE {}", clause) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{FilterOp, FilterValue, SortDirection};
    use crate::schema::ColumnType;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn select_with_order_and_limit() {
        let filter = Filter::new("therapy_sessions").unwrap();
        let stmt = filter
            .to_select_sql(
                &[],
                &[FilterCondition::eq("client_id", "c-1")],
                &[OrderSpec { column: "scheduled_at".into(), direction: SortDirection::Asc }],
                &Pagination { limit: Some(10), offset: None },
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"therapy_sessions\" WHERE \"client_id\" = $1::uuid ORDER BY \"scheduled_at\" ASC LIMIT 10"
        );
        assert_eq!(stmt.params, vec![json!("c-1")]);
    }

    #[test]
    fn explicit_columns_are_validated_and_quoted() {
        let filter = Filter::new("therapist_directory").unwrap();
        let stmt = filter
            .to_select_sql(&["full_name".into(), "bio".into()], &[], &[], &Pagination::default())
            .unwrap();
        assert_eq!(stmt.sql, "SELECT \"full_name\", \"bio\" FROM \"therapist_directory\"");

        let bad = filter.to_select_sql(&["password_hash".into()], &[], &[], &Pagination::default());
        assert!(matches!(bad, Err(FilterError::UnknownColumn { .. })));
    }

    #[test]
    fn unknown_table_is_rejected() {
        assert!(matches!(Filter::new("users; --"), Err(FilterError::UnknownTable(_))));
    }

    #[test]
    fn limit_is_capped() {
        let filter = Filter::new("wellness_resources").unwrap().max_limit(Some(100));
        let stmt = filter
            .to_select_sql(&[], &[], &[], &Pagination { limit: Some(5000), offset: Some(20) })
            .unwrap();
        assert!(stmt.sql.ends_with("LIMIT 100 OFFSET 20"));
    }

    #[test]
    fn count_shares_the_where_clause() {
        let filter = Filter::new("mood_entries").unwrap();
        let stmt = filter.to_count_sql(&[FilterCondition::eq("user_id", "u1")]).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) AS count FROM \"mood_entries\" WHERE \"user_id\" = $1::uuid");
    }

    #[test]
    fn insert_takes_columns_from_first_row() {
        let filter = Filter::new("mood_entries").unwrap();
        let rows = vec![
            row(json!({"user_id": "u1", "mood_score": 4})),
            row(json!({"user_id": "u1", "mood_score": 2})),
        ];
        let stmt = filter.to_insert_sql(&rows).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"mood_entries\" (\"mood_score\", \"user_id\") VALUES ($1::integer, $2::uuid), ($3::integer, $4::uuid) RETURNING *"
        );
        assert_eq!(stmt.params, vec![json!(4), json!("u1"), json!(2), json!("u1")]);
    }

    #[test]
    fn insert_types_json_boolean_and_numeric_params() {
        let moods = Filter::new("mood_entries").unwrap();
        let stmt = moods
            .to_insert_sql(&[row(json!({"user_id": "u1", "tags": "calm"})), row(json!({"user_id": "u2", "tags": 5}))])
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"mood_entries\" (\"tags\", \"user_id\") VALUES ($1::jsonb, $2::uuid), ($3::jsonb, $4::uuid) RETURNING *"
        );
        assert_eq!(
            stmt.param_types,
            vec![ColumnType::Json, ColumnType::Uuid, ColumnType::Json, ColumnType::Uuid]
        );

        let directory = Filter::new("therapist_directory").unwrap();
        let stmt = directory
            .to_insert_sql(&[row(json!({"accepting_clients": true, "hourly_rate": 95.5, "languages": ["en"]}))])
            .unwrap();
        assert_eq!(stmt.param_types, vec![ColumnType::Boolean, ColumnType::Numeric, ColumnType::Json]);
        assert_eq!(stmt.placeholder_count(), stmt.param_types.len());
    }

    #[test]
    fn update_types_set_and_where_params() {
        let filter = Filter::new("mood_entries").unwrap();
        let patch = row(json!({"tags": true}));
        let stmt = filter.to_update_sql(&patch, &[FilterCondition::eq("id", "m1")]).unwrap();
        assert_eq!(stmt.sql, "UPDATE \"mood_entries\" SET \"tags\" = $1::jsonb WHERE \"id\" = $2::uuid RETURNING *");
        assert_eq!(stmt.param_types, vec![ColumnType::Json, ColumnType::Uuid]);
    }

    #[test]
    fn heterogeneous_batch_is_a_compile_error() {
        let filter = Filter::new("mood_entries").unwrap();
        let rows = vec![row(json!({"mood_score": 1, "energy_level": 2})), row(json!({"mood_score": 3}))];
        assert_eq!(filter.to_insert_sql(&rows), Err(FilterError::HeterogeneousBatch { row: 1 }));

        let swapped = vec![row(json!({"mood_score": 1, "energy_level": 2})), row(json!({"mood_score": 3, "note": "x"}))];
        assert_eq!(filter.to_insert_sql(&swapped), Err(FilterError::HeterogeneousBatch { row: 1 }));
    }

    #[test]
    fn update_numbers_where_params_after_set_params() {
        let filter = Filter::new("therapy_sessions").unwrap();
        let patch = row(json!({"status": "cancelled"}));
        let filters = vec![
            FilterCondition::eq("id", "s1"),
            FilterCondition::new("client_id", FilterOp::Eq, FilterValue::One("c1".into())),
        ];
        let stmt = filter.to_update_sql(&patch, &filters).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"therapy_sessions\" SET \"status\" = $1::text, \"updated_at\" = NOW() WHERE \"id\" = $2::uuid AND \"client_id\" = $3::uuid RETURNING *"
        );
        assert_eq!(stmt.placeholder_count(), stmt.params.len());
    }

    #[test]
    fn mutations_require_a_predicate() {
        let filter = Filter::new("profiles").unwrap();
        assert!(matches!(filter.to_delete_sql(&[]), Err(FilterError::MissingPredicate { .. })));
        let patch = row(json!({"full_name": "A"}));
        assert!(matches!(filter.to_update_sql(&patch, &[]), Err(FilterError::MissingPredicate { .. })));
        assert!(matches!(
            filter.to_update_sql(&Row::new(), &[FilterCondition::eq("id", "x")]),
            Err(FilterError::EmptyPatch(_))
        ));
    }

    #[test]
    fn delete_returns_rows() {
        let filter = Filter::new("journal_entries").unwrap();
        let stmt = filter.to_delete_sql(&[FilterCondition::eq("id", "j1")]).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"journal_entries\" WHERE \"id\" = $1::uuid RETURNING *");
    }
}
