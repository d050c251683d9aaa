//! Static registry of the portal tables the access layer is allowed to touch.
//!
//! Every identifier that ends up in SQL text is resolved here first; caller
//! strings are never interpolated directly.

mod tables;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Declared PostgreSQL type of a column. Placeholders are cast to it so text
/// parameters bind against uuid/timestamp columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Uuid,
    Text,
    Integer,
    BigInt,
    Numeric,
    Boolean,
    Timestamp,
    Date,
    Json,
}

impl ColumnType {
    pub fn pg_cast(self) -> &'static str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Numeric => "numeric",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamptz",
            ColumnType::Date => "date",
            ColumnType::Json => "jsonb",
        }
    }
}

/// Who may read a table, and how rows are scoped for non-admin readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Readable by anyone, including anonymous callers.
    Public,
    /// Authenticated readers only see rows whose column equals their id.
    Owned(&'static str),
    /// Authenticated readers see every row.
    Shared,
    /// Admin only.
    Restricted,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
}

#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub read_scope: ReadScope,
    pub writable: bool,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Ownership column used to pin reads to the caller
    pub fn owner_column(&self) -> Option<&'static str> {
        match self.read_scope {
            ReadScope::Owned(col) => Some(col),
            _ => None,
        }
    }
}

pub struct SchemaRegistry {
    tables: HashMap<&'static str, TableDef>,
}

impl SchemaRegistry {
    pub fn new(defs: &[TableDef]) -> Self {
        let tables = defs.iter().map(|t| (t.name, *t)).collect();
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }
}

static REGISTRY: Lazy<SchemaRegistry> = Lazy::new(|| SchemaRegistry::new(tables::PORTAL_TABLES));

/// The portal's table registry
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

/// Double-quote an identifier that has already been resolved against the registry
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
