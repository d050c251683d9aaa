use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Refusing unscoped {operation} on '{table}': no predicate")]
    MissingPredicate { table: String, operation: &'static str },

    #[error("Batch row {row} does not share the column set of the first row")]
    HeterogeneousBatch { row: usize },

    #[error("Update on '{0}' has an empty patch")]
    EmptyPatch(String),
}
