use thiserror::Error;

use crate::database::DatabaseError;
use crate::filter::FilterError;

/// Failures surfaced by the table access layer
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Access denied: {operation} on '{table}'")]
    AccessDenied { table: String, operation: &'static str },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
