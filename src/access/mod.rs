//! Row-level access policy for the portal tables.
//!
//! Decisions are computed from the caller and the schema registry on every
//! request and never stored.

pub mod error;

pub use error::AccessError;

use tracing::{debug, warn};

use crate::filter::{FilterCondition, Scalar};
use crate::schema::{registry, ReadScope, SchemaRegistry};
use crate::types::{AccessMode, Caller};

/// Mandatory condition injected by the access layer, pinned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    pub column: &'static str,
    pub value: Scalar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub row_filter: Option<RowFilter>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self { allowed: true, row_filter: None }
    }

    pub fn allow_scoped(column: &'static str, value: impl Into<Scalar>) -> Self {
        Self {
            allowed: true,
            row_filter: Some(RowFilter { column, value: value.into() }),
        }
    }

    pub fn deny() -> Self {
        Self { allowed: false, row_filter: None }
    }

    /// Merge caller filters with the row filter. The row filter always goes
    /// last and never replaces anything the caller asked for.
    pub fn apply(&self, filters: &[FilterCondition]) -> Vec<FilterCondition> {
        let mut merged = filters.to_vec();
        if let Some(rf) = &self.row_filter {
            merged.push(FilterCondition::eq(rf.column, rf.value.clone()));
        }
        merged
    }
}

#[derive(Clone, Copy)]
pub struct AccessPolicy {
    registry: &'static SchemaRegistry,
    audit_logging: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(registry())
    }
}

impl AccessPolicy {
    pub fn new(registry: &'static SchemaRegistry) -> Self {
        Self { registry, audit_logging: false }
    }

    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.audit_logging = enabled;
        self
    }

    pub fn evaluate(&self, table: &str, mode: AccessMode, caller: &Caller) -> AccessDecision {
        let decision = self.decide(table, mode, caller);
        if decision.allowed {
            debug!(
                table,
                ?mode,
                role = ?caller.role,
                scoped = decision.row_filter.is_some(),
                "access granted"
            );
        } else if self.audit_logging {
            warn!(
                "Access denied: {:?} on '{}' for {:?} caller {}",
                mode,
                table,
                caller.role,
                caller.user_id.map(|u| u.to_string()).unwrap_or_else(|| "anonymous".to_string())
            );
        }
        decision
    }

    fn decide(&self, table: &str, mode: AccessMode, caller: &Caller) -> AccessDecision {
        let def = self.registry.table(table);

        if mode == AccessMode::Read && matches!(def.map(|t| t.read_scope), Some(ReadScope::Public)) {
            return AccessDecision::allow();
        }

        // Unknown tables fall through to the compiler, which rejects them
        if caller.is_admin() {
            return AccessDecision::allow();
        }

        let (Some(user_id), Some(def)) = (caller.user_id, def) else {
            return AccessDecision::deny();
        };

        match mode {
            AccessMode::Read => match def.read_scope {
                ReadScope::Owned(column) => AccessDecision::allow_scoped(column, user_id),
                ReadScope::Shared | ReadScope::Public => AccessDecision::allow(),
                ReadScope::Restricted => AccessDecision::deny(),
            },
            AccessMode::Write if def.writable => AccessDecision::allow(),
            AccessMode::Write => AccessDecision::deny(),
        }
    }
}
