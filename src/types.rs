/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table operations supported by the access layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Access mode the policy evaluator checks for this operation
    pub fn access_mode(self) -> AccessMode {
        match self {
            Operation::Select => AccessMode::Read,
            Operation::Insert | Operation::Update | Operation::Delete => AccessMode::Write,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
}

/// Portal roles carried in the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Therapist,
    Individual,
}

/// Identity of the caller, always resolved server-side from the session.
/// An anonymous caller has no user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id: Some(user_id), role }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None, role: Role::Individual }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_need_write_access() {
        assert_eq!(Operation::Select.access_mode(), AccessMode::Read);
        assert_eq!(Operation::Insert.access_mode(), AccessMode::Write);
        assert_eq!(Operation::Update.access_mode(), AccessMode::Write);
        assert_eq!(Operation::Delete.access_mode(), AccessMode::Write);
    }

    #[test]
    fn anonymous_caller_is_never_admin() {
        let anon = Caller { user_id: None, role: Role::Admin };
        assert!(!anon.is_admin());
        assert!(Caller::new(Uuid::new_v4(), Role::Admin).is_admin());
    }
}
