use super::{ColumnDef, ColumnType, ReadScope, TableDef};
use ColumnType::*;

const fn col(name: &'static str, ty: ColumnType) -> ColumnDef {
    ColumnDef { name, ty }
}

pub(super) static PORTAL_TABLES: &[TableDef] = &[
    TableDef {
        name: "profiles",
        columns: &[
            col("id", Uuid),
            col("email", Text),
            col("full_name", Text),
            col("role", Text),
            col("phone", Text),
            col("avatar_url", Text),
            col("date_of_birth", Date),
            col("created_at", Timestamp),
            col("updated_at", Timestamp),
        ],
        read_scope: ReadScope::Owned("id"),
        writable: true,
    },
    TableDef {
        name: "therapy_sessions",
        columns: &[
            col("id", Uuid),
            col("client_id", Uuid),
            col("therapist_id", Uuid),
            col("scheduled_at", Timestamp),
            col("duration_minutes", Integer),
            col("status", Text),
            col("session_type", Text),
            col("notes", Text),
            col("created_at", Timestamp),
            col("updated_at", Timestamp),
        ],
        read_scope: ReadScope::Owned("client_id"),
        writable: true,
    },
    TableDef {
        name: "mood_entries",
        columns: &[
            col("id", Uuid),
            col("user_id", Uuid),
            col("mood_score", Integer),
            col("energy_level", Integer),
            col("tags", Json),
            col("note", Text),
            col("recorded_at", Timestamp),
        ],
        read_scope: ReadScope::Owned("user_id"),
        writable: true,
    },
    TableDef {
        name: "journal_entries",
        columns: &[
            col("id", Uuid),
            col("user_id", Uuid),
            col("title", Text),
            col("body", Text),
            col("is_private", Boolean),
            col("created_at", Timestamp),
            col("updated_at", Timestamp),
        ],
        read_scope: ReadScope::Owned("user_id"),
        writable: true,
    },
    TableDef {
        name: "therapist_directory",
        columns: &[
            col("id", Uuid),
            col("full_name", Text),
            col("specialization", Text),
            col("bio", Text),
            col("years_experience", Integer),
            col("hourly_rate", Numeric),
            col("languages", Json),
            col("accepting_clients", Boolean),
        ],
        read_scope: ReadScope::Public,
        writable: false,
    },
    TableDef {
        name: "availability_slots",
        columns: &[
            col("id", Uuid),
            col("therapist_id", Uuid),
            col("starts_at", Timestamp),
            col("ends_at", Timestamp),
            col("is_booked", Boolean),
        ],
        read_scope: ReadScope::Public,
        writable: false,
    },
    TableDef {
        name: "wellness_resources",
        columns: &[
            col("id", Uuid),
            col("title", Text),
            col("category", Text),
            col("url", Text),
            col("published_at", Timestamp),
        ],
        read_scope: ReadScope::Public,
        writable: false,
    },
    TableDef {
        name: "support_groups",
        columns: &[
            col("id", Uuid),
            col("name", Text),
            col("description", Text),
            col("meeting_day", Text),
            col("capacity", Integer),
            col("facilitator_id", Uuid),
        ],
        read_scope: ReadScope::Shared,
        writable: false,
    },
    TableDef {
        name: "audit_events",
        columns: &[
            col("id", BigInt),
            col("actor_id", Uuid),
            col("action", Text),
            col("table_name", Text),
            col("payload", Json),
            col("created_at", Timestamp),
        ],
        read_scope: ReadScope::Restricted,
        writable: false,
    },
];
