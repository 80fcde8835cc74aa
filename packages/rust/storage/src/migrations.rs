//! SQL migration definitions for the registration database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: registrations, member_keys",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One JSON document per session, with indexed key columns.
-- team_key is lower(trim(team_name)); NULL until a name is accepted.
CREATE TABLE IF NOT EXISTS registrations (
    session_id TEXT PRIMARY KEY,
    team_key   TEXT UNIQUE,
    state      TEXT NOT NULL,
    version    INTEGER NOT NULL,
    document   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_registrations_state ON registrations(state);

-- Globally unique member identifiers (index numbers and e-mails, lower-cased)
CREATE TABLE IF NOT EXISTS member_keys (
    field      TEXT NOT NULL,
    value      TEXT NOT NULL,
    session_id TEXT NOT NULL,
    PRIMARY KEY (field, value)
);

CREATE INDEX IF NOT EXISTS idx_member_keys_session ON member_keys(session_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Delivery log for e-mail and roster collaborators",
            sql: r#"
CREATE TABLE IF NOT EXISTS deliveries (
    id          TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL,
    channel     TEXT NOT NULL,
    action      TEXT NOT NULL,
    delivered   INTEGER NOT NULL,
    detail      TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_deliveries_session ON deliveries(session_id);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
