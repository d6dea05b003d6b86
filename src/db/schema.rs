//! SQL DDL for initializing appointment and credential storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `appointments.id` UUID text, generated locally
/// - `external_event_id` UNIQUE, the upsert conflict key (NULL for local records)
/// - money columns as REAL; timestamps as RFC3339 text in UTC
/// - one `credentials` row per owner
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY NOT NULL,
    owner_id TEXT NOT NULL,
    client_name TEXT NOT NULL,
    client_contact TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'scheduled',
    external_event_id TEXT NULL UNIQUE,
    scheduled_at TEXT NULL, -- RFC3339
    plan TEXT NULL,
    standard_price REAL NOT NULL,
    charged_price REAL NULL,
    discount REAL NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_owner_status ON appointments(owner_id, status);

CREATE TABLE IF NOT EXISTS credentials (
    owner_id TEXT PRIMARY KEY NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT NULL,
    expiry TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL
);
"#;
