//! Schema definitions

pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA: &str = r#"
CREATE TABLE schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE schema_migrations (
    version INTEGER NOT NULL,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER NOT NULL,
    success INTEGER NOT NULL
);

CREATE TABLE users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_login TEXT,
    inbox_limit INTEGER NOT NULL DEFAULT 50
);

CREATE TABLE messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    recipient TEXT NOT NULL,
    body TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    pending INTEGER NOT NULL
);

CREATE INDEX idx_messages_pending ON messages(recipient, pending, timestamp);
CREATE INDEX idx_messages_history ON messages(pending, timestamp);
"#;
