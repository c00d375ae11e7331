//! SQL schema for the Almanac SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id      TEXT PRIMARY KEY,
    username        TEXT NOT NULL UNIQUE,
    display_name    TEXT NOT NULL,
    role            TEXT NOT NULL,   -- 'admin' | 'teacher' | 'guest'
    permissions     TEXT NOT NULL,   -- JSON array; always derived from role
    credential_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at      TEXT NOT NULL
);

-- Events outlive their author, so created_by carries no foreign key.
-- Exactly one of the two payload columns is populated, selected by kind.
CREATE TABLE IF NOT EXISTS events (
    event_id          TEXT PRIMARY KEY,
    kind              TEXT NOT NULL,   -- 'assessment' | 'classChange'
    title             TEXT NOT NULL,
    description       TEXT,
    occurs_on         TEXT NOT NULL,   -- YYYY-MM-DD
    created_by        TEXT NOT NULL,
    assessment_json   TEXT,
    class_change_json TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS accounts_role_idx     ON accounts(role);
CREATE INDEX IF NOT EXISTS events_occurs_on_idx  ON events(occurs_on);
CREATE INDEX IF NOT EXISTS events_created_by_idx ON events(created_by);

PRAGMA user_version = 1;
";
