//! SQL schema for the Vigil SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per situation. Detection fields are written once at store time;
-- only bookkeeping (and its denormalised resolution_state) is ever updated.
CREATE TABLE IF NOT EXISTS situations (
    situation_id     TEXT PRIMARY KEY,
    situation_type   TEXT NOT NULL,
    severity         TEXT NOT NULL,   -- 'low' | 'medium' | 'high' | 'critical'
    subject          TEXT,
    description      TEXT NOT NULL,
    created_at       TEXT NOT NULL,   -- ISO 8601 UTC
    properties       TEXT NOT NULL DEFAULT '{}',  -- JSON object, post-promotion
    bookkeeping      TEXT NOT NULL DEFAULT '{}',  -- JSON object, triage state
    -- mirrors the bookkeeping entry so queries can filter without JSON walks;
    -- an absent bookkeeping entry means 'unresolved'
    resolution_state TEXT NOT NULL DEFAULT 'unresolved'
);

CREATE INDEX IF NOT EXISTS situations_type_idx       ON situations(situation_type);
CREATE INDEX IF NOT EXISTS situations_severity_idx   ON situations(severity);
CREATE INDEX IF NOT EXISTS situations_created_idx    ON situations(created_at);
CREATE INDEX IF NOT EXISTS situations_resolution_idx ON situations(resolution_state);

PRAGMA user_version = 1;
";
