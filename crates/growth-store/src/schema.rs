// crates/growth-store/src/schema.rs
// ============================================================================
// Module: Schema
// Description: SQLite schema for the event store, the live journey table,
// the journey completion log, and the single persisted identity record.
// Purpose: One `init` entry point run once per connection, idempotent via
// `CREATE TABLE IF NOT EXISTS`, matching the store's single-writer-owns-
// migrations convention.
// Dependencies: rusqlite
// ============================================================================

use rusqlite::Connection;

use crate::error::StoreError;

/// Creates all tables and indexes if they do not already exist, and
/// switches the connection to WAL mode for concurrent readers.
pub fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS events (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            name          TEXT NOT NULL,
            distinct_id   TEXT NOT NULL,
            session_id    TEXT,
            timestamp     TEXT NOT NULL,
            properties    TEXT NOT NULL,
            value         TEXT,
            entity_id     TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_events_distinct_id ON events(distinct_id, seq);
        CREATE INDEX IF NOT EXISTS idx_events_session_id ON events(session_id, seq);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);

        CREATE TABLE IF NOT EXISTS live_journeys (
            id                    TEXT PRIMARY KEY,
            campaign_id           TEXT NOT NULL,
            distinct_id           TEXT NOT NULL,
            payload               TEXT NOT NULL,
            updated_at            TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_live_journeys_distinct_id ON live_journeys(distinct_id);
        CREATE INDEX IF NOT EXISTS idx_live_journeys_campaign_id ON live_journeys(distinct_id, campaign_id);

        CREATE TABLE IF NOT EXISTS journey_completions (
            id                TEXT PRIMARY KEY,
            campaign_id       TEXT NOT NULL,
            distinct_id       TEXT NOT NULL,
            completed_at      TEXT NOT NULL,
            exit_reason       TEXT NOT NULL,
            payload           TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_completions_distinct_campaign
            ON journey_completions(distinct_id, campaign_id, completed_at);

        CREATE TABLE IF NOT EXISTS identity (
            singleton     INTEGER PRIMARY KEY CHECK (singleton = 0),
            payload       TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}
