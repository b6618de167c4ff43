//! Database schema initialization

use rusqlite::{params, Connection, OptionalExtension};

use super::{StoreError, SCHEMA_VERSION};

/// Create any missing tables
pub(super) fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Audit changes, one per import unit
        CREATE TABLE IF NOT EXISTS changes (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            user TEXT NOT NULL,
            reason TEXT NOT NULL,
            created TEXT NOT NULL
        );

        -- Canonical entities of every kind
        CREATE TABLE IF NOT EXISTS entities (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            change_id TEXT NOT NULL REFERENCES changes(id),
            created TEXT NOT NULL,
            UNIQUE (kind, name)
        );
        CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind);

        -- Platform-specific data
        CREATE TABLE IF NOT EXISTS platforms (
            id TEXT PRIMARY KEY REFERENCES entities(id),
            trigraph TEXT,
            quadgraph TEXT,
            pennant_number TEXT,
            nationality_id TEXT NOT NULL REFERENCES entities(id),
            platform_type_id TEXT NOT NULL REFERENCES entities(id),
            privacy_id TEXT NOT NULL REFERENCES entities(id)
        );

        -- Sensor-specific data
        CREATE TABLE IF NOT EXISTS sensors (
            id TEXT PRIMARY KEY REFERENCES entities(id),
            sensor_type_id TEXT NOT NULL REFERENCES entities(id),
            privacy_id TEXT NOT NULL REFERENCES entities(id),
            host_id TEXT REFERENCES entities(id)
        );

        -- Datafile-specific data
        CREATE TABLE IF NOT EXISTS datafiles (
            id TEXT PRIMARY KEY REFERENCES entities(id),
            datafile_type_id TEXT NOT NULL REFERENCES entities(id),
            privacy_id TEXT NOT NULL REFERENCES entities(id)
        );

        -- Alternate spellings
        CREATE TABLE IF NOT EXISTS synonyms (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            alias TEXT NOT NULL,
            entity_id TEXT NOT NULL REFERENCES entities(id),
            change_id TEXT NOT NULL REFERENCES changes(id),
            created TEXT NOT NULL,
            UNIQUE (kind, alias)
        );
        CREATE INDEX IF NOT EXISTS idx_synonyms_entity ON synonyms(entity_id);
        "#,
    )?;
    Ok(())
}

/// Stamp a fresh database or reject one written by another schema version
pub(super) fn check_version(conn: &Connection) -> Result<(), StoreError> {
    let found: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    match found {
        None => {
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
            Ok(())
        }
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(version) => Err(StoreError::SchemaVersion {
            found: version,
            expected: SCHEMA_VERSION,
        }),
    }
}
