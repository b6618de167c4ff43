//! SQLite-backed entity store
//!
//! The store is the authority on identity: `UNIQUE(kind, name)` on canonical
//! entities and `UNIQUE(kind, alias)` on synonyms. Everything above it (the
//! resolution cache, search-before-create) only avoids needless round trips.
//!
//! Writes for one import unit happen inside a [`Unit`], an IMMEDIATE
//! transaction that commits or rolls back as a whole. A unit can stay open
//! for as long as an operator sits at a menu, so a second writer waits for
//! the lock with no time limit instead of failing with "database is locked".

mod queries;
mod schema;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;
use tracing::info;

use crate::core::audit::{Change, ChangeId};
use crate::core::entity::{NewEntity, ResolvedEntity, StoredEntity, Synonym};
use crate::core::identity::{EntityId, EntityKind, IdParseError};
use crate::core::name::NameKey;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Pause between attempts to take another writer's lock
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// A waiting writer reports once per this many attempts
const LOCK_REPORT_EVERY: i32 = 200;

/// Errors raised by entity stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write; another writer got there first
    #[error("a {kind} named '{name}' already exists")]
    Conflict { kind: EntityKind, name: String },

    #[error("attributes do not fit a {kind}: {reason}")]
    AttributeMismatch { kind: EntityKind, reason: String },

    #[error("store schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: i32, expected: i32 },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("corrupt identifier in store: {0}")]
    InvalidId(#[from] IdParseError),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Persistence operations the resolvers depend on
///
/// Every method takes `&self` so one store handle can be shared by a resolver
/// and the nested resolutions it triggers. Implementations are expected to be
/// scoped to the caller's ambient transaction.
pub trait EntityStore {
    /// Exact canonical-name lookup
    fn find_by_name(&self, kind: EntityKind, name: &NameKey)
        -> Result<Option<ResolvedEntity>, StoreError>;

    /// Alias lookup through the synonym index
    fn find_by_synonym(
        &self,
        kind: EntityKind,
        alias: &NameKey,
    ) -> Result<Option<ResolvedEntity>, StoreError>;

    /// Insert a canonical entity; fails with [`StoreError::Conflict`] if the name is taken
    fn create(&self, entity: &NewEntity, change: &ChangeId) -> Result<ResolvedEntity, StoreError>;

    /// Map an alias to an entity; fails with [`StoreError::Conflict`] if the alias is taken
    fn add_synonym(
        &self,
        kind: EntityKind,
        alias: &NameKey,
        entity: &EntityId,
        change: &ChangeId,
    ) -> Result<(), StoreError>;

    /// All entities of a kind in creation order
    fn entities(&self, kind: EntityKind) -> Result<Vec<StoredEntity>, StoreError>;

    fn get(&self, id: &EntityId) -> Result<Option<StoredEntity>, StoreError>;

    /// All synonyms, optionally restricted to one kind, in creation order
    fn synonyms(&self, kind: Option<EntityKind>) -> Result<Vec<Synonym>, StoreError>;

    /// Canonical entities whose names equal `name` ignoring case, in creation order
    fn find_folded(
        &self,
        kind: EntityKind,
        name: &NameKey,
    ) -> Result<Vec<ResolvedEntity>, StoreError> {
        Ok(self
            .entities(kind)?
            .into_iter()
            .map(|stored| stored.entity)
            .filter(|entity| name.eq_folded(&entity.name))
            .collect())
    }
}

/// Row counts for `tir status`
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreCounts {
    pub entities: Vec<(EntityKind, usize)>,
    pub synonyms: usize,
    pub changes: usize,
}

/// An open SQLite database
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_handler(Some(wait_for_lock as fn(i32) -> bool))?;

        // WAL lets readers proceed while one writer holds the lock
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::init_schema(&conn)?;
        schema::check_version(&conn)?;
        Ok(Self { conn })
    }

    /// Store view outside any explicit transaction
    pub fn store(&self) -> SqlStore<'_> {
        SqlStore { conn: &self.conn }
    }

    /// Begin an import unit
    ///
    /// The IMMEDIATE transaction takes the write lock up front, so concurrent
    /// units on the same file serialize instead of failing at commit time.
    pub fn unit(&mut self) -> Result<Unit<'_>, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(Unit { tx })
    }
}

/// One import unit's transaction
pub struct Unit<'c> {
    tx: rusqlite::Transaction<'c>,
}

impl Unit<'_> {
    /// Store view scoped to this transaction
    pub fn store(&self) -> SqlStore<'_> {
        SqlStore { conn: &self.tx }
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback()?;
        Ok(())
    }
}

/// [`EntityStore`] over a borrowed connection or transaction
#[derive(Clone, Copy)]
pub struct SqlStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqlStore<'c> {
    /// Record an audit change; entities created under it reference its ID
    pub fn record_change(&self, change: &Change) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO changes (id, user, reason, created) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                change.id.to_string(),
                change.user,
                change.reason,
                change.created.to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

/// SQLite busy handler: keep waiting for the other writer to commit
fn wait_for_lock(attempt: i32) -> bool {
    if attempt > 0 && attempt % LOCK_REPORT_EVERY == 0 {
        info!(
            waited_secs = attempt as u64 * LOCK_RETRY.as_millis() as u64 / 1000,
            "store is locked by another import, still waiting"
        );
    }
    std::thread::sleep(LOCK_RETRY);
    true
}

/// True for SQLite errors raised by a UNIQUE or PRIMARY KEY constraint
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
