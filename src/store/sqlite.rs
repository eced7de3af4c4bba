use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::merge::EntityInfo;
use super::schema_gen::{generate_create_table, generate_indexes};
use crate::error::{Result, SyncError};
use crate::schema::ALL_TABLES;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the carpark SQLite store.
///
/// Opened once, reused across passes, and closed at shutdown.
pub struct Store {
    conn: Connection,
    location: String,
}

/// One row of `carpark_availability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityRow {
    pub entity_id: String,
    pub category: String,
    pub available_count: i64,
    pub capacity: Option<i64>,
    pub observed_at: String,
    pub last_seen_at: String,
}

impl AvailabilityRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            entity_id: row.get(0)?,
            category: row.get(1)?,
            available_count: row.get(2)?,
            capacity: row.get(3)?,
            observed_at: row.get(4)?,
            last_seen_at: row.get(5)?,
        })
    }
}

impl Store {
    /// Open (creating if needed) the store at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SyncError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let location = db_path.display().to_string();
        let conn = Connection::open(db_path).map_err(|source| SyncError::OpenStore {
            path: location.clone(),
            source,
        })?;
        Self::init(conn, location)
    }

    /// A private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let location = ":memory:".to_string();
        let conn = Connection::open_in_memory().map_err(|source| SyncError::OpenStore {
            path: location.clone(),
            source,
        })?;
        Self::init(conn, location)
    }

    fn init(conn: Connection, location: String) -> Result<Self> {
        // WAL lets readers keep the last committed state while a pass writes
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA wal_autocheckpoint = 1000;",
        )
        .and_then(|_| conn.busy_timeout(BUSY_TIMEOUT))
        .map_err(|source| SyncError::OpenStore {
            path: location.clone(),
            source,
        })?;

        let store = Self { conn, location };
        store.create_tables()?;
        debug!(location = %store.location, "store ready");
        Ok(store)
    }

    /// Create every managed table and index that does not exist yet
    fn create_tables(&self) -> Result<()> {
        for schema in ALL_TABLES {
            let statements =
                std::iter::once(generate_create_table(schema)).chain(generate_indexes(schema));
            for sql in statements {
                self.conn
                    .execute(&sql, [])
                    .map_err(|source| SyncError::Schema {
                        table: schema.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// All current availability rows, ordered by key.
    pub fn availability_rows(&self) -> Result<Vec<AvailabilityRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT carpark_number, lot_type, lots_available, total_lots,
                        update_datetime, last_seen_at
                 FROM carpark_availability
                 ORDER BY carpark_number, lot_type",
            )
            .map_err(SyncError::Query)?;
        let rows = stmt
            .query_map([], AvailabilityRow::from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(SyncError::Query)?;
        Ok(rows)
    }

    pub fn availability(&self, entity_id: &str, category: &str) -> Result<Option<AvailabilityRow>> {
        self.conn
            .query_row(
                "SELECT carpark_number, lot_type, lots_available, total_lots,
                        update_datetime, last_seen_at
                 FROM carpark_availability
                 WHERE carpark_number = ?1 AND lot_type = ?2",
                params![entity_id, category],
                AvailabilityRow::from_row,
            )
            .optional()
            .map_err(SyncError::Query)
    }

    pub fn entity_info(&self, entity_id: &str) -> Result<Option<EntityInfo>> {
        read_entity_info(&self.conn, entity_id).map_err(SyncError::Query)
    }

    pub fn history_count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM carpark_availability_history", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(SyncError::Query)
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<()> {
        let location = self.location;
        self.conn
            .close()
            .map_err(|(_, source)| SyncError::CloseStore { path: location, source })
    }
}

/// Read one `carpark_info` row through any connection or transaction.
pub(crate) fn read_entity_info(
    conn: &Connection,
    entity_id: &str,
) -> rusqlite::Result<Option<EntityInfo>> {
    conn.query_row(
        "SELECT carpark_number, address, x_coord, y_coord
         FROM carpark_info WHERE carpark_number = ?1",
        params![entity_id],
        |row| {
            Ok(EntityInfo {
                entity_id: row.get(0)?,
                address: row.get(1)?,
                x: row.get(2)?,
                y: row.get(3)?,
            })
        },
    )
    .optional()
}
