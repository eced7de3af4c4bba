//! One atomic merge pass of a feed into the store.
//!
//! A pass upserts every record it is given, appends history, and then
//! deletes this feed's availability rows that the pass did not touch. All
//! of it happens inside one `IMMEDIATE` transaction: the write lock is taken
//! up front, readers see either the old or the new state, and any error
//! rolls the whole pass back.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

use super::merge::{merge, EntityInfo};
use super::sqlite::{read_entity_info, Store};
use crate::error::{Result, SyncError};
use crate::normalize::NormalizedRecord;
use crate::timestamp::Timestamp;

const UPSERT_AVAILABILITY: &str = "
    INSERT INTO carpark_availability(
        carpark_number, lot_type, lots_available, total_lots, update_datetime, last_seen_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(carpark_number, lot_type) DO UPDATE SET
        lots_available  = excluded.lots_available,
        total_lots      = excluded.total_lots,
        update_datetime = excluded.update_datetime,
        last_seen_at    = excluded.last_seen_at";

const INSERT_HISTORY: &str = "
    INSERT OR IGNORE INTO carpark_availability_history(
        carpark_number, lot_type, lots_available, update_datetime, retrieved_at
    ) VALUES (?1, ?2, ?3, ?4, ?5)";

const UPSERT_INFO: &str = "
    INSERT INTO carpark_info(
        carpark_number, address, x_coord, y_coord, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(carpark_number) DO UPDATE SET
        address    = excluded.address,
        x_coord    = excluded.x_coord,
        y_coord    = excluded.y_coord,
        updated_at = excluded.updated_at";

// Exact, case-sensitive prefix match; `_` and `%` in the prefix are literal.
const EVICT_STALE: &str = "
    DELETE FROM carpark_availability
    WHERE substr(carpark_number, 1, ?1) = ?2 AND last_seen_at < ?3";

/// Counters for one committed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub upserted: u64,
    pub skipped: u64,
    pub history_inserted: u64,
    pub evicted: u64,
}

/// Merges one feed's records into the store, scoped to its namespace.
#[derive(Debug, Clone)]
pub struct Reconciler {
    prefix: String,
}

impl Reconciler {
    /// `prefix` marks the rows this feed owns; only those are ever evicted.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_uppercase(),
        }
    }

    /// Run one pass stamped with `now`.
    ///
    /// `now` is the single pass timestamp: every row written gets it as
    /// `last_seen_at`, and eviction removes in-namespace rows older than it.
    /// On error nothing from this pass is applied.
    pub fn reconcile(
        &self,
        store: &mut Store,
        records: &[NormalizedRecord],
        now: Timestamp,
    ) -> Result<PassStats> {
        let seen = now.to_store();
        let tx = store
            .connection_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SyncError::BeginTransaction)?;

        let mut stats = PassStats::default();
        for record in records {
            if !record.has_key() {
                debug!(entity_id = %record.entity_id, category = %record.category, "skipping keyless record");
                stats.skipped += 1;
                continue;
            }

            let history = apply_record(&tx, record, &seen).map_err(|source| {
                SyncError::WriteRecord {
                    entity_id: record.entity_id.clone(),
                    category: record.category.clone(),
                    source,
                }
            })?;
            stats.upserted += 1;
            stats.history_inserted += history;
        }

        stats.evicted = evict_stale(&tx, &self.prefix, &seen).map_err(|source| SyncError::Evict {
            prefix: self.prefix.clone(),
            source,
        })?;

        // dropping `tx` on any early return above rolls the pass back
        tx.commit().map_err(SyncError::Commit)?;

        info!(
            pass = %seen,
            upserted = stats.upserted,
            skipped = stats.skipped,
            history = stats.history_inserted,
            evicted = stats.evicted,
            "reconciled"
        );
        Ok(stats)
    }
}

/// Upsert availability, append history and merge metadata for one record.
///
/// Returns the number of history rows actually inserted (0 on replay).
fn apply_record(conn: &Connection, record: &NormalizedRecord, seen: &str) -> rusqlite::Result<u64> {
    let observed = record
        .observed_at
        .map(|t| t.to_store())
        .unwrap_or_else(|| seen.to_string());

    let stored_capacity: Option<Option<i64>> = conn
        .query_row(
            "SELECT total_lots FROM carpark_availability
             WHERE carpark_number = ?1 AND lot_type = ?2",
            params![record.entity_id, record.category],
            |row| row.get(0),
        )
        .optional()?;
    let capacity = merge(stored_capacity.flatten(), record.capacity);

    conn.prepare_cached(UPSERT_AVAILABILITY)?.execute(params![
        record.entity_id,
        record.category,
        record.available_count,
        capacity,
        observed,
        seen,
    ])?;

    let history = conn.prepare_cached(INSERT_HISTORY)?.execute(params![
        record.entity_id,
        record.category,
        record.available_count,
        observed,
        seen,
    ])?;

    let incoming = EntityInfo {
        entity_id: record.entity_id.clone(),
        address: record.address.clone(),
        x: record.x.clone(),
        y: record.y.clone(),
    };
    let info = match read_entity_info(conn, &record.entity_id)? {
        Some(existing) => existing.merged_with(&incoming),
        None => incoming,
    };
    conn.prepare_cached(UPSERT_INFO)?.execute(params![
        info.entity_id,
        info.address,
        info.x,
        info.y,
        seen,
    ])?;

    Ok(history as u64)
}

fn evict_stale(conn: &Connection, prefix: &str, seen: &str) -> rusqlite::Result<u64> {
    let len = prefix.chars().count() as i64;
    let deleted = conn.execute(EVICT_STALE, params![len, prefix, seen])?;
    Ok(deleted as u64)
}
