use rusqlite::TransactionBehavior;
use tracing::info;

use super::sqlite::Store;
use crate::error::{Result, SyncError};

/// Recomputes derived views after a pass commits.
pub trait SnapshotRebuilder {
    fn rebuild(&self, store: &mut Store) -> Result<()>;
}

/// Refills `carpark_availability_join` from availability and carpark info.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinSnapshot;

impl SnapshotRebuilder for JoinSnapshot {
    fn rebuild(&self, store: &mut Store) -> Result<()> {
        let tx = store
            .connection_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SyncError::Rebuild)?;

        tx.execute("DELETE FROM carpark_availability_join", [])
            .map_err(SyncError::Rebuild)?;
        let rows = tx
            .execute(
                "INSERT INTO carpark_availability_join(
                    carpark_number, lot_type, lots_available, total_lots, update_datetime,
                    address, x_coord, y_coord, has_info
                 )
                 SELECT
                    a.carpark_number, a.lot_type, a.lots_available, a.total_lots, a.update_datetime,
                    i.address, i.x_coord, i.y_coord,
                    CASE WHEN i.carpark_number IS NULL THEN 0 ELSE 1 END
                 FROM carpark_availability AS a
                 LEFT JOIN carpark_info AS i
                   ON UPPER(TRIM(a.carpark_number)) = i.carpark_number",
                [],
            )
            .map_err(SyncError::Rebuild)?;

        tx.commit().map_err(SyncError::Rebuild)?;
        info!(rows, "rebuilt join snapshot");
        Ok(())
    }
}
